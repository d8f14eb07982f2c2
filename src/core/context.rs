//! Compute context.
//!
//! A context binds one backend to one configuration. Every component takes
//! the context explicitly; there is no global device. Several contexts may
//! coexist, one per thread, and arrays never move between them.

use crate::backend::{ComputeBackend, ReferenceBackend};
use crate::converters::ConversionRegistry;
use crate::core::args::KernelArgs;
use crate::core::chunked::TransferEngine;
use crate::core::config::ContextConfig;
use crate::core::error::DispatchResult;
use crate::core::types::{DeviceArray, ElementType, RepresentationKind, Shape};
use crate::execution::unifier::TypeUnifier;
use crate::kernels::Kernels;
use log::trace;
use std::fmt;
use std::sync::Arc;

/// Handle to a backend plus the limits that apply to it.
///
/// Cloning a context is cheap and yields a handle to the same backend.
#[derive(Clone)]
pub struct ComputeContext {
    backend: Arc<dyn ComputeBackend>,
    config: Arc<ContextConfig>,
}

impl ComputeContext {
    /// Create a context over a backend with the default configuration.
    pub fn new(backend: impl ComputeBackend + 'static) -> Self {
        Self::with_backend(Arc::new(backend), ContextConfig::default())
    }

    /// Create a context over a shared backend.
    pub fn with_backend(backend: Arc<dyn ComputeBackend>, config: ContextConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    /// Create a context over a fresh in-process reference backend.
    pub fn reference() -> Self {
        Self::reference_with_config(ContextConfig::default())
    }

    /// Create a reference context with a configuration.
    pub fn reference_with_config(config: ContextConfig) -> Self {
        let backend = ReferenceBackend::with_recording(config.record_invocations);
        Self::with_backend(Arc::new(backend), config)
    }

    /// The backend this context dispatches to.
    pub fn backend(&self) -> &Arc<dyn ComputeBackend> {
        &self.backend
    }

    /// The configuration of this context.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Allocate an array.
    pub fn create(
        &self,
        shape: Shape,
        element_type: ElementType,
        kind: RepresentationKind,
    ) -> DispatchResult<DeviceArray> {
        Ok(self.backend.allocate(shape, element_type, kind)?)
    }

    /// Allocate a linear buffer.
    pub fn create_buffer(&self, shape: Shape, element_type: ElementType) -> DispatchResult<DeviceArray> {
        self.create(shape, element_type, RepresentationKind::LinearBuffer)
    }

    /// Allocate a formatted image.
    pub fn create_image(&self, shape: Shape, element_type: ElementType) -> DispatchResult<DeviceArray> {
        self.create(shape, element_type, RepresentationKind::FormattedImage)
    }

    /// Allocate an array with the shape, type and kind of `template`.
    pub fn create_like(&self, template: &DeviceArray) -> DispatchResult<DeviceArray> {
        self.create(*template.shape(), template.element_type(), template.kind())
    }

    /// Allocate an array with the shape and kind of `template` and another element type.
    pub fn create_like_with_type(
        &self,
        template: &DeviceArray,
        element_type: ElementType,
    ) -> DispatchResult<DeviceArray> {
        self.create(*template.shape(), element_type, template.kind())
    }

    /// Release an array.
    pub fn release(&self, array: &DeviceArray) -> DispatchResult<()> {
        Ok(self.backend.release(array)?)
    }

    /// Number of arrays currently allocated on the backend.
    pub fn live_allocations(&self) -> usize {
        self.backend.live_allocations()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Execute a kernel, unifying argument element types first.
    pub fn execute(&self, file: &str, symbol: &str, args: KernelArgs) -> DispatchResult<()> {
        TypeUnifier::execute(self, file, symbol, args)
    }

    /// Execute a kernel exactly as given.
    pub fn execute_direct(&self, file: &str, symbol: &str, args: &KernelArgs) -> DispatchResult<()> {
        trace!("dispatch {}::{} with {} argument(s)", file, symbol, args.len());
        Ok(self.backend.execute(file, symbol, args)?)
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Array operations bound to this context.
    pub fn kernels(&self) -> Kernels<'_> {
        Kernels::new(self)
    }

    /// Host transfers bound to this context.
    pub fn transfer(&self) -> TransferEngine<'_> {
        TransferEngine::new(self)
    }

    /// A registry with every built-in converter, allocating against this context.
    pub fn converters(&self) -> ConversionRegistry {
        ConversionRegistry::with_defaults(self)
    }
}

impl fmt::Debug for ComputeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeContext")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_release() {
        let ctx = ComputeContext::reference();
        let image = ctx.create_image(Shape::new_2d(8, 8), ElementType::U16).unwrap();
        let like = ctx.create_like_with_type(&image, ElementType::F32).unwrap();

        assert_eq!(like.kind(), RepresentationKind::FormattedImage);
        assert_eq!(like.shape(), image.shape());
        assert_eq!(ctx.live_allocations(), 2);

        ctx.release(&image).unwrap();
        ctx.release(&like).unwrap();
        assert_eq!(ctx.live_allocations(), 0);
    }

    #[test]
    fn test_clones_share_backend() {
        let ctx = ComputeContext::reference();
        let other = ctx.clone();
        let array = ctx.create_buffer(Shape::new_2d(2, 2), ElementType::U8).unwrap();
        assert_eq!(other.live_allocations(), 1);
        other.release(&array).unwrap();
        assert_eq!(ctx.live_allocations(), 0);
    }

    #[test]
    fn test_debug_names_backend() {
        let ctx = ComputeContext::reference();
        assert!(format!("{:?}", ctx).contains("reference"));
    }
}
