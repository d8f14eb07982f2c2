//! # Arraygate - Compute Dispatch and Data Adaptation
//!
//! Arraygate sits between high-level array operations and a compute backend.
//! It normalizes kernel arguments, decomposes separable filters into
//! per-axis passes, moves data between host and device in bounded pieces,
//! and converts arrays between representations.
//!
//! ## Features
//!
//! - **Argument Type Unification**: Mixed element types are promoted to float
//!   temporaries before dispatch and copied back afterwards
//! - **Separable Filters**: N-dimensional filters run as chained 1D passes
//! - **Chunked Transfer**: Host transfers above the element limit go plane by plane
//! - **Conversion Registry**: Pluggable converters between device buffers,
//!   device images, host arrays and image stacks
//!
//! ## Quick Start
//!
//! ```rust
//! use arraygate::prelude::*;
//!
//! let ctx = ComputeContext::reference();
//! let host = HostArray::from_vec(Shape::new_2d(4, 4), vec![1u8; 16]).unwrap();
//! let src = ctx.transfer().push_buffer(&host).unwrap();
//! let dst = ctx.create_like_with_type(&src, ElementType::F32).unwrap();
//!
//! ctx.kernels().blur(&src, &dst, 1.0, 1.0, 0.0).unwrap();
//! assert!((ctx.kernels().sum_pixels(&dst).unwrap() - 16.0).abs() < 1e-3);
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`core`]: Core types, context, transfers and error handling
//! - [`backend`]: The compute backend trait and the reference CPU backend
//! - [`execution`]: Argument unification and separable filter orchestration
//! - [`kernels`]: Array operations built on the dispatch layer
//! - [`converters`]: Representation converters and their registry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod converters;
pub mod core;
pub mod execution;
pub mod kernels;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust
/// use arraygate::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{
        ArrayId, DeviceArray, ElementType, Region, Representation, RepresentationKind, Shape,
    };

    // Kernel arguments
    pub use crate::core::args::{ArgValue, ArgumentRole, KernelArgs};

    // Host data
    pub use crate::core::host::{HostArray, HostData, HostElement, ImageStack, StackPlane};

    // Context and configuration
    pub use crate::core::chunked::TransferEngine;
    pub use crate::core::config::ContextConfig;
    pub use crate::core::context::ComputeContext;

    // Errors
    pub use crate::core::error::{
        BackendError, BackendResult, ConfigError, DispatchError, DispatchResult,
    };

    // Backend
    pub use crate::backend::{ComputeBackend, InvocationRecord, ReferenceBackend};

    // Execution
    pub use crate::execution::separable::{AxisPass, SeparableFilter, SeparableKernel};
    pub use crate::execution::temporaries::TemporaryArrays;
    pub use crate::execution::unifier::{PlannedPromotion, TypeUnifier};

    // Kernels
    pub use crate::kernels::{radius_to_kernel_size, sigma_to_kernel_size, Kernels};

    // Converters
    pub use crate::converters::{ArrayValue, ConversionRegistry, Converter};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "arraygate");
    }

    #[test]
    fn test_context_with_defaults() {
        let ctx = ComputeContext::reference();
        assert_eq!(ctx.config().max_stack_members, 12);
        assert_eq!(ctx.live_allocations(), 0);
        assert_eq!(ctx.converters().len(), 12);
    }

    #[test]
    fn test_push_pull_through_prelude() {
        let ctx = ComputeContext::reference();
        let host = HostArray::from_vec(Shape::new_3d(2, 2, 2), vec![3u16; 8]).unwrap();
        let array = ctx.transfer().push_image(&host).unwrap();
        assert_eq!(array.kind(), RepresentationKind::FormattedImage);
        assert_eq!(ctx.transfer().pull(&array).unwrap(), host);
    }
}
