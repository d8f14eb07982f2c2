//! Chunked host/device transfers.
//!
//! The host moves at most [`ContextConfig::host_transfer_limit`] elements in
//! one transfer call. Arrays above the limit are moved plane by plane: each
//! call covers one width × height plane at offset (0, 0, z), and a single
//! plane-sized staging buffer is reused for every plane of a flat pull.
//!
//! # Example
//!
//! ```rust
//! use arraygate::prelude::*;
//!
//! let ctx = ComputeContext::reference();
//! let host = HostArray::from_vec(Shape::new_3d(4, 4, 3), vec![7u16; 48])?;
//! let array = ctx.transfer().push_buffer(&host)?;
//!
//! // Force plane-by-plane transfer with a limit below the element count
//! let engine = ctx.transfer().with_limit(16);
//! assert!(engine.needs_chunking(&array));
//! assert_eq!(engine.pull(&array)?, host);
//! assert_eq!(engine.transfer_calls(), 3);
//! # Ok::<(), arraygate::core::error::DispatchError>(())
//! ```
//!
//! [`ContextConfig::host_transfer_limit`]: crate::core::config::ContextConfig::host_transfer_limit

use crate::core::context::ComputeContext;
use crate::core::error::{DispatchError, DispatchResult};
use crate::core::host::{HostArray, HostData, HostElement, ImageStack, StackPlane};
use crate::core::types::{DeviceArray, ElementType, Region, RepresentationKind, Shape};
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Plane regions
// ============================================================================

/// Iterator over the width × height planes of a shape, front to back.
#[derive(Debug, Clone)]
pub struct PlaneRegions {
    shape: Shape,
    next: u64,
}

impl PlaneRegions {
    /// Iterate over the planes of `shape`.
    pub fn new(shape: Shape) -> Self {
        Self { shape, next: 0 }
    }

    /// Total number of planes.
    pub fn plane_count(&self) -> usize {
        self.shape.depth() as usize
    }
}

impl Iterator for PlaneRegions {
    type Item = Region;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.shape.depth() {
            return None;
        }
        let region = Region::plane(&self.shape, self.next);
        self.next += 1;
        Some(region)
    }
}

// ============================================================================
// Staging tracker
// ============================================================================

/// Tracks host staging memory and transfer calls of one engine.
#[derive(Debug, Default)]
pub struct StagingTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl StagingTracker {
    /// Record a staging allocation.
    pub fn allocate(&self, bytes: usize) {
        let current = self.current.fetch_add(bytes, Ordering::SeqCst) + bytes;
        self.peak.fetch_max(current, Ordering::SeqCst);
    }

    /// Record a staging deallocation.
    pub fn free(&self, bytes: usize) {
        self.current.fetch_sub(bytes, Ordering::SeqCst);
    }

    /// Record one backend transfer call.
    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Staging bytes currently held.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Largest amount of staging memory held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of transfer calls issued.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Transfer engine
// ============================================================================

/// Moves arrays between the device and host representations.
pub struct TransferEngine<'a> {
    ctx: &'a ComputeContext,
    limit: u64,
    tracker: StagingTracker,
}

impl<'a> TransferEngine<'a> {
    /// Create an engine using the context's transfer limit.
    pub fn new(ctx: &'a ComputeContext) -> Self {
        Self {
            ctx,
            limit: ctx.config().host_transfer_limit,
            tracker: StagingTracker::default(),
        }
    }

    /// Override the transfer limit. Zero is raised to one.
    pub fn with_limit(mut self, elements: u64) -> Self {
        self.limit = elements.max(1);
        self
    }

    /// The transfer limit in elements.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Whether an array is above the limit and moves plane by plane.
    pub fn needs_chunking(&self, array: &DeviceArray) -> bool {
        array.element_count() > self.limit
    }

    /// Largest amount of host staging memory held at once, in bytes.
    pub fn peak_staging_bytes(&self) -> usize {
        self.tracker.peak()
    }

    /// Number of backend transfer calls issued by this engine.
    pub fn transfer_calls(&self) -> usize {
        self.tracker.calls()
    }

    // ========================================================================
    // Flat host arrays
    // ========================================================================

    /// Pull a device array into a host array of the same element type.
    pub fn pull(&self, array: &DeviceArray) -> DispatchResult<HostArray> {
        let data = match array.element_type() {
            ElementType::U8 => HostData::U8(self.pull_values(array)?),
            ElementType::U16 => HostData::U16(self.pull_values(array)?),
            ElementType::U32 => HostData::U32(self.pull_values(array)?),
            ElementType::F32 => HostData::F32(self.pull_values(array)?),
        };
        HostArray::new(*array.shape(), data)
    }

    /// Pull a device array as typed values.
    pub fn pull_values<T: HostElement>(&self, array: &DeviceArray) -> DispatchResult<Vec<T>> {
        check_element_type("pull", T::ELEMENT_TYPE, array.element_type())?;
        let shape = array.shape();
        let mut values = vec![T::zeroed(); shape.element_count() as usize];

        if !self.needs_chunking(array) {
            self.read(array, &Region::whole(shape), &mut values)?;
            return Ok(values);
        }

        let plane_len = shape.plane_element_count() as usize;
        let staging_bytes = plane_len * std::mem::size_of::<T>();
        debug!(
            "pulling {} plane by plane ({} elements above limit {})",
            array,
            array.element_count(),
            self.limit
        );

        let mut staging = vec![T::zeroed(); plane_len];
        self.tracker.allocate(staging_bytes);
        let result = PlaneRegions::new(*shape).enumerate().try_for_each(|(z, region)| {
            self.read(array, &region, &mut staging)?;
            values[z * plane_len..(z + 1) * plane_len].copy_from_slice(&staging);
            Ok::<(), DispatchError>(())
        });
        self.tracker.free(staging_bytes);
        result?;

        Ok(values)
    }

    /// Allocate a device array of `kind` and push a host array into it.
    ///
    /// The new array is released again if the push fails.
    pub fn push(&self, host: &HostArray, kind: RepresentationKind) -> DispatchResult<DeviceArray> {
        let array = self.ctx.create(*host.shape(), host.element_type(), kind)?;
        if let Err(error) = self.push_into(host, &array) {
            self.ctx.release(&array)?;
            return Err(error);
        }
        Ok(array)
    }

    /// Push a host array into a new linear buffer.
    pub fn push_buffer(&self, host: &HostArray) -> DispatchResult<DeviceArray> {
        self.push(host, RepresentationKind::LinearBuffer)
    }

    /// Push a host array into a new formatted image.
    pub fn push_image(&self, host: &HostArray) -> DispatchResult<DeviceArray> {
        self.push(host, RepresentationKind::FormattedImage)
    }

    /// Push a host array into an existing device array of the same type and shape.
    pub fn push_into(&self, host: &HostArray, array: &DeviceArray) -> DispatchResult<()> {
        check_element_type("push", array.element_type(), host.element_type())?;
        check_extents("push", host.shape(), array.shape())?;

        if !self.needs_chunking(array) {
            return self.write(array, &Region::whole(array.shape()), host.data().as_bytes());
        }

        debug!("pushing {} plane by plane", array);
        let bytes = host.data().as_bytes();
        let plane_bytes = array.shape().plane_element_count() as usize * array.element_type().size_in_bytes();
        PlaneRegions::new(*array.shape())
            .zip(bytes.chunks(plane_bytes.max(1)))
            .try_for_each(|(region, plane)| self.write(array, &region, plane))
    }

    // ========================================================================
    // Image stacks
    // ========================================================================

    /// Pull a device array into an image stack.
    ///
    /// `U32` arrays have no plane type; they are pulled as a host array and
    /// converted element by element into float planes.
    pub fn pull_stack(&self, array: &DeviceArray) -> DispatchResult<ImageStack> {
        if !array.element_type().has_plane_type() {
            debug!("no plane type for {}, converting through a host array", array.element_type());
            return ImageStack::from_host_array(&self.pull(array)?);
        }
        if !self.needs_chunking(array) {
            return ImageStack::from_host_array(&self.pull(array)?);
        }

        debug!("pulling {} into a stack plane by plane", array);
        let planes = PlaneRegions::new(*array.shape())
            .map(|region| self.pull_plane(array, &region))
            .collect::<DispatchResult<Vec<_>>>()?;
        ImageStack::new(*array.shape(), planes)
    }

    /// Read one plane straight into its own plane buffer.
    fn pull_plane(&self, array: &DeviceArray, region: &Region) -> DispatchResult<StackPlane> {
        let len = region.element_count() as usize;
        let data = match array.element_type() {
            ElementType::U8 => HostData::U8(self.read_new(array, region, len)?),
            ElementType::U16 => HostData::U16(self.read_new(array, region, len)?),
            ElementType::U32 => HostData::U32(self.read_new(array, region, len)?),
            ElementType::F32 => HostData::F32(self.read_new(array, region, len)?),
        };
        let shape = array.shape();
        StackPlane::from_data(shape.width() as u32, shape.height() as u32, data).ok_or_else(|| {
            DispatchError::InvalidHostData(format!("cannot build a plane from {}", array))
        })
    }

    /// Allocate a device array of `kind` and push an image stack into it.
    pub fn push_stack(&self, stack: &ImageStack, kind: RepresentationKind) -> DispatchResult<DeviceArray> {
        let array = self.ctx.create(*stack.shape(), stack.element_type(), kind)?;
        if let Err(error) = self.push_stack_into(stack, &array) {
            self.ctx.release(&array)?;
            return Err(error);
        }
        Ok(array)
    }

    /// Push an image stack into an existing device array.
    pub fn push_stack_into(&self, stack: &ImageStack, array: &DeviceArray) -> DispatchResult<()> {
        check_element_type("push_stack", array.element_type(), stack.element_type())?;
        check_extents("push_stack", stack.shape(), array.shape())?;

        if !self.needs_chunking(array) {
            return self.push_into(&stack.to_host_array(), array);
        }

        debug!("pushing stack into {} plane by plane", array);
        PlaneRegions::new(*array.shape())
            .zip(stack.planes())
            .try_for_each(|(region, plane)| self.write(array, &region, plane.as_bytes()))
    }

    // ========================================================================
    // Backend calls
    // ========================================================================

    fn read<T: HostElement>(&self, array: &DeviceArray, region: &Region, out: &mut [T]) -> DispatchResult<()> {
        self.tracker.record_call();
        self.ctx
            .backend()
            .read_region(array, region, bytemuck::cast_slice_mut(out))?;
        Ok(())
    }

    fn read_new<T: HostElement>(&self, array: &DeviceArray, region: &Region, len: usize) -> DispatchResult<Vec<T>> {
        let mut values = vec![T::zeroed(); len];
        self.read(array, region, &mut values)?;
        Ok(values)
    }

    fn write(&self, array: &DeviceArray, region: &Region, bytes: &[u8]) -> DispatchResult<()> {
        self.tracker.record_call();
        self.ctx.backend().write_region(array, region, bytes)?;
        Ok(())
    }
}

fn check_element_type(operation: &str, expected: ElementType, got: ElementType) -> DispatchResult<()> {
    if expected != got {
        return Err(DispatchError::ElementTypeMismatch {
            operation: operation.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

fn check_extents(operation: &str, host: &Shape, device: &Shape) -> DispatchResult<()> {
    if host.extents() != device.extents() {
        return Err(DispatchError::ShapeMismatch {
            operation: operation.to_string(),
            details: format!("host {} vs device {}", host, device),
        });
    }
    Ok(())
}
