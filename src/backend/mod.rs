//! Compute backends.
//!
//! A backend owns device memory and executes kernels selected by file and
//! symbol name. Everything above this seam (unification, orchestration,
//! chunked transfer, conversion) is backend independent.

pub mod kernels;
pub mod reference;

use crate::core::args::KernelArgs;
use crate::core::error::BackendResult;
use crate::core::types::{DeviceArray, ElementType, Region, RepresentationKind, Shape};

pub use reference::{InvocationRecord, ReferenceBackend};

/// A device that holds typed arrays and runs named kernels against them.
///
/// All calls block until the device work has completed. Implementations
/// must be usable from the thread that owns the context; they are never
/// shared between contexts.
pub trait ComputeBackend: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Allocate an uninitialized array.
    fn allocate(
        &self,
        shape: Shape,
        element_type: ElementType,
        kind: RepresentationKind,
    ) -> BackendResult<DeviceArray>;

    /// Free an array. Releasing an unknown array is an error.
    fn release(&self, array: &DeviceArray) -> BackendResult<()>;

    /// Execute `symbol` from the kernel source `file` with named arguments.
    fn execute(&self, file: &str, symbol: &str, args: &KernelArgs) -> BackendResult<()>;

    /// Copy a region of an array into `out`, tightly packed, x fastest.
    fn read_region(&self, array: &DeviceArray, region: &Region, out: &mut [u8]) -> BackendResult<()>;

    /// Copy tightly packed `data` into a region of an array.
    fn write_region(&self, array: &DeviceArray, region: &Region, data: &[u8]) -> BackendResult<()>;

    /// Number of arrays currently allocated.
    fn live_allocations(&self) -> usize;
}
