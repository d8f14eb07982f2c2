//! Scoped temporary arrays.
//!
//! Temporaries never outlive the call that created them. The owner releases
//! them explicitly with [`TemporaryArrays::release_all`] to observe release
//! failures; anything still held when the guard drops (an early return
//! through `?`) is released there and failures are logged.

use crate::core::context::ComputeContext;
use crate::core::error::DispatchResult;
use crate::core::types::{DeviceArray, ElementType, RepresentationKind, Shape};
use log::{trace, warn};

/// Arrays allocated for the duration of one call.
pub struct TemporaryArrays<'a> {
    ctx: &'a ComputeContext,
    arrays: Vec<DeviceArray>,
}

impl<'a> TemporaryArrays<'a> {
    /// Create an empty set of temporaries.
    pub fn new(ctx: &'a ComputeContext) -> Self {
        Self {
            ctx,
            arrays: Vec::new(),
        }
    }

    /// Allocate a temporary that is released with this set.
    pub fn allocate(
        &mut self,
        shape: Shape,
        element_type: ElementType,
        kind: RepresentationKind,
    ) -> DispatchResult<DeviceArray> {
        let array = self.ctx.create(shape, element_type, kind)?;
        trace!("allocated temporary {}", array);
        self.arrays.push(array.clone());
        Ok(array)
    }

    /// Number of temporaries held.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Check if no temporaries are held.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Release every temporary, returning the first failure.
    ///
    /// All arrays are attempted even if an earlier release fails.
    pub fn release_all(mut self) -> DispatchResult<()> {
        let mut result = Ok(());
        for array in self.arrays.drain(..) {
            trace!("releasing temporary {}", array);
            if let Err(error) = self.ctx.release(&array) {
                if result.is_ok() {
                    result = Err(error);
                }
            }
        }
        result
    }
}

impl Drop for TemporaryArrays<'_> {
    fn drop(&mut self) {
        for array in self.arrays.drain(..) {
            if let Err(error) = self.ctx.release(&array) {
                warn!("failed to release temporary {}: {}", array, error);
            }
        }
    }
}
