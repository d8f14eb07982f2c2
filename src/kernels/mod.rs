//! Array operations.
//!
//! [`Kernels`] is the operations surface over a context. Each operation
//! checks its preconditions, then dispatches through the type unifier (or
//! the separable orchestrator) to the backend.
//!
//! # Example
//!
//! ```rust
//! use arraygate::prelude::*;
//!
//! let ctx = ComputeContext::reference();
//! let src = ctx.create_buffer(Shape::new_2d(16, 16), ElementType::U8)?;
//! let dst = ctx.create_buffer(Shape::new_2d(16, 16), ElementType::F32)?;
//!
//! ctx.kernels().set(&src, 10.0)?;
//! ctx.kernels().blur(&src, &dst, 2.0, 2.0, 0.0)?;
//! assert_eq!(ctx.kernels().sum_pixels(&dst)?.round(), 2560.0);
//! # Ok::<(), arraygate::core::error::DispatchError>(())
//! ```

pub mod checks;
pub mod duplication;
pub mod filtering;
pub mod math;

use crate::core::context::ComputeContext;

/// Kernel size covering `sigma` on both sides: `⌊8σ⌋`, made odd.
pub fn sigma_to_kernel_size(sigma: f32) -> usize {
    let n = (sigma * 8.0) as usize;
    if n % 2 == 0 {
        n.saturating_add(1)
    } else {
        n
    }
}

/// Kernel size of a box of the given radius: `2r + 1`, saturating at `usize::MAX`.
pub fn radius_to_kernel_size(radius: usize) -> usize {
    radius.saturating_mul(2).saturating_add(1)
}

/// Operations bound to one compute context.
#[derive(Debug, Clone, Copy)]
pub struct Kernels<'a> {
    ctx: &'a ComputeContext,
}

impl<'a> Kernels<'a> {
    /// Bind the operations to a context.
    pub fn new(ctx: &'a ComputeContext) -> Self {
        Self { ctx }
    }

    /// The context operations dispatch to.
    pub fn context(&self) -> &'a ComputeContext {
        self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigma_to_kernel_size() {
        assert_eq!(sigma_to_kernel_size(0.0), 1);
        assert_eq!(sigma_to_kernel_size(1.0), 9);
        assert_eq!(sigma_to_kernel_size(1.1), 9);
        assert_eq!(sigma_to_kernel_size(2.0), 17);
        assert_eq!(sigma_to_kernel_size(-1.0), 1);
    }

    #[test]
    fn test_radius_to_kernel_size() {
        assert_eq!(radius_to_kernel_size(0), 1);
        assert_eq!(radius_to_kernel_size(3), 7);
        assert_eq!(radius_to_kernel_size(usize::MAX / 2), usize::MAX);
        assert_eq!(radius_to_kernel_size(usize::MAX), usize::MAX);
    }
}
