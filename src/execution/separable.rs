//! Separable filter orchestration.
//!
//! A separable filter runs the same one-axis kernel once per axis. Two float
//! temporaries with the shape and kind of the source carry the intermediate
//! results:
//!
//! ```text
//! 2D: src -> t1 -> dst
//! 3D: src -> t2 -> t1 -> dst
//! ```
//!
//! A stage whose parameter is not positive is replaced by a plain copy, so
//! the final result always lands in the caller's destination.

use crate::core::args::KernelArgs;
use crate::core::context::ComputeContext;
use crate::core::error::DispatchResult;
use crate::core::types::{DeviceArray, ElementType};
use crate::execution::temporaries::TemporaryArrays;
use crate::kernels::checks;
use crate::kernels::duplication::dispatch_copy;
use log::debug;

/// A one-axis kernel, selected by file and symbol stem.
///
/// The symbol for an invocation is the stem followed by `2d` or `3d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparableKernel {
    /// Kernel source file
    pub file: &'static str,
    /// Symbol without the dimension suffix
    pub stem: &'static str,
}

impl SeparableKernel {
    /// Gaussian blur, parameterized by sigma.
    pub const GAUSSIAN_BLUR: SeparableKernel = SeparableKernel::new("blur.cl", "gaussian_blur_sep_image");
    /// Box mean, parameterized by radius.
    pub const MEAN: SeparableKernel = SeparableKernel::new("filtering.cl", "mean_sep_image");
    /// Box minimum, parameterized by radius.
    pub const MINIMUM: SeparableKernel = SeparableKernel::new("filtering.cl", "min_sep_image");
    /// Box maximum, parameterized by radius.
    pub const MAXIMUM: SeparableKernel = SeparableKernel::new("filtering.cl", "max_sep_image");

    /// Describe a kernel by file and symbol stem.
    pub const fn new(file: &'static str, stem: &'static str) -> Self {
        Self { file, stem }
    }

    /// Symbol to invoke for arrays of `dimensions` dimensions.
    pub fn symbol(&self, dimensions: usize) -> String {
        format!("{}{}d", self.stem, dimensions)
    }
}

/// Kernel size and parameter of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPass {
    /// Number of taps (`N`)
    pub kernel_size: usize,
    /// Sigma or radius (`s`)
    pub parameter: f32,
}

impl AxisPass {
    /// Create an axis pass.
    pub fn new(kernel_size: usize, parameter: f32) -> Self {
        Self {
            kernel_size,
            parameter,
        }
    }

    /// A pass that is always replaced by a copy.
    pub fn identity() -> Self {
        Self::new(1, 0.0)
    }

    /// Whether this pass is a copy. NaN parameters count as degenerate.
    pub fn is_degenerate(&self) -> bool {
        !(self.parameter > 0.0)
    }
}

/// One step of the ping-pong plan.
struct Stage<'s> {
    axis: usize,
    from: &'s DeviceArray,
    to: &'s DeviceArray,
}

/// Runs separable kernels against one context.
pub struct SeparableFilter<'a> {
    ctx: &'a ComputeContext,
}

impl<'a> SeparableFilter<'a> {
    /// Bind an orchestrator to a context.
    pub fn new(ctx: &'a ComputeContext) -> Self {
        Self { ctx }
    }

    /// Apply `kernel` along every axis of `src`, writing into `dst`.
    ///
    /// `passes[2]` is ignored for 2D arrays. Preconditions are checked
    /// before anything is allocated.
    pub fn apply(
        &self,
        src: &DeviceArray,
        dst: &DeviceArray,
        kernel: &SeparableKernel,
        passes: [AxisPass; 3],
    ) -> DispatchResult<()> {
        let operation = kernel.stem;
        checks::check_different(operation, src, dst)?;
        checks::check_same_kind(operation, src, dst)?;
        checks::check_same_shape(operation, src, dst)?;

        let dimensions = src.shape().kernel_dimensions();
        let mut temporaries = TemporaryArrays::new(self.ctx);
        let t1 = temporaries.allocate(*src.shape(), ElementType::UNIFIED, src.kind())?;
        let t2 = temporaries.allocate(*src.shape(), ElementType::UNIFIED, src.kind())?;

        let stages = if dimensions == 3 {
            vec![
                Stage { axis: 0, from: src, to: &t2 },
                Stage { axis: 1, from: &t2, to: &t1 },
                Stage { axis: 2, from: &t1, to: dst },
            ]
        } else {
            vec![
                Stage { axis: 0, from: src, to: &t1 },
                Stage { axis: 1, from: &t1, to: dst },
            ]
        };

        let result = stages
            .iter()
            .try_for_each(|stage| self.run_stage(kernel, dimensions, stage, &passes[stage.axis]));
        let released = temporaries.release_all();
        result.and(released)
    }

    fn run_stage(
        &self,
        kernel: &SeparableKernel,
        dimensions: usize,
        stage: &Stage<'_>,
        pass: &AxisPass,
    ) -> DispatchResult<()> {
        if pass.is_degenerate() {
            debug!("{} axis {}: degenerate, copying", kernel.stem, stage.axis);
            return dispatch_copy(self.ctx, stage.from, stage.to);
        }

        debug!(
            "{} axis {}: N = {}, s = {}",
            kernel.stem, stage.axis, pass.kernel_size, pass.parameter
        );
        let args = KernelArgs::new()
            .with("N", pass.kernel_size)
            .with("s", pass.parameter)
            .with("dim", stage.axis)
            .with("src", stage.from)
            .with("dst", stage.to);
        self.ctx.execute(kernel.file, &kernel.symbol(dimensions), args)
    }
}
