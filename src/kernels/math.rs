//! Pointwise arithmetic, reductions and projections.

use super::checks;
use super::Kernels;
use crate::core::args::KernelArgs;
use crate::core::error::DispatchResult;
use crate::core::types::DeviceArray;

const MATH: &str = "math.cl";

impl Kernels<'_> {
    /// Fill `dst` with `value`.
    pub fn set(&self, dst: &DeviceArray, value: f32) -> DispatchResult<()> {
        let args = KernelArgs::new().with("dst", dst).with("value", value);
        let symbol = format!("set_{}d", dst.shape().kernel_dimensions());
        self.ctx.execute("set.cl", &symbol, args)
    }

    /// `dst = src + scalar`, saturating into the type of `dst`.
    pub fn add_image_and_scalar(&self, src: &DeviceArray, dst: &DeviceArray, scalar: f32) -> DispatchResult<()> {
        let operation = "add_image_and_scalar";
        checks::check_different(operation, src, dst)?;
        checks::check_same_shape(operation, src, dst)?;

        let args = KernelArgs::new()
            .with("src", src)
            .with("scalar", scalar)
            .with("dst", dst);
        let symbol = format!("add_scalar_{}d", dst.shape().kernel_dimensions());
        self.ctx.execute(MATH, &symbol, args)
    }

    /// `dst = src + src1`. Summands of different types are added as floats.
    pub fn add_images(&self, src: &DeviceArray, src1: &DeviceArray, dst: &DeviceArray) -> DispatchResult<()> {
        let operation = "add_images";
        checks::check_different(operation, src, dst)?;
        checks::check_different(operation, src1, dst)?;
        checks::check_same_shape(operation, src, src1)?;
        checks::check_same_shape(operation, src, dst)?;

        let args = KernelArgs::new()
            .with("src", src)
            .with("src1", src1)
            .with("dst", dst);
        let symbol = format!("add_images_{}d", dst.shape().kernel_dimensions());
        self.ctx.execute(MATH, &symbol, args)
    }

    /// Sum of all elements, computed on the host after a pull.
    pub fn sum_pixels(&self, src: &DeviceArray) -> DispatchResult<f64> {
        Ok(self.ctx.transfer().pull(src)?.sum())
    }

    /// Maximum along z of a 3D `src` into a 2D `dst`.
    pub fn maximum_z_projection(&self, src: &DeviceArray, dst: &DeviceArray) -> DispatchResult<()> {
        let operation = "maximum_z_projection";
        checks::check_different(operation, src, dst)?;
        checks::check_dimensions(operation, src, 3)?;
        checks::check_dimensions(operation, dst, 2)?;
        checks::check_same_plane(operation, src, dst)?;

        let args = KernelArgs::new().with("src", src).with("dst_max", dst);
        self.ctx.execute("projections.cl", "max_project_3d_2d", args)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::context::ComputeContext;
    use crate::core::error::DispatchError;
    use crate::core::host::HostArray;
    use crate::core::types::{ElementType, Shape};

    #[test]
    fn test_add_images_with_mixed_inputs() {
        let ctx = ComputeContext::reference();
        let shape = Shape::new_2d(2, 1);
        let a = ctx
            .transfer()
            .push_buffer(&HostArray::from_vec(shape, vec![200u8, 10]).unwrap())
            .unwrap();
        let b = ctx
            .transfer()
            .push_buffer(&HostArray::from_vec(shape, vec![0.5f32, 0.25]).unwrap())
            .unwrap();
        let dst = ctx.create_buffer(shape, ElementType::F32).unwrap();

        ctx.kernels().add_images(&a, &b, &dst).unwrap();
        let sum = ctx.transfer().pull(&dst).unwrap();
        assert_eq!(sum.as_slice::<f32>(), Some(&[200.5f32, 10.25][..]));
        assert_eq!(ctx.live_allocations(), 3);
    }

    #[test]
    fn test_maximum_z_projection() {
        let ctx = ComputeContext::reference();
        let src = ctx
            .transfer()
            .push_buffer(&HostArray::from_vec(Shape::new_3d(2, 1, 3), vec![1u16, 9, 7, 2, 3, 4]).unwrap())
            .unwrap();
        let dst = ctx.create_buffer(Shape::new_2d(2, 1), ElementType::U16).unwrap();

        ctx.kernels().maximum_z_projection(&src, &dst).unwrap();
        let projected = ctx.transfer().pull(&dst).unwrap();
        assert_eq!(projected.as_slice::<u16>(), Some(&[7u16, 9][..]));

        assert!(matches!(
            ctx.kernels().maximum_z_projection(&dst, &src),
            Err(DispatchError::DimensionMismatch { expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn test_set_and_sum() {
        let ctx = ComputeContext::reference();
        let array = ctx.create_image(Shape::new_3d(3, 3, 3), ElementType::U8).unwrap();
        ctx.kernels().set(&array, 300.0).unwrap();
        assert_eq!(ctx.kernels().sum_pixels(&array).unwrap(), 27.0 * 255.0);
    }
}
