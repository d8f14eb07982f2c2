//! Neighbourhood filters: Gaussian blur, box filters and median.

use super::{checks, radius_to_kernel_size, sigma_to_kernel_size, Kernels};
use crate::core::args::KernelArgs;
use crate::core::error::DispatchResult;
use crate::core::types::DeviceArray;
use crate::execution::separable::{AxisPass, SeparableFilter, SeparableKernel};

impl Kernels<'_> {
    /// Gaussian blur with one sigma per axis. A sigma of zero skips that axis.
    pub fn blur(
        &self,
        src: &DeviceArray,
        dst: &DeviceArray,
        sigma_x: f32,
        sigma_y: f32,
        sigma_z: f32,
    ) -> DispatchResult<()> {
        let passes = [sigma_x, sigma_y, sigma_z].map(|sigma| AxisPass::new(sigma_to_kernel_size(sigma), sigma));
        SeparableFilter::new(self.ctx).apply(src, dst, &SeparableKernel::GAUSSIAN_BLUR, passes)
    }

    /// Box mean with one radius per axis.
    pub fn mean_box(&self, src: &DeviceArray, dst: &DeviceArray, radius: [usize; 3]) -> DispatchResult<()> {
        self.box_filter(src, dst, &SeparableKernel::MEAN, radius)
    }

    /// Box minimum with one radius per axis.
    pub fn minimum_box(&self, src: &DeviceArray, dst: &DeviceArray, radius: [usize; 3]) -> DispatchResult<()> {
        self.box_filter(src, dst, &SeparableKernel::MINIMUM, radius)
    }

    /// Box maximum with one radius per axis.
    pub fn maximum_box(&self, src: &DeviceArray, dst: &DeviceArray, radius: [usize; 3]) -> DispatchResult<()> {
        self.box_filter(src, dst, &SeparableKernel::MAXIMUM, radius)
    }

    fn box_filter(
        &self,
        src: &DeviceArray,
        dst: &DeviceArray,
        kernel: &SeparableKernel,
        radius: [usize; 3],
    ) -> DispatchResult<()> {
        let passes = radius.map(|r| AxisPass::new(radius_to_kernel_size(r), r as f32));
        SeparableFilter::new(self.ctx).apply(src, dst, kernel, passes)
    }

    /// Median over a box of one radius per axis.
    ///
    /// The window is held in a fixed-size local array on the device, so its
    /// element count is capped by the context configuration.
    pub fn median_box(&self, src: &DeviceArray, dst: &DeviceArray, radius: [usize; 3]) -> DispatchResult<()> {
        let operation = "median_box";
        let dimensions = src.shape().kernel_dimensions();
        let sizes = radius.map(radius_to_kernel_size);
        let window = &sizes[..dimensions];
        checks::check_window(operation, window, self.ctx.config().max_local_array_size)?;
        checks::check_different(operation, src, dst)?;
        checks::check_same_shape(operation, src, dst)?;

        let mut args = KernelArgs::new()
            .with("src", src)
            .with("dst", dst)
            .with("Nx", sizes[0])
            .with("Ny", sizes[1]);
        if dimensions == 3 {
            args.insert("Nz", sizes[2]);
        }
        let symbol = format!("median_box_image{}d", dimensions);
        self.ctx.execute("filtering.cl", &symbol, args)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::context::ComputeContext;
    use crate::core::error::DispatchError;
    use crate::core::host::HostArray;
    use crate::core::types::{ElementType, Shape};

    #[test]
    fn test_maximum_box_2d() {
        let ctx = ComputeContext::reference();
        let mut values = vec![0u8; 25];
        values[12] = 50;
        let src = ctx
            .transfer()
            .push_buffer(&HostArray::from_vec(Shape::new_2d(5, 5), values).unwrap())
            .unwrap();
        let dst = ctx.create_buffer(Shape::new_2d(5, 5), ElementType::U8).unwrap();

        ctx.kernels().maximum_box(&src, &dst, [1, 1, 0]).unwrap();
        let result = ctx.transfer().pull(&dst).unwrap();
        assert_eq!(result.sum(), 9.0 * 50.0);
        assert_eq!(result.get(0, 0, 0), Some(0.0));
        assert_eq!(ctx.live_allocations(), 2);
    }

    #[test]
    fn test_minimum_box_only_x() {
        let ctx = ComputeContext::reference();
        let src = ctx
            .transfer()
            .push_buffer(&HostArray::from_vec(Shape::new_2d(3, 2), vec![5u16, 1, 5, 7, 7, 7]).unwrap())
            .unwrap();
        let dst = ctx.create_buffer(Shape::new_2d(3, 2), ElementType::U16).unwrap();

        ctx.kernels().minimum_box(&src, &dst, [1, 0, 0]).unwrap();
        let result = ctx.transfer().pull(&dst).unwrap();
        assert_eq!(result.as_slice::<u16>(), Some(&[1u16, 1, 1, 7, 7, 7][..]));
    }

    #[test]
    fn test_median_box_removes_spike() {
        let ctx = ComputeContext::reference();
        let mut values = vec![4.0f32; 27];
        values[13] = 1000.0;
        let src = ctx
            .transfer()
            .push_image(&HostArray::from_vec(Shape::new_3d(3, 3, 3), values).unwrap())
            .unwrap();
        let dst = ctx.create_image(Shape::new_3d(3, 3, 3), ElementType::F32).unwrap();

        ctx.kernels().median_box(&src, &dst, [1, 1, 1]).unwrap();
        assert_eq!(ctx.kernels().sum_pixels(&dst).unwrap(), 27.0 * 4.0);
    }

    #[test]
    fn test_median_window_limit_uses_dimensions() {
        let ctx = ComputeContext::reference();
        let src = ctx.create_buffer(Shape::new_2d(8, 8), ElementType::U8).unwrap();
        let dst = ctx.create_buffer(Shape::new_2d(8, 8), ElementType::U8).unwrap();

        // 31 x 31 = 961 fits; the z radius is ignored for 2D arrays
        ctx.kernels().median_box(&src, &dst, [15, 15, 100]).unwrap();
        assert!(matches!(
            ctx.kernels().median_box(&src, &dst, [16, 16, 0]),
            Err(DispatchError::UnsupportedElementCount { requested: 1089, .. })
        ));
    }

    #[test]
    fn test_median_huge_radius_is_rejected() {
        let ctx = ComputeContext::reference();
        let src = ctx.create_buffer(Shape::new_2d(8, 8), ElementType::U8).unwrap();
        let dst = ctx.create_buffer(Shape::new_2d(8, 8), ElementType::U8).unwrap();
        let live = ctx.live_allocations();

        for radius in [[usize::MAX, 0, 0], [usize::MAX / 2 + 1, 1, 0], [0, usize::MAX, 0]] {
            assert!(matches!(
                ctx.kernels().median_box(&src, &dst, radius),
                Err(DispatchError::UnsupportedElementCount { requested: u64::MAX, maximum: 1000, .. })
            ));
        }
        assert_eq!(ctx.live_allocations(), live);
    }

    #[test]
    fn test_box_huge_radius_fails_without_leaking() {
        let ctx = ComputeContext::reference();
        let src = ctx.create_buffer(Shape::new_2d(8, 8), ElementType::U8).unwrap();
        let dst = ctx.create_buffer(Shape::new_2d(8, 8), ElementType::U8).unwrap();
        let live = ctx.live_allocations();

        assert!(ctx.kernels().mean_box(&src, &dst, [usize::MAX, 0, 0]).is_err());
        assert_eq!(ctx.live_allocations(), live);
    }
}
