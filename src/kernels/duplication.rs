//! Copies, slices and stack splitting.

use super::checks;
use super::Kernels;
use crate::core::args::KernelArgs;
use crate::core::context::ComputeContext;
use crate::core::error::{DispatchError, DispatchResult};
use crate::core::types::DeviceArray;
use log::debug;

const DUPLICATION: &str = "duplication.cl";
const STACK_SPLITTING: &str = "stacksplitting.cl";

/// Copy `src` into `dst` with the backend copy kernel, bypassing unification.
///
/// Used by the unifier and the orchestrator for their own converting copies.
pub(crate) fn dispatch_copy(ctx: &ComputeContext, src: &DeviceArray, dst: &DeviceArray) -> DispatchResult<()> {
    let args = KernelArgs::new().with("src", src).with("dst", dst);
    let symbol = format!("copy_{}d", dst.shape().kernel_dimensions());
    ctx.execute_direct(DUPLICATION, &symbol, &args)
}

impl Kernels<'_> {
    /// Copy `src` into `dst`, converting the element type.
    ///
    /// Narrowing writes saturate: a `u16` of 300 lands in a `u8` as 255.
    pub fn copy(&self, src: &DeviceArray, dst: &DeviceArray) -> DispatchResult<()> {
        checks::check_different("copy", src, dst)?;
        checks::check_same_shape("copy", src, dst)?;
        let args = KernelArgs::new().with("src", src).with("dst", dst);
        let symbol = format!("copy_{}d", dst.shape().kernel_dimensions());
        self.ctx.execute(DUPLICATION, &symbol, args)
    }

    /// Copy one plane between a 3D stack and a 2D array.
    ///
    /// With a 3D source, plane `slice` of `src` is copied into `dst`. With a
    /// 2D source, `src` is written into plane `slice` of `dst`.
    pub fn copy_slice(&self, src: &DeviceArray, dst: &DeviceArray, slice: usize) -> DispatchResult<()> {
        let operation = "copy_slice";
        checks::check_different(operation, src, dst)?;
        checks::check_same_plane(operation, src, dst)?;

        let (stack, symbol) = match (src.shape().kernel_dimensions(), dst.shape().kernel_dimensions()) {
            (3, 2) => (src, "copy_slice"),
            (2, 3) => (dst, "put_slice_in_stack"),
            (_, got) => {
                return Err(DispatchError::DimensionMismatch {
                    operation: operation.to_string(),
                    expected: if src.shape().kernel_dimensions() == 3 { 2 } else { 3 },
                    got,
                })
            }
        };
        if slice as u64 >= stack.shape().depth() {
            return Err(DispatchError::ShapeMismatch {
                operation: operation.to_string(),
                details: format!("slice {} outside depth {}", slice, stack.shape().depth()),
            });
        }

        let args = KernelArgs::new()
            .with("src", src)
            .with("dst", dst)
            .with("slice", slice);
        self.ctx.execute(DUPLICATION, symbol, args)
    }

    /// Distribute the planes of `src` round-robin over `outputs`.
    ///
    /// Plane `z` goes to plane `z / n` of output `z % n`. A single output
    /// degrades to a copy. Outputs must be distinct arrays.
    pub fn split_stack(&self, src: &DeviceArray, outputs: &[DeviceArray]) -> DispatchResult<()> {
        let operation = "split_stack";
        let maximum = self.ctx.config().max_stack_members;
        match outputs.len() {
            0 => {
                return Err(DispatchError::EmptyStack {
                    operation: operation.to_string(),
                })
            }
            1 => return self.copy(src, &outputs[0]),
            n if n > maximum => {
                return Err(DispatchError::TooManyStackMembers {
                    operation: operation.to_string(),
                    requested: n,
                    maximum,
                })
            }
            _ => {}
        }

        checks::check_dimensions(operation, src, 3)?;
        for (member, output) in outputs.iter().enumerate() {
            checks::check_different(operation, src, output)?;
            checks::check_same_plane(operation, src, output)?;
            for other in &outputs[member + 1..] {
                checks::check_different(operation, output, other)?;
            }
        }

        debug!("splitting {} into {} stacks", src, outputs.len());
        let mut args = KernelArgs::new().with("src", src);
        for (member, output) in outputs.iter().enumerate() {
            args.insert(format!("dst{}", member), output);
        }
        let symbol = format!("split_{}_stacks", outputs.len());
        self.ctx.execute(STACK_SPLITTING, &symbol, args)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::context::ComputeContext;
    use crate::core::error::DispatchError;
    use crate::core::host::HostArray;
    use crate::core::types::{ElementType, Shape};

    #[test]
    fn test_copy_slice_both_directions() {
        let ctx = ComputeContext::reference();
        let values: Vec<u8> = (0..12).collect();
        let stack = ctx
            .transfer()
            .push_buffer(&HostArray::from_vec(Shape::new_3d(2, 2, 3), values).unwrap())
            .unwrap();
        let plane = ctx.create_buffer(Shape::new_2d(2, 2), ElementType::U8).unwrap();

        ctx.kernels().copy_slice(&stack, &plane, 2).unwrap();
        let pulled = ctx.transfer().pull(&plane).unwrap();
        assert_eq!(pulled.as_slice::<u8>(), Some(&[8u8, 9, 10, 11][..]));

        ctx.kernels().copy_slice(&plane, &stack, 0).unwrap();
        let pulled = ctx.transfer().pull(&stack).unwrap();
        assert_eq!(pulled.get(1, 1, 0), Some(11.0));

        assert!(matches!(
            ctx.kernels().copy_slice(&stack, &plane, 3),
            Err(DispatchError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_split_stack() {
        let ctx = ComputeContext::reference();
        let values: Vec<f32> = (0..5).map(|v| v as f32).collect();
        let src = ctx
            .transfer()
            .push_buffer(&HostArray::from_vec(Shape::new_3d(1, 1, 5), values).unwrap())
            .unwrap();
        let even = ctx.create_buffer(Shape::new_3d(1, 1, 3), ElementType::U8).unwrap();
        let odd = ctx.create_buffer(Shape::new_3d(1, 1, 2), ElementType::U8).unwrap();

        ctx.kernels().split_stack(&src, &[even.clone(), odd.clone()]).unwrap();
        assert_eq!(ctx.transfer().pull(&even).unwrap().sum(), 6.0);
        assert_eq!(ctx.transfer().pull(&odd).unwrap().sum(), 4.0);
    }

    #[test]
    fn test_split_stack_rejects_repeated_output() {
        let ctx = ComputeContext::reference();
        let values: Vec<f32> = (1..=4).map(|v| v as f32).collect();
        let src = ctx
            .transfer()
            .push_buffer(&HostArray::from_vec(Shape::new_3d(1, 1, 4), values).unwrap())
            .unwrap();
        let first = ctx.create_buffer(Shape::new_3d(1, 1, 2), ElementType::F32).unwrap();
        let second = ctx.create_buffer(Shape::new_3d(1, 1, 2), ElementType::F32).unwrap();

        let result = ctx
            .kernels()
            .split_stack(&src, &[first.clone(), second.clone(), first.clone()]);
        match result {
            Err(DispatchError::AliasingViolation { operation, array }) => {
                assert_eq!(operation, "split_stack");
                assert_eq!(array, first.id());
            }
            other => panic!("expected an aliasing violation, got {:?}", other),
        }
        assert_eq!(ctx.transfer().pull(&first).unwrap().sum(), 0.0);
        assert_eq!(ctx.transfer().pull(&second).unwrap().sum(), 0.0);
    }
}
