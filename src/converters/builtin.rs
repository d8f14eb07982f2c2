//! Built-in converters covering every pair of the four representations.

use super::registry::ConversionRegistry;
use super::{ArrayValue, Converter};
use crate::core::context::ComputeContext;
use crate::core::error::{DispatchError, DispatchResult};
use crate::core::host::ImageStack;
use crate::core::types::{Representation, RepresentationKind};

const DEVICE_KINDS: [RepresentationKind; 2] = [RepresentationKind::LinearBuffer, RepresentationKind::FormattedImage];

/// Register all built-in converters, allocating against `ctx`.
pub fn register_all(registry: &mut ConversionRegistry, ctx: &ComputeContext) {
    for kind in DEVICE_KINDS {
        for other in DEVICE_KINDS.into_iter().filter(|other| *other != kind) {
            registry.register(DeviceKindConverter::new(ctx, kind, other));
        }
        registry.register(DeviceToHost::new(ctx, kind));
        registry.register(DeviceToStack::new(ctx, kind));
        registry.register(HostToDevice::new(ctx, kind));
        registry.register(StackToDevice::new(ctx, kind));
    }
    registry.register(HostToStack);
    registry.register(StackToHost);
}

fn expect(value: &ArrayValue, expected: Representation) -> DispatchResult<()> {
    let got = value.representation();
    if got != expected {
        return Err(DispatchError::UnexpectedRepresentation { expected, got });
    }
    Ok(())
}

/// Copies a device array into a new array of the other device kind.
pub struct DeviceKindConverter {
    ctx: ComputeContext,
    from: RepresentationKind,
    to: RepresentationKind,
}

impl DeviceKindConverter {
    /// Create a converter between two device kinds.
    pub fn new(ctx: &ComputeContext, from: RepresentationKind, to: RepresentationKind) -> Self {
        Self {
            ctx: ctx.clone(),
            from,
            to,
        }
    }
}

impl Converter for DeviceKindConverter {
    fn source_kind(&self) -> Representation {
        self.from.into()
    }

    fn target_kind(&self) -> Representation {
        self.to.into()
    }

    fn convert(&self, value: &ArrayValue) -> DispatchResult<ArrayValue> {
        expect(value, self.source_kind())?;
        let src = value.clone().into_device()?;
        let dst = self.ctx.create(*src.shape(), src.element_type(), self.to)?;
        if let Err(error) = self.ctx.kernels().copy(&src, &dst) {
            self.ctx.release(&dst)?;
            return Err(error);
        }
        Ok(ArrayValue::Device(dst))
    }
}

/// Pulls a device array into a host array.
pub struct DeviceToHost {
    ctx: ComputeContext,
    from: RepresentationKind,
}

impl DeviceToHost {
    /// Create a pull converter for one device kind.
    pub fn new(ctx: &ComputeContext, from: RepresentationKind) -> Self {
        Self { ctx: ctx.clone(), from }
    }
}

impl Converter for DeviceToHost {
    fn source_kind(&self) -> Representation {
        self.from.into()
    }

    fn target_kind(&self) -> Representation {
        Representation::HostArray
    }

    fn convert(&self, value: &ArrayValue) -> DispatchResult<ArrayValue> {
        expect(value, self.source_kind())?;
        let src = value.clone().into_device()?;
        Ok(ArrayValue::Host(self.ctx.transfer().pull(&src)?))
    }
}

/// Pulls a device array into an image stack.
pub struct DeviceToStack {
    ctx: ComputeContext,
    from: RepresentationKind,
}

impl DeviceToStack {
    /// Create a stack pull converter for one device kind.
    pub fn new(ctx: &ComputeContext, from: RepresentationKind) -> Self {
        Self { ctx: ctx.clone(), from }
    }
}

impl Converter for DeviceToStack {
    fn source_kind(&self) -> Representation {
        self.from.into()
    }

    fn target_kind(&self) -> Representation {
        Representation::ImageStack
    }

    fn convert(&self, value: &ArrayValue) -> DispatchResult<ArrayValue> {
        expect(value, self.source_kind())?;
        let src = value.clone().into_device()?;
        Ok(ArrayValue::Stack(self.ctx.transfer().pull_stack(&src)?))
    }
}

/// Pushes a host array into a new device array.
pub struct HostToDevice {
    ctx: ComputeContext,
    to: RepresentationKind,
}

impl HostToDevice {
    /// Create a push converter for one device kind.
    pub fn new(ctx: &ComputeContext, to: RepresentationKind) -> Self {
        Self { ctx: ctx.clone(), to }
    }
}

impl Converter for HostToDevice {
    fn source_kind(&self) -> Representation {
        Representation::HostArray
    }

    fn target_kind(&self) -> Representation {
        self.to.into()
    }

    fn convert(&self, value: &ArrayValue) -> DispatchResult<ArrayValue> {
        let host = value.as_host().ok_or(DispatchError::UnexpectedRepresentation {
            expected: Representation::HostArray,
            got: value.representation(),
        })?;
        Ok(ArrayValue::Device(self.ctx.transfer().push(host, self.to)?))
    }
}

/// Pushes an image stack into a new device array.
pub struct StackToDevice {
    ctx: ComputeContext,
    to: RepresentationKind,
}

impl StackToDevice {
    /// Create a stack push converter for one device kind.
    pub fn new(ctx: &ComputeContext, to: RepresentationKind) -> Self {
        Self { ctx: ctx.clone(), to }
    }
}

impl Converter for StackToDevice {
    fn source_kind(&self) -> Representation {
        Representation::ImageStack
    }

    fn target_kind(&self) -> Representation {
        self.to.into()
    }

    fn convert(&self, value: &ArrayValue) -> DispatchResult<ArrayValue> {
        let stack = value.as_stack().ok_or(DispatchError::UnexpectedRepresentation {
            expected: Representation::ImageStack,
            got: value.representation(),
        })?;
        Ok(ArrayValue::Device(self.ctx.transfer().push_stack(stack, self.to)?))
    }
}

/// Splits a host array into planes. `U32` values become float planes.
pub struct HostToStack;

impl Converter for HostToStack {
    fn source_kind(&self) -> Representation {
        Representation::HostArray
    }

    fn target_kind(&self) -> Representation {
        Representation::ImageStack
    }

    fn convert(&self, value: &ArrayValue) -> DispatchResult<ArrayValue> {
        let host = value.as_host().ok_or(DispatchError::UnexpectedRepresentation {
            expected: Representation::HostArray,
            got: value.representation(),
        })?;
        Ok(ArrayValue::Stack(ImageStack::from_host_array(host)?))
    }
}

/// Flattens an image stack into a host array.
pub struct StackToHost;

impl Converter for StackToHost {
    fn source_kind(&self) -> Representation {
        Representation::ImageStack
    }

    fn target_kind(&self) -> Representation {
        Representation::HostArray
    }

    fn convert(&self, value: &ArrayValue) -> DispatchResult<ArrayValue> {
        let stack = value.as_stack().ok_or(DispatchError::UnexpectedRepresentation {
            expected: Representation::ImageStack,
            got: value.representation(),
        })?;
        Ok(ArrayValue::Host(stack.to_host_array()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::HostArray;
    use crate::core::types::{ElementType, Shape};

    #[test]
    fn test_device_kind_conversion_copies() {
        let ctx = ComputeContext::reference();
        let host = HostArray::from_vec(Shape::new_2d(3, 2), vec![1u16, 2, 3, 4, 5, 6]).unwrap();
        let buffer = ctx.transfer().push_buffer(&host).unwrap();

        let converter = DeviceKindConverter::new(&ctx, RepresentationKind::LinearBuffer, RepresentationKind::FormattedImage);
        let image = converter
            .convert(&ArrayValue::Device(buffer.clone()))
            .unwrap()
            .into_device()
            .unwrap();

        assert!(!image.is_same(&buffer));
        assert_eq!(image.kind(), RepresentationKind::FormattedImage);
        assert_eq!(image.element_type(), ElementType::U16);
        assert_eq!(ctx.transfer().pull(&image).unwrap(), host);
    }

    #[test]
    fn test_wrong_input_is_rejected() {
        let ctx = ComputeContext::reference();
        let image = ctx.create_image(Shape::new_2d(1, 1), ElementType::U8).unwrap();
        let converter = DeviceToHost::new(&ctx, RepresentationKind::LinearBuffer);
        assert!(matches!(
            converter.convert(&ArrayValue::Device(image)),
            Err(DispatchError::UnexpectedRepresentation { .. })
        ));
    }

    #[test]
    fn test_device_kind_rejects_other_kind() {
        let ctx = ComputeContext::reference();
        let image = ctx.create_image(Shape::new_2d(2, 2), ElementType::F32).unwrap();
        let live = ctx.live_allocations();

        let converter = DeviceKindConverter::new(&ctx, RepresentationKind::LinearBuffer, RepresentationKind::FormattedImage);
        assert!(matches!(
            converter.convert(&ArrayValue::Device(image)),
            Err(DispatchError::UnexpectedRepresentation {
                expected: Representation::LinearBuffer,
                got: Representation::FormattedImage,
            })
        ));
        assert_eq!(ctx.live_allocations(), live);
    }

    #[test]
    fn test_register_all_covers_every_pair() {
        let ctx = ComputeContext::reference();
        let registry = ConversionRegistry::with_defaults(&ctx);
        assert_eq!(registry.len(), 12);
        for from in Representation::ALL {
            for to in Representation::ALL {
                assert_eq!(registry.contains(from, to), from != to, "{} -> {}", from, to);
            }
        }
    }
}
