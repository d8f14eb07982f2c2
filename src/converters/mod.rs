//! Conversions between array representations.
//!
//! Four representations exist: device linear buffers, device formatted
//! images, host arrays and host image stacks. The registry maps every
//! ordered pair of distinct representations to one converter.

pub mod builtin;
pub mod registry;

pub use registry::ConversionRegistry;

use crate::core::error::{DispatchError, DispatchResult};
use crate::core::host::{HostArray, ImageStack};
use crate::core::types::{DeviceArray, Representation};

/// A value in any of the four representations.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    /// Device array (linear buffer or formatted image)
    Device(DeviceArray),
    /// Host multi-dimensional array
    Host(HostArray),
    /// Host image stack
    Stack(ImageStack),
}

impl ArrayValue {
    /// The representation of this value.
    pub fn representation(&self) -> Representation {
        match self {
            ArrayValue::Device(array) => array.kind().into(),
            ArrayValue::Host(_) => Representation::HostArray,
            ArrayValue::Stack(_) => Representation::ImageStack,
        }
    }

    /// Borrow as a device array.
    pub fn as_device(&self) -> Option<&DeviceArray> {
        match self {
            ArrayValue::Device(array) => Some(array),
            _ => None,
        }
    }

    /// Borrow as a host array.
    pub fn as_host(&self) -> Option<&HostArray> {
        match self {
            ArrayValue::Host(array) => Some(array),
            _ => None,
        }
    }

    /// Borrow as an image stack.
    pub fn as_stack(&self) -> Option<&ImageStack> {
        match self {
            ArrayValue::Stack(stack) => Some(stack),
            _ => None,
        }
    }

    /// Take the device array, or fail with the actual representation.
    pub fn into_device(self) -> DispatchResult<DeviceArray> {
        match self {
            ArrayValue::Device(array) => Ok(array),
            other => Err(other.unexpected(Representation::LinearBuffer)),
        }
    }

    /// Take the host array, or fail with the actual representation.
    pub fn into_host(self) -> DispatchResult<HostArray> {
        match self {
            ArrayValue::Host(array) => Ok(array),
            other => Err(other.unexpected(Representation::HostArray)),
        }
    }

    /// Take the image stack, or fail with the actual representation.
    pub fn into_stack(self) -> DispatchResult<ImageStack> {
        match self {
            ArrayValue::Stack(stack) => Ok(stack),
            other => Err(other.unexpected(Representation::ImageStack)),
        }
    }

    fn unexpected(&self, expected: Representation) -> DispatchError {
        DispatchError::UnexpectedRepresentation {
            expected,
            got: self.representation(),
        }
    }
}

impl From<DeviceArray> for ArrayValue {
    fn from(array: DeviceArray) -> Self {
        ArrayValue::Device(array)
    }
}

impl From<HostArray> for ArrayValue {
    fn from(array: HostArray) -> Self {
        ArrayValue::Host(array)
    }
}

impl From<ImageStack> for ArrayValue {
    fn from(stack: ImageStack) -> Self {
        ArrayValue::Stack(stack)
    }
}

/// Converts values from one representation to another.
///
/// A converter never returns its input: the result is always a newly
/// created value owned by the caller.
pub trait Converter: Send + Sync {
    /// Representation this converter accepts.
    fn source_kind(&self) -> Representation;

    /// Representation this converter produces.
    fn target_kind(&self) -> Representation;

    /// Convert a value of the source representation.
    fn convert(&self, value: &ArrayValue) -> DispatchResult<ArrayValue>;
}
