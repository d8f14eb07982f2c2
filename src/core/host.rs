//! Host-side array representations.
//!
//! Two layouts are supported:
//! - [`HostArray`]: a shape plus one flat, typed buffer, x fastest
//! - [`ImageStack`]: a list of 2D planes backed by `image` buffers
//!
//! Both are plain owned values. They are produced by pulls and conversions
//! and belong to the caller.

use crate::core::error::{DispatchError, DispatchResult};
use crate::core::types::{ElementType, Shape};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

/// 16-bit grayscale plane.
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// 32-bit float grayscale plane.
pub type Gray32FImage = ImageBuffer<Luma<f32>, Vec<f32>>;

// ============================================================================
// Host elements
// ============================================================================

/// A primitive that can live in a host buffer and travel to the device.
pub trait HostElement: bytemuck::Pod + Send + Sync + 'static {
    /// Element type tag of this primitive.
    const ELEMENT_TYPE: ElementType;

    /// Wrap values in a typed host buffer.
    fn wrap(values: Vec<Self>) -> HostData;

    /// Borrow a host buffer as this primitive, if the types agree.
    fn view(data: &HostData) -> Option<&[Self]>;
}

macro_rules! host_element {
    ($ty:ty, $variant:ident) => {
        impl HostElement for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn wrap(values: Vec<Self>) -> HostData {
                HostData::$variant(values)
            }

            fn view(data: &HostData) -> Option<&[Self]> {
                match data {
                    HostData::$variant(values) => Some(values.as_slice()),
                    _ => None,
                }
            }
        }
    };
}

host_element!(u8, U8);
host_element!(u16, U16);
host_element!(u32, U32);
host_element!(f32, F32);

/// Typed flat buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum HostData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl HostData {
    /// Zero-filled buffer of `len` elements.
    pub fn zeros(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::U8 => HostData::U8(vec![0; len]),
            ElementType::U16 => HostData::U16(vec![0; len]),
            ElementType::U32 => HostData::U32(vec![0; len]),
            ElementType::F32 => HostData::F32(vec![0.0; len]),
        }
    }

    /// Element type of the buffer.
    pub fn element_type(&self) -> ElementType {
        match self {
            HostData::U8(_) => ElementType::U8,
            HostData::U16(_) => ElementType::U16,
            HostData::U32(_) => ElementType::U32,
            HostData::F32(_) => ElementType::F32,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            HostData::U8(v) => v.len(),
            HostData::U16(v) => v.len(),
            HostData::U32(v) => v.len(),
            HostData::F32(v) => v.len(),
        }
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            HostData::U8(v) => v.as_slice(),
            HostData::U16(v) => bytemuck::cast_slice(v),
            HostData::U32(v) => bytemuck::cast_slice(v),
            HostData::F32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Value at a flat index, widened to `f64`.
    pub fn value(&self, index: usize) -> Option<f64> {
        match self {
            HostData::U8(v) => v.get(index).map(|&x| x as f64),
            HostData::U16(v) => v.get(index).map(|&x| x as f64),
            HostData::U32(v) => v.get(index).map(|&x| x as f64),
            HostData::F32(v) => v.get(index).map(|&x| x as f64),
        }
    }

    /// Sum of all values in `f64`.
    pub fn sum(&self) -> f64 {
        match self {
            HostData::U8(v) => v.iter().map(|&x| x as f64).sum(),
            HostData::U16(v) => v.iter().map(|&x| x as f64).sum(),
            HostData::U32(v) => v.iter().map(|&x| x as f64).sum(),
            HostData::F32(v) => v.iter().map(|&x| x as f64).sum(),
        }
    }

    /// Convert every element to `f32`.
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            HostData::U8(v) => v.iter().map(|&x| x as f32).collect(),
            HostData::U16(v) => v.iter().map(|&x| x as f32).collect(),
            HostData::U32(v) => v.iter().map(|&x| x as f32).collect(),
            HostData::F32(v) => v.clone(),
        }
    }
}

// ============================================================================
// HostArray
// ============================================================================

/// Host multi-dimensional array: a shape and a flat typed buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray {
    shape: Shape,
    data: HostData,
}

impl HostArray {
    /// Create a host array. The buffer length must match the shape.
    pub fn new(shape: Shape, data: HostData) -> DispatchResult<Self> {
        if data.len() as u64 != shape.element_count() {
            return Err(DispatchError::InvalidHostData(format!(
                "{} elements do not fill shape {}",
                data.len(),
                shape
            )));
        }
        Ok(Self { shape, data })
    }

    /// Create a host array from typed values.
    pub fn from_vec<T: HostElement>(shape: Shape, values: Vec<T>) -> DispatchResult<Self> {
        Self::new(shape, T::wrap(values))
    }

    /// Zero-filled host array.
    pub fn zeros(shape: Shape, element_type: ElementType) -> Self {
        Self {
            shape,
            data: HostData::zeros(element_type, shape.element_count() as usize),
        }
    }

    /// Shape of the array.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Element type.
    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// The typed buffer.
    pub fn data(&self) -> &HostData {
        &self.data
    }

    /// Consume the array, returning its buffer.
    pub fn into_data(self) -> HostData {
        self.data
    }

    /// Borrow the values as a concrete primitive.
    pub fn as_slice<T: HostElement>(&self) -> Option<&[T]> {
        T::view(&self.data)
    }

    /// Value at a coordinate, widened to `f64`.
    pub fn get(&self, x: u64, y: u64, z: u64) -> Option<f64> {
        let [width, height, depth] = self.shape.extents();
        if x >= width || y >= height || z >= depth {
            return None;
        }
        self.data.value(self.shape.index(x, y, z) as usize)
    }

    /// Sum of all values.
    pub fn sum(&self) -> f64 {
        self.data.sum()
    }
}

// ============================================================================
// ImageStack
// ============================================================================

/// One 2D plane of an image stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackPlane {
    U8(GrayImage),
    U16(Gray16Image),
    F32(Gray32FImage),
}

impl StackPlane {
    /// Zero-filled plane. `U32` has no plane type.
    pub fn zeros(element_type: ElementType, width: u32, height: u32) -> Option<Self> {
        match element_type {
            ElementType::U8 => Some(StackPlane::U8(GrayImage::new(width, height))),
            ElementType::U16 => Some(StackPlane::U16(Gray16Image::new(width, height))),
            ElementType::F32 => Some(StackPlane::F32(Gray32FImage::new(width, height))),
            ElementType::U32 => None,
        }
    }

    /// Element type of the plane.
    pub fn element_type(&self) -> ElementType {
        match self {
            StackPlane::U8(_) => ElementType::U8,
            StackPlane::U16(_) => ElementType::U16,
            StackPlane::F32(_) => ElementType::F32,
        }
    }

    /// Width and height.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            StackPlane::U8(p) => p.dimensions(),
            StackPlane::U16(p) => p.dimensions(),
            StackPlane::F32(p) => p.dimensions(),
        }
    }

    /// Pixel value widened to `f32`.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        let (width, height) = self.dimensions();
        if x >= width || y >= height {
            return None;
        }
        Some(match self {
            StackPlane::U8(p) => p.get_pixel(x, y).0[0] as f32,
            StackPlane::U16(p) => p.get_pixel(x, y).0[0] as f32,
            StackPlane::F32(p) => p.get_pixel(x, y).0[0],
        })
    }

    /// Raw bytes of the plane, x fastest.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            StackPlane::U8(p) => p.as_raw().as_slice(),
            StackPlane::U16(p) => bytemuck::cast_slice(p.as_raw()),
            StackPlane::F32(p) => bytemuck::cast_slice(p.as_raw()),
        }
    }

    /// Build a plane from typed values. `U32` values have no plane type.
    pub fn from_data(width: u32, height: u32, data: HostData) -> Option<Self> {
        match data {
            HostData::U8(v) => ImageBuffer::from_raw(width, height, v).map(StackPlane::U8),
            HostData::U16(v) => ImageBuffer::from_raw(width, height, v).map(StackPlane::U16),
            HostData::F32(v) => ImageBuffer::from_raw(width, height, v).map(StackPlane::F32),
            HostData::U32(_) => None,
        }
    }
}

/// Host image stack: `depth` planes of `width` × `height` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStack {
    shape: Shape,
    planes: Vec<StackPlane>,
}

impl ImageStack {
    /// Create a stack, checking that the planes fill the shape.
    pub fn new(shape: Shape, planes: Vec<StackPlane>) -> DispatchResult<Self> {
        if planes.len() as u64 != shape.depth() {
            return Err(DispatchError::InvalidHostData(format!(
                "{} planes for shape {}",
                planes.len(),
                shape
            )));
        }
        let expected_type = planes.first().map(StackPlane::element_type);
        for plane in &planes {
            let (width, height) = plane.dimensions();
            if width as u64 != shape.width() || height as u64 != shape.height() {
                return Err(DispatchError::InvalidHostData(format!(
                    "plane of {}x{} in stack of shape {}",
                    width, height, shape
                )));
            }
            if Some(plane.element_type()) != expected_type {
                return Err(DispatchError::InvalidHostData(
                    "planes have different element types".to_string(),
                ));
            }
        }
        Ok(Self { shape, planes })
    }

    /// Create a stack from planes: one plane is 2D, more are 3D.
    pub fn from_planes(planes: Vec<StackPlane>) -> DispatchResult<Self> {
        let (width, height) = planes
            .first()
            .map(StackPlane::dimensions)
            .ok_or_else(|| DispatchError::InvalidHostData("stack has no planes".to_string()))?;
        let shape = if planes.len() == 1 {
            Shape::new_2d(width as u64, height as u64)
        } else {
            Shape::new_3d(width as u64, height as u64, planes.len() as u64)
        };
        Self::new(shape, planes)
    }

    /// Zero-filled stack.
    pub fn zeros(shape: Shape, element_type: ElementType) -> DispatchResult<Self> {
        let (width, height) = plane_size(&shape)?;
        let planes = (0..shape.depth())
            .map(|_| StackPlane::zeros(element_type, width, height))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| no_plane_type(element_type))?;
        Self::new(shape, planes)
    }

    /// Shape of the stack.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Element type shared by all planes.
    pub fn element_type(&self) -> ElementType {
        self.planes
            .first()
            .map(StackPlane::element_type)
            .unwrap_or(ElementType::F32)
    }

    /// Number of planes.
    pub fn depth(&self) -> usize {
        self.planes.len()
    }

    /// All planes, front to back.
    pub fn planes(&self) -> &[StackPlane] {
        &self.planes
    }

    /// Plane at depth `z`.
    pub fn plane(&self, z: usize) -> Option<&StackPlane> {
        self.planes.get(z)
    }

    /// Plane at depth `z` as a `DynamicImage`. Float planes have no luma
    /// representation there and yield `None`.
    pub fn plane_to_dynamic(&self, z: usize) -> Option<DynamicImage> {
        match self.planes.get(z)? {
            StackPlane::U8(p) => Some(DynamicImage::ImageLuma8(p.clone())),
            StackPlane::U16(p) => Some(DynamicImage::ImageLuma16(p.clone())),
            StackPlane::F32(_) => None,
        }
    }

    /// Flatten the planes into a host array of the same element type.
    pub fn to_host_array(&self) -> HostArray {
        let data = match self.element_type() {
            ElementType::U8 => HostData::U8(self.concat(|p| match p {
                StackPlane::U8(p) => Some(p.as_raw().as_slice()),
                _ => None,
            })),
            ElementType::U16 => HostData::U16(self.concat(|p| match p {
                StackPlane::U16(p) => Some(p.as_raw().as_slice()),
                _ => None,
            })),
            ElementType::F32 | ElementType::U32 => HostData::F32(self.concat(|p| match p {
                StackPlane::F32(p) => Some(p.as_raw().as_slice()),
                _ => None,
            })),
        };
        HostArray {
            shape: self.shape,
            data,
        }
    }

    fn concat<T: Copy>(&self, raw: impl Fn(&StackPlane) -> Option<&[T]>) -> Vec<T> {
        let mut values = Vec::with_capacity(self.shape.element_count() as usize);
        for plane in &self.planes {
            if let Some(slice) = raw(plane) {
                values.extend_from_slice(slice);
            }
        }
        values
    }

    /// Split a host array into planes.
    ///
    /// `U32` has no plane type, so its values are converted element by
    /// element into float planes.
    pub fn from_host_array(array: &HostArray) -> DispatchResult<Self> {
        let shape = *array.shape();
        let (width, height) = plane_size(&shape)?;
        let plane_len = shape.plane_element_count() as usize;

        let planes = match array.data() {
            HostData::U8(v) => split_planes(v, plane_len, width, height, StackPlane::U8),
            HostData::U16(v) => split_planes(v, plane_len, width, height, StackPlane::U16),
            HostData::F32(v) => split_planes(v, plane_len, width, height, StackPlane::F32),
            HostData::U32(_) => {
                let converted = array.data().to_f32();
                split_planes(&converted, plane_len, width, height, StackPlane::F32)
            }
        }
        .ok_or_else(|| DispatchError::InvalidHostData(format!("cannot split shape {}", shape)))?;

        Self::new(shape, planes)
    }
}

fn split_planes<P: image::Primitive>(
    values: &[P],
    plane_len: usize,
    width: u32,
    height: u32,
    wrap: impl Fn(ImageBuffer<Luma<P>, Vec<P>>) -> StackPlane,
) -> Option<Vec<StackPlane>>
where
    Luma<P>: image::Pixel<Subpixel = P>,
{
    if plane_len == 0 {
        return Some(Vec::new());
    }
    values
        .chunks(plane_len)
        .map(|chunk| ImageBuffer::from_raw(width, height, chunk.to_vec()).map(&wrap))
        .collect()
}

fn plane_size(shape: &Shape) -> DispatchResult<(u32, u32)> {
    let width = u32::try_from(shape.width());
    let height = u32::try_from(shape.height());
    match (width, height) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(DispatchError::InvalidHostData(format!(
            "planes of shape {} exceed image dimensions",
            shape
        ))),
    }
}

fn no_plane_type(element_type: ElementType) -> DispatchError {
    DispatchError::InvalidHostData(format!("no plane type for {} elements", element_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_array_length_is_checked() {
        let result = HostArray::from_vec(Shape::new_2d(2, 2), vec![1u8, 2, 3]);
        assert!(matches!(result, Err(DispatchError::InvalidHostData(_))));
    }

    #[test]
    fn test_host_array_access() {
        let array = HostArray::from_vec(Shape::new_3d(2, 1, 2), vec![1u16, 2, 3, 4]).unwrap();
        assert_eq!(array.get(1, 0, 1), Some(4.0));
        assert_eq!(array.get(2, 0, 0), None);
        assert_eq!(array.sum(), 10.0);
        assert_eq!(array.as_slice::<u16>(), Some(&[1u16, 2, 3, 4][..]));
        assert!(array.as_slice::<u8>().is_none());
    }

    #[test]
    fn test_stack_round_trip_keeps_type() {
        let array = HostArray::from_vec(Shape::new_3d(2, 2, 3), (0..12u8).collect()).unwrap();
        let stack = ImageStack::from_host_array(&array).unwrap();
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.plane(1).and_then(|p| p.get(1, 1)), Some(7.0));
        assert_eq!(stack.to_host_array(), array);
    }

    #[test]
    fn test_u32_falls_back_to_float_planes() {
        let array = HostArray::from_vec(Shape::new_2d(2, 1), vec![70000u32, 1]).unwrap();
        let stack = ImageStack::from_host_array(&array).unwrap();
        assert_eq!(stack.element_type(), ElementType::F32);
        assert_eq!(stack.plane(0).and_then(|p| p.get(0, 0)), Some(70000.0));
    }

    #[test]
    fn test_mismatched_planes_are_rejected() {
        let planes = vec![
            StackPlane::zeros(ElementType::U8, 2, 2).unwrap(),
            StackPlane::zeros(ElementType::U16, 2, 2).unwrap(),
        ];
        assert!(ImageStack::from_planes(planes).is_err());

        let planes = vec![
            StackPlane::zeros(ElementType::U8, 2, 2).unwrap(),
            StackPlane::zeros(ElementType::U8, 3, 2).unwrap(),
        ];
        assert!(ImageStack::from_planes(planes).is_err());
    }

    #[test]
    fn test_plane_to_dynamic() {
        let stack = ImageStack::zeros(Shape::new_2d(4, 3), ElementType::U16).unwrap();
        let image = stack.plane_to_dynamic(0).unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));

        let float = ImageStack::zeros(Shape::new_2d(4, 3), ElementType::F32).unwrap();
        assert!(float.plane_to_dynamic(0).is_none());
        assert!(ImageStack::zeros(Shape::new_2d(1, 1), ElementType::U32).is_err());
    }
}
