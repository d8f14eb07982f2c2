//! Device array model shared by every component.
//!
//! Element types, representation kinds and representations are closed enums
//! matched exhaustively throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Element type of a device or host array.
///
/// Only `U8`, `U16` and `F32` take part in type unification and have a
/// native plane type on the host. `U32` is representable and transferable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// 32-bit float
    F32,
}

impl ElementType {
    /// Type every mismatched argument is promoted to during unification.
    pub const UNIFIED: ElementType = ElementType::F32;

    /// Size of one element in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::U16 => 2,
            ElementType::U32 | ElementType::F32 => 4,
        }
    }

    /// Whether host image stacks have a native plane type for this element type.
    pub fn has_plane_type(self) -> bool {
        matches!(self, ElementType::U8 | ElementType::U16 | ElementType::F32)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::F32 => "f32",
        };
        f.write_str(name)
    }
}

/// On-device layout of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationKind {
    /// Flat addressable memory
    LinearBuffer,
    /// Texture-like object with the same type and shape
    FormattedImage,
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepresentationKind::LinearBuffer => f.write_str("linear buffer"),
            RepresentationKind::FormattedImage => f.write_str("formatted image"),
        }
    }
}

/// Every representation an array can take, on the device or on the host.
///
/// These are the keys of the conversion registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Device linear buffer
    LinearBuffer,
    /// Device formatted image
    FormattedImage,
    /// Host multi-dimensional array
    HostArray,
    /// Host stack of 2D planes
    ImageStack,
}

impl Representation {
    /// All representations, in registration order.
    pub const ALL: [Representation; 4] = [
        Representation::LinearBuffer,
        Representation::FormattedImage,
        Representation::HostArray,
        Representation::ImageStack,
    ];
}

impl From<RepresentationKind> for Representation {
    fn from(kind: RepresentationKind) -> Self {
        match kind {
            RepresentationKind::LinearBuffer => Representation::LinearBuffer,
            RepresentationKind::FormattedImage => Representation::FormattedImage,
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Representation::LinearBuffer => "linear buffer",
            Representation::FormattedImage => "formatted image",
            Representation::HostArray => "host array",
            Representation::ImageStack => "image stack",
        };
        f.write_str(name)
    }
}

/// Axis extents of an array: width, height and depth.
///
/// 2D shapes have a depth of 1. The number of dimensions is kept separately
/// because kernels are selected by it (`copy_2d` vs `copy_3d`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    extents: [u64; 3],
    dimensions: u8,
}

impl Shape {
    /// Create a 2D shape.
    pub fn new_2d(width: u64, height: u64) -> Self {
        Self {
            extents: [width, height, 1],
            dimensions: 2,
        }
    }

    /// Create a 3D shape.
    pub fn new_3d(width: u64, height: u64, depth: u64) -> Self {
        Self {
            extents: [width, height, depth],
            dimensions: 3,
        }
    }

    /// Create a shape from 1 to 3 extents.
    pub fn from_extents(extents: &[u64]) -> Option<Self> {
        match *extents {
            [width] => Some(Self {
                extents: [width, 1, 1],
                dimensions: 1,
            }),
            [width, height] => Some(Self::new_2d(width, height)),
            [width, height, depth] => Some(Self::new_3d(width, height, depth)),
            _ => None,
        }
    }

    /// Width (fastest varying axis).
    pub fn width(&self) -> u64 {
        self.extents[0]
    }

    /// Height.
    pub fn height(&self) -> u64 {
        self.extents[1]
    }

    /// Depth (slowest varying axis, 1 for 2D).
    pub fn depth(&self) -> u64 {
        self.extents[2]
    }

    /// All three extents.
    pub fn extents(&self) -> [u64; 3] {
        self.extents
    }

    /// Number of dimensions the shape was created with.
    pub fn dimensions(&self) -> usize {
        self.dimensions as usize
    }

    /// Dimension suffix used when selecting kernels. 1D arrays run 2D kernels.
    pub fn kernel_dimensions(&self) -> usize {
        self.dimensions().max(2)
    }

    /// Total number of elements.
    pub fn element_count(&self) -> u64 {
        self.extents.iter().product()
    }

    /// Number of elements in one width × height plane.
    pub fn plane_element_count(&self) -> u64 {
        self.extents[0] * self.extents[1]
    }

    /// Flat index of a coordinate, x fastest.
    pub fn index(&self, x: u64, y: u64, z: u64) -> u64 {
        (z * self.extents[1] + y) * self.extents[0] + x
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimensions {
            1 => write!(f, "{}", self.extents[0]),
            2 => write!(f, "{}x{}", self.extents[0], self.extents[1]),
            _ => write!(
                f,
                "{}x{}x{}",
                self.extents[0], self.extents[1], self.extents[2]
            ),
        }
    }
}

/// A box inside an array, addressed by origin and extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// Offset of the first element on each axis
    pub origin: [u64; 3],
    /// Number of elements on each axis
    pub extent: [u64; 3],
}

impl Region {
    /// Create a new region.
    pub fn new(origin: [u64; 3], extent: [u64; 3]) -> Self {
        Self { origin, extent }
    }

    /// The region covering a whole shape.
    pub fn whole(shape: &Shape) -> Self {
        Self::new([0, 0, 0], shape.extents())
    }

    /// The region covering one width × height plane at depth `z`.
    pub fn plane(shape: &Shape, z: u64) -> Self {
        Self::new([0, 0, z], [shape.width(), shape.height(), 1])
    }

    /// Number of elements in the region.
    pub fn element_count(&self) -> u64 {
        self.extent.iter().product()
    }

    /// Check that the region lies entirely within a shape.
    pub fn fits(&self, shape: &Shape) -> bool {
        let bounds = shape.extents();
        (0..3).all(|axis| {
            self.origin[axis]
                .checked_add(self.extent[axis])
                .map_or(false, |end| end <= bounds[axis])
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})+{}x{}x{}",
            self.origin[0],
            self.origin[1],
            self.origin[2],
            self.extent[0],
            self.extent[1],
            self.extent[2]
        )
    }
}

/// Unique identifier of a device array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayId(pub Uuid);

impl ArrayId {
    /// Create a new random array ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArrayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArrayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Handle to a typed, shaped block of device memory.
///
/// The handle is plain data: cloning it does not copy device memory, and
/// dropping it does not free anything. Memory is released explicitly through
/// [`ComputeContext::release`](crate::core::context::ComputeContext::release).
/// Shape, element type and kind are fixed for the lifetime of the array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceArray {
    id: ArrayId,
    shape: Shape,
    element_type: ElementType,
    kind: RepresentationKind,
}

impl DeviceArray {
    /// Create a handle. Called by backends when they allocate.
    pub fn new(id: ArrayId, shape: Shape, element_type: ElementType, kind: RepresentationKind) -> Self {
        Self {
            id,
            shape,
            element_type,
            kind,
        }
    }

    /// Identifier of the device allocation.
    pub fn id(&self) -> ArrayId {
        self.id
    }

    /// Axis extents.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Element type.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Representation kind.
    pub fn kind(&self) -> RepresentationKind {
        self.kind
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.shape.dimensions()
    }

    /// Total number of elements.
    pub fn element_count(&self) -> u64 {
        self.shape.element_count()
    }

    /// Size of the allocation in bytes.
    pub fn byte_size(&self) -> u64 {
        self.element_count() * self.element_type.size_in_bytes() as u64
    }

    /// Whether two handles refer to the same device allocation.
    pub fn is_same(&self, other: &DeviceArray) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for DeviceArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} [{}]",
            self.element_type, self.kind, self.shape, self.id
        )
    }
}
