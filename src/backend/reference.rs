//! In-process reference backend.
//!
//! Arrays live in host memory behind a mutex; kernels from the catalog in
//! [`super::kernels`] run on the calling thread, with rayon spreading
//! per-element work. It is the backend every test in this crate runs on and
//! the template for wrapping a real device.

use super::kernels::{self, AxisReducer, Volume};
use super::ComputeBackend;
use crate::core::args::{ArgValue, KernelArgs};
use crate::core::error::{BackendError, BackendResult};
use crate::core::types::{ArrayId, DeviceArray, ElementType, Region, RepresentationKind, Shape};
use log::trace;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One recorded kernel invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRecord {
    /// Kernel source file
    pub file: String,
    /// Kernel symbol
    pub symbol: String,
    /// Arguments as passed by the caller
    pub args: KernelArgs,
}

/// Backend that executes the kernel catalog on the host.
pub struct ReferenceBackend {
    arrays: Mutex<HashMap<ArrayId, Storage>>,
    invocations: Mutex<Vec<InvocationRecord>>,
    record: bool,
}

impl ReferenceBackend {
    /// Create a backend that does not record invocations.
    pub fn new() -> Self {
        Self::with_recording(false)
    }

    /// Create a backend, optionally recording every invocation.
    pub fn with_recording(record: bool) -> Self {
        Self {
            arrays: Mutex::new(HashMap::new()),
            invocations: Mutex::new(Vec::new()),
            record,
        }
    }

    /// Recorded invocations, oldest first.
    pub fn invocations(&self) -> Vec<InvocationRecord> {
        self.invocations.lock().clone()
    }

    /// Forget all recorded invocations.
    pub fn clear_invocations(&self) {
        self.invocations.lock().clear();
    }

    /// Recorded invocations as pretty-printed JSON.
    pub fn invocations_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.invocations.lock())
    }
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for ReferenceBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn allocate(
        &self,
        shape: Shape,
        element_type: ElementType,
        kind: RepresentationKind,
    ) -> BackendResult<DeviceArray> {
        let len = usize::try_from(shape.element_count()).map_err(|_| BackendError::Allocation {
            shape,
            element_type,
            reason: "element count exceeds host address space".to_string(),
        })?;
        let array = DeviceArray::new(ArrayId::new(), shape, element_type, kind);
        self.arrays.lock().insert(
            array.id(),
            Storage {
                array: array.clone(),
                buffer: Buffer::zeroed(element_type, len),
            },
        );
        Ok(array)
    }

    fn release(&self, array: &DeviceArray) -> BackendResult<()> {
        self.arrays
            .lock()
            .remove(&array.id())
            .map(|_| ())
            .ok_or(BackendError::ArrayNotFound(array.id()))
    }

    fn execute(&self, file: &str, symbol: &str, args: &KernelArgs) -> BackendResult<()> {
        let kernel = Kernel::resolve(file, symbol).ok_or_else(|| BackendError::KernelNotFound {
            file: file.to_string(),
            symbol: symbol.to_string(),
        })?;

        if self.record {
            self.invocations.lock().push(InvocationRecord {
                file: file.to_string(),
                symbol: symbol.to_string(),
                args: args.clone(),
            });
        }

        let mut arrays = self.arrays.lock();
        let mut io = KernelIo {
            symbol,
            args,
            arrays: &mut *arrays,
        };
        kernel.run(&mut io)
    }

    fn read_region(&self, array: &DeviceArray, region: &Region, out: &mut [u8]) -> BackendResult<()> {
        let arrays = self.arrays.lock();
        let storage = arrays
            .get(&array.id())
            .ok_or(BackendError::ArrayNotFound(array.id()))?;
        storage.check_region(region, out.len())?;

        let bytes = storage.buffer.bytes();
        for (device, host) in storage.rows(region) {
            out[host].copy_from_slice(&bytes[device]);
        }
        Ok(())
    }

    fn write_region(&self, array: &DeviceArray, region: &Region, data: &[u8]) -> BackendResult<()> {
        let mut arrays = self.arrays.lock();
        let storage = arrays
            .get_mut(&array.id())
            .ok_or(BackendError::ArrayNotFound(array.id()))?;
        storage.check_region(region, data.len())?;

        let rows = storage.rows(region);
        let bytes = storage.buffer.bytes_mut();
        for (device, host) in rows {
            bytes[device].copy_from_slice(&data[host]);
        }
        Ok(())
    }

    fn live_allocations(&self) -> usize {
        self.arrays.lock().len()
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone)]
enum Buffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl Buffer {
    fn zeroed(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::U8 => Buffer::U8(vec![0; len]),
            ElementType::U16 => Buffer::U16(vec![0; len]),
            ElementType::U32 => Buffer::U32(vec![0; len]),
            ElementType::F32 => Buffer::F32(vec![0.0; len]),
        }
    }

    fn element_type(&self) -> ElementType {
        match self {
            Buffer::U8(_) => ElementType::U8,
            Buffer::U16(_) => ElementType::U16,
            Buffer::U32(_) => ElementType::U32,
            Buffer::F32(_) => ElementType::F32,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Buffer::U8(v) => v.as_slice(),
            Buffer::U16(v) => bytemuck::cast_slice(v),
            Buffer::U32(v) => bytemuck::cast_slice(v),
            Buffer::F32(v) => bytemuck::cast_slice(v),
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Buffer::U8(v) => v.as_mut_slice(),
            Buffer::U16(v) => bytemuck::cast_slice_mut(v),
            Buffer::U32(v) => bytemuck::cast_slice_mut(v),
            Buffer::F32(v) => bytemuck::cast_slice_mut(v),
        }
    }

    fn values(&self) -> Vec<f32> {
        match self {
            Buffer::U8(v) => v.iter().map(|&x| x as f32).collect(),
            Buffer::U16(v) => v.iter().map(|&x| x as f32).collect(),
            Buffer::U32(v) => v.iter().map(|&x| x as f32).collect(),
            Buffer::F32(v) => v.clone(),
        }
    }

    /// Store values, saturating and truncating into integer types.
    fn store(&mut self, values: &[f32]) {
        match self {
            Buffer::U8(v) => v.iter_mut().zip(values).for_each(|(d, &s)| *d = s as u8),
            Buffer::U16(v) => v.iter_mut().zip(values).for_each(|(d, &s)| *d = s as u16),
            Buffer::U32(v) => v.iter_mut().zip(values).for_each(|(d, &s)| *d = s as u32),
            Buffer::F32(v) => v.copy_from_slice(values),
        }
    }
}

struct Storage {
    array: DeviceArray,
    buffer: Buffer,
}

impl Storage {
    fn shape(&self) -> &Shape {
        self.array.shape()
    }

    fn volume(&self) -> Volume {
        let [width, height, depth] = self.shape().extents();
        Volume::from_data(
            width as usize,
            height as usize,
            depth as usize,
            self.buffer.values(),
        )
    }

    fn check_region(&self, region: &Region, byte_len: usize) -> BackendResult<()> {
        if !region.fits(self.shape()) {
            return Err(BackendError::RegionOutOfBounds {
                region: *region,
                shape: *self.shape(),
            });
        }
        let element_type = self.buffer.element_type();
        let expected = region.element_count() as usize * element_type.size_in_bytes();
        if expected != byte_len {
            return Err(BackendError::ByteLength {
                element_type,
                expected,
                actual: byte_len,
            });
        }
        Ok(())
    }

    /// Byte ranges of each row of a region: (device range, packed host range).
    fn rows(&self, region: &Region) -> Vec<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let size = self.buffer.element_type().size_in_bytes();
        let row_len = region.extent[0] as usize * size;
        let [x0, y0, z0] = region.origin;
        let mut rows = Vec::with_capacity((region.extent[1] * region.extent[2]) as usize);
        let mut host = 0;
        for z in z0..z0 + region.extent[2] {
            for y in y0..y0 + region.extent[1] {
                let start = self.shape().index(x0, y, z) as usize * size;
                rows.push((start..start + row_len, host..host + row_len));
                host += row_len;
            }
        }
        rows
    }
}

// ============================================================================
// Kernel catalog
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeparableOp {
    Gaussian,
    Mean,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kernel {
    Copy(usize),
    CopySlice,
    PutSliceInStack,
    SplitStack(usize),
    Set(usize),
    AddScalar(usize),
    AddImages(usize),
    Separable(SeparableOp, usize),
    MedianBox(usize),
    MaxProjectZ,
}

fn dimension_suffix(symbol: &str, stem: &str) -> Option<usize> {
    match symbol.strip_prefix(stem)? {
        "2d" => Some(2),
        "3d" => Some(3),
        _ => None,
    }
}

impl Kernel {
    fn resolve(file: &str, symbol: &str) -> Option<Kernel> {
        let kernel = match file {
            "duplication.cl" => match symbol {
                "copy_slice" => Kernel::CopySlice,
                "put_slice_in_stack" => Kernel::PutSliceInStack,
                _ => Kernel::Copy(dimension_suffix(symbol, "copy_")?),
            },
            "stacksplitting.cl" => {
                let count: usize = symbol
                    .strip_prefix("split_")?
                    .strip_suffix("_stacks")?
                    .parse()
                    .ok()?;
                if count < 2 {
                    return None;
                }
                Kernel::SplitStack(count)
            }
            "set.cl" => Kernel::Set(dimension_suffix(symbol, "set_")?),
            "math.cl" => match dimension_suffix(symbol, "add_scalar_") {
                Some(dims) => Kernel::AddScalar(dims),
                None => Kernel::AddImages(dimension_suffix(symbol, "add_images_")?),
            },
            "blur.cl" => Kernel::Separable(
                SeparableOp::Gaussian,
                dimension_suffix(symbol, "gaussian_blur_sep_image")?,
            ),
            "filtering.cl" => {
                let stems = [
                    ("mean_sep_image", SeparableOp::Mean),
                    ("min_sep_image", SeparableOp::Min),
                    ("max_sep_image", SeparableOp::Max),
                ];
                match stems
                    .iter()
                    .find_map(|(stem, op)| dimension_suffix(symbol, stem).map(|d| (*op, d)))
                {
                    Some((op, dims)) => Kernel::Separable(op, dims),
                    None => Kernel::MedianBox(dimension_suffix(symbol, "median_box_image")?),
                }
            }
            "projections.cl" if symbol == "max_project_3d_2d" => Kernel::MaxProjectZ,
            _ => return None,
        };
        Some(kernel)
    }

    fn run(self, io: &mut KernelIo<'_>) -> BackendResult<()> {
        trace!("reference backend running {:?} ({})", self, io.symbol);
        match self {
            Kernel::Copy(dims) => {
                io.expect_dimensions("dst", dims)?;
                io.copy("src", "dst")
            }
            Kernel::CopySlice => {
                io.expect_dimensions("src", 3)?;
                let src = io.read("src")?;
                let z = io.index("slice", src.depth)?;
                io.write("dst", &kernels::slice(&src, z))
            }
            Kernel::PutSliceInStack => {
                io.expect_dimensions("dst", 3)?;
                let plane = io.read("src")?;
                let mut dst = io.read("dst")?;
                let z = io.index("slice", dst.depth)?;
                if plane.width != dst.width || plane.height != dst.height || plane.depth != 1 {
                    return Err(io.fail("slice extents do not match the stack plane"));
                }
                kernels::put_slice(&mut dst, &plane, z);
                io.write("dst", &dst)
            }
            Kernel::SplitStack(count) => {
                let src = io.read("src")?;
                for (member, part) in kernels::split_stack(&src, count).iter().enumerate() {
                    io.write(&format!("dst{}", member), part)?;
                }
                Ok(())
            }
            Kernel::Set(dims) => {
                io.expect_dimensions("dst", dims)?;
                let value = io.float("value")?;
                let shape = *io.storage("dst")?.shape();
                let mut volume = Volume::zeros(&shape);
                volume.data.par_iter_mut().for_each(|v| *v = value);
                io.write("dst", &volume)
            }
            Kernel::AddScalar(dims) => {
                io.expect_dimensions("dst", dims)?;
                let scalar = io.float("scalar")?;
                let mut volume = io.read("src")?;
                volume.data.par_iter_mut().for_each(|v| *v += scalar);
                io.write("dst", &volume)
            }
            Kernel::AddImages(dims) => {
                io.expect_dimensions("dst", dims)?;
                let mut volume = io.read("src")?;
                let other = io.read("src1")?;
                if volume.extents() != other.extents() {
                    return Err(io.fail("summands have different extents"));
                }
                volume
                    .data
                    .par_iter_mut()
                    .zip(other.data.par_iter())
                    .for_each(|(v, o)| *v += o);
                io.write("dst", &volume)
            }
            Kernel::Separable(op, dims) => {
                io.expect_dimensions("dst", dims)?;
                let size = io.size("N")?;
                let axis = io.index("dim", 3)?;
                let reducer = match op {
                    SeparableOp::Gaussian => AxisReducer::gaussian(size, io.float("s")?),
                    SeparableOp::Mean => AxisReducer::Mean,
                    SeparableOp::Min => AxisReducer::Min,
                    SeparableOp::Max => AxisReducer::Max,
                };
                let src = io.read("src")?;
                io.write("dst", &kernels::separable_pass(&src, axis, size, &reducer))
            }
            Kernel::MedianBox(dims) => {
                io.expect_dimensions("dst", dims)?;
                let depth = if dims == 3 { io.size("Nz")? } else { 1 };
                let window = [io.size("Nx")?, io.size("Ny")?, depth];
                let src = io.read("src")?;
                io.write("dst", &kernels::median_box(&src, window))
            }
            Kernel::MaxProjectZ => {
                io.expect_dimensions("src", 3)?;
                let src = io.read("src")?;
                io.write("dst_max", &kernels::max_project_z(&src))
            }
        }
    }
}

/// Argument binding for one kernel run, holding the storage lock.
struct KernelIo<'a> {
    symbol: &'a str,
    args: &'a KernelArgs,
    arrays: &'a mut HashMap<ArrayId, Storage>,
}

impl KernelIo<'_> {
    fn fail(&self, reason: impl Into<String>) -> BackendError {
        BackendError::Execution {
            symbol: self.symbol.to_string(),
            reason: reason.into(),
        }
    }

    fn argument(&self, name: &str) -> BackendResult<&ArgValue> {
        self.args.get(name).ok_or_else(|| BackendError::MissingArgument {
            symbol: self.symbol.to_string(),
            name: name.to_string(),
        })
    }

    fn wrong_type(&self, name: &str, expected: &str) -> BackendError {
        BackendError::ArgumentType {
            symbol: self.symbol.to_string(),
            name: name.to_string(),
            expected: expected.to_string(),
        }
    }

    fn array_id(&self, name: &str) -> BackendResult<ArrayId> {
        self.argument(name)?
            .as_array()
            .map(DeviceArray::id)
            .ok_or_else(|| self.wrong_type(name, "array"))
    }

    fn storage(&self, name: &str) -> BackendResult<&Storage> {
        let id = self.array_id(name)?;
        self.arrays.get(&id).ok_or(BackendError::ArrayNotFound(id))
    }

    fn float(&self, name: &str) -> BackendResult<f32> {
        self.argument(name)?
            .as_float()
            .ok_or_else(|| self.wrong_type(name, "number"))
    }

    fn int(&self, name: &str) -> BackendResult<i64> {
        self.argument(name)?
            .as_int()
            .ok_or_else(|| self.wrong_type(name, "integer"))
    }

    /// Integer argument used as an index below `bound`.
    fn index(&self, name: &str, bound: usize) -> BackendResult<usize> {
        let value = self.int(name)?;
        usize::try_from(value)
            .ok()
            .filter(|&index| index < bound)
            .ok_or_else(|| self.fail(format!("'{}' = {} is out of range 0..{}", name, value, bound)))
    }

    /// Integer argument used as a window size.
    fn size(&self, name: &str) -> BackendResult<usize> {
        let value = self.int(name)?;
        usize::try_from(value)
            .ok()
            .filter(|&size| size > 0)
            .ok_or_else(|| self.fail(format!("'{}' = {} is not a valid window size", name, value)))
    }

    fn expect_dimensions(&self, name: &str, dims: usize) -> BackendResult<()> {
        let actual = self.storage(name)?.shape().kernel_dimensions();
        if actual != dims {
            return Err(self.fail(format!(
                "'{}' is {}D but the kernel expects {}D",
                name, actual, dims
            )));
        }
        Ok(())
    }

    fn read(&self, name: &str) -> BackendResult<Volume> {
        Ok(self.storage(name)?.volume())
    }

    fn write(&mut self, name: &str, volume: &Volume) -> BackendResult<()> {
        let id = self.array_id(name)?;
        let extents = self.storage(name)?.shape().extents().map(|e| e as usize);
        if extents != volume.extents() {
            return Err(self.fail(format!(
                "'{}' has extents {:?}, result has {:?}",
                name,
                extents,
                volume.extents()
            )));
        }
        let storage = self.arrays.get_mut(&id).ok_or(BackendError::ArrayNotFound(id))?;
        storage.buffer.store(&volume.data);
        Ok(())
    }

    /// Copy with exact bits when the element types agree, saturating otherwise.
    fn copy(&mut self, src: &str, dst: &str) -> BackendResult<()> {
        let source = self.storage(src)?;
        let target = self.storage(dst)?;
        if source.shape().extents() != target.shape().extents() {
            return Err(self.fail(format!(
                "cannot copy {} into {}",
                source.shape(),
                target.shape()
            )));
        }
        if source.buffer.element_type() == target.buffer.element_type() {
            let buffer = source.buffer.clone();
            let id = self.array_id(dst)?;
            let storage = self.arrays.get_mut(&id).ok_or(BackendError::ArrayNotFound(id))?;
            storage.buffer = buffer;
            Ok(())
        } else {
            let volume = source.volume();
            self.write(dst, &volume)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(backend: &ReferenceBackend, array: &DeviceArray, values: &[f32]) {
        backend
            .write_region(array, &Region::whole(array.shape()), bytemuck::cast_slice(values))
            .unwrap();
    }

    fn download_f32(backend: &ReferenceBackend, array: &DeviceArray) -> Vec<f32> {
        let mut values = vec![0.0f32; array.element_count() as usize];
        backend
            .read_region(
                array,
                &Region::whole(array.shape()),
                bytemuck::cast_slice_mut(&mut values),
            )
            .unwrap();
        values
    }

    #[test]
    fn test_allocate_and_release() {
        let backend = ReferenceBackend::new();
        let array = backend
            .allocate(Shape::new_2d(4, 4), ElementType::U8, RepresentationKind::LinearBuffer)
            .unwrap();
        assert_eq!(backend.live_allocations(), 1);

        backend.release(&array).unwrap();
        assert_eq!(backend.live_allocations(), 0);
        assert_eq!(
            backend.release(&array),
            Err(BackendError::ArrayNotFound(array.id()))
        );
    }

    #[test]
    fn test_unknown_kernel() {
        let backend = ReferenceBackend::new();
        let result = backend.execute("blur.cl", "bilateral_2d", &KernelArgs::new());
        assert!(matches!(result, Err(BackendError::KernelNotFound { .. })));
    }

    #[test]
    fn test_region_transfer() {
        let backend = ReferenceBackend::new();
        let shape = Shape::new_3d(3, 2, 2);
        let array = backend
            .allocate(shape, ElementType::F32, RepresentationKind::LinearBuffer)
            .unwrap();
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        upload(&backend, &array, &values);

        let mut plane = vec![0.0f32; 6];
        backend
            .read_region(&array, &Region::plane(&shape, 1), bytemuck::cast_slice_mut(&mut plane))
            .unwrap();
        assert_eq!(plane, vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);

        let mut bytes = vec![0u8; 4];
        let outside = Region::new([0, 0, 2], [1, 1, 1]);
        assert!(matches!(
            backend.read_region(&array, &outside, &mut bytes),
            Err(BackendError::RegionOutOfBounds { .. })
        ));

        let mut short = vec![0u8; 3];
        assert!(matches!(
            backend.read_region(&array, &Region::new([0, 0, 0], [1, 1, 1]), &mut short),
            Err(BackendError::ByteLength { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_add_scalar_saturates() {
        let backend = ReferenceBackend::new();
        let shape = Shape::new_2d(2, 1);
        let src = backend
            .allocate(shape, ElementType::F32, RepresentationKind::LinearBuffer)
            .unwrap();
        let dst = backend
            .allocate(shape, ElementType::U8, RepresentationKind::LinearBuffer)
            .unwrap();
        upload(&backend, &src, &[250.0, 3.7]);

        let args = KernelArgs::new()
            .with("src", &src)
            .with("scalar", 10.0f32)
            .with("dst", &dst);
        backend.execute("math.cl", "add_scalar_2d", &args).unwrap();

        let mut out = vec![0u8; 2];
        backend.read_region(&dst, &Region::whole(&shape), &mut out).unwrap();
        assert_eq!(out, vec![255, 13]);
    }

    #[test]
    fn test_dimension_suffix_is_checked() {
        let backend = ReferenceBackend::new();
        let shape = Shape::new_3d(2, 2, 2);
        let src = backend
            .allocate(shape, ElementType::F32, RepresentationKind::LinearBuffer)
            .unwrap();
        let dst = backend
            .allocate(shape, ElementType::F32, RepresentationKind::LinearBuffer)
            .unwrap();
        let args = KernelArgs::new().with("src", &src).with("dst", &dst);

        assert!(matches!(
            backend.execute("duplication.cl", "copy_2d", &args),
            Err(BackendError::Execution { .. })
        ));
        backend.execute("duplication.cl", "copy_3d", &args).unwrap();
    }

    #[test]
    fn test_missing_argument() {
        let backend = ReferenceBackend::new();
        let dst = backend
            .allocate(Shape::new_2d(1, 1), ElementType::F32, RepresentationKind::LinearBuffer)
            .unwrap();
        let args = KernelArgs::new().with("dst", &dst);
        assert!(matches!(
            backend.execute("set.cl", "set_2d", &args),
            Err(BackendError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_separable_pass_along_z() {
        let backend = ReferenceBackend::new();
        let shape = Shape::new_3d(1, 1, 3);
        let src = backend
            .allocate(shape, ElementType::F32, RepresentationKind::FormattedImage)
            .unwrap();
        let dst = backend
            .allocate(shape, ElementType::F32, RepresentationKind::FormattedImage)
            .unwrap();
        upload(&backend, &src, &[1.0, 9.0, 2.0]);

        let args = KernelArgs::new()
            .with("src", &src)
            .with("dst", &dst)
            .with("N", 3)
            .with("s", 1.0f32)
            .with("dim", 2);
        backend.execute("filtering.cl", "max_sep_image3d", &args).unwrap();
        assert_eq!(download_f32(&backend, &dst), vec![9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_recording() {
        let backend = ReferenceBackend::with_recording(true);
        let dst = backend
            .allocate(Shape::new_2d(2, 2), ElementType::U16, RepresentationKind::LinearBuffer)
            .unwrap();
        let args = KernelArgs::new().with("dst", &dst).with("value", 7.0f32);
        backend.execute("set.cl", "set_2d", &args).unwrap();

        let invocations = backend.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].symbol, "set_2d");

        let json = backend.invocations_json().unwrap();
        let parsed: Vec<InvocationRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, invocations);

        backend.clear_invocations();
        assert!(backend.invocations().is_empty());
    }
}
