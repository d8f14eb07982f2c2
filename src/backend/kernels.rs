//! Host implementations of the reference kernel catalog.
//!
//! Every kernel works on [`Volume`]s of `f32` values. Narrowing to the
//! destination's element type happens when the result is stored, so the
//! arithmetic here never has to care about integer ranges.

use crate::core::types::Shape;
use rayon::prelude::*;

/// Dense 3D block of values, x fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Extent along x
    pub width: usize,
    /// Extent along y
    pub height: usize,
    /// Extent along z
    pub depth: usize,
    /// Values, x fastest
    pub data: Vec<f32>,
}

impl Volume {
    /// Create a zero-filled volume with the extents of a shape.
    pub fn zeros(shape: &Shape) -> Self {
        let [width, height, depth] = shape.extents();
        Self::from_data(
            width as usize,
            height as usize,
            depth as usize,
            vec![0.0; shape.element_count() as usize],
        )
    }

    /// Wrap existing values.
    pub fn from_data(width: usize, height: usize, depth: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(width * height * depth, data.len());
        Self {
            width,
            height,
            depth,
            data,
        }
    }

    /// Extents as an array.
    pub fn extents(&self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }

    fn plane_len(&self) -> usize {
        self.width * self.height
    }

    fn coordinates(&self, index: usize) -> [usize; 3] {
        let plane = self.plane_len();
        [index % self.width, (index % plane) / self.width, index / plane]
    }

    fn at(&self, [x, y, z]: [usize; 3]) -> f32 {
        self.data[(z * self.height + y) * self.width + x]
    }

    /// Value at a coordinate shifted along one axis, clamped to the edge.
    fn shifted(&self, mut position: [usize; 3], axis: usize, offset: isize) -> f32 {
        let limit = self.extents()[axis] as isize - 1;
        position[axis] = (position[axis] as isize + offset).clamp(0, limit) as usize;
        self.at(position)
    }
}

/// Reduction applied by a one-axis separable pass.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisReducer {
    /// Weighted sum with normalized Gaussian weights
    Gaussian(Vec<f32>),
    /// Arithmetic mean
    Mean,
    /// Minimum
    Min,
    /// Maximum
    Max,
}

impl AxisReducer {
    /// Gaussian reducer for a window of `size` taps and the given sigma.
    pub fn gaussian(size: usize, sigma: f32) -> Self {
        let half = (size / 2) as f32;
        let mut weights: Vec<f32> = (0..size)
            .map(|k| {
                let x = k as f32 - half;
                (-(x * x) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let total: f32 = weights.iter().sum();
        if total > 0.0 {
            weights.iter_mut().for_each(|w| *w /= total);
        }
        AxisReducer::Gaussian(weights)
    }
}

/// Apply one separable pass of `size` taps along `axis`.
///
/// Samples outside the volume are clamped to the nearest edge element.
pub fn separable_pass(src: &Volume, axis: usize, size: usize, reducer: &AxisReducer) -> Volume {
    let size = size.max(1);
    let half = (size / 2) as isize;
    let mut data = vec![0.0; src.data.len()];

    data.par_iter_mut().enumerate().for_each(|(index, value)| {
        let position = src.coordinates(index);
        let taps = (0..size).map(|k| src.shifted(position, axis, k as isize - half));
        *value = match reducer {
            AxisReducer::Gaussian(weights) => taps.zip(weights).map(|(v, w)| v * w).sum(),
            AxisReducer::Mean => taps.sum::<f32>() / size as f32,
            AxisReducer::Min => taps.fold(f32::INFINITY, f32::min),
            AxisReducer::Max => taps.fold(f32::NEG_INFINITY, f32::max),
        };
    });

    Volume::from_data(src.width, src.height, src.depth, data)
}

/// Median over a box window of `window` taps per axis, clamped to the edge.
pub fn median_box(src: &Volume, window: [usize; 3]) -> Volume {
    let halves = window.map(|n| (n.max(1) / 2) as isize);
    let window = window.map(|n| n.max(1));
    let mut data = vec![0.0; src.data.len()];

    data.par_iter_mut().enumerate().for_each(|(index, value)| {
        let [x, y, z] = src.coordinates(index);
        let mut samples = Vec::with_capacity(window.iter().product());
        for dz in 0..window[2] as isize {
            let sz = clamp_axis(z, dz - halves[2], src.depth);
            for dy in 0..window[1] as isize {
                let sy = clamp_axis(y, dy - halves[1], src.height);
                for dx in 0..window[0] as isize {
                    let sx = clamp_axis(x, dx - halves[0], src.width);
                    samples.push(src.at([sx, sy, sz]));
                }
            }
        }
        samples.sort_by(|a, b| a.total_cmp(b));
        *value = samples[samples.len() / 2];
    });

    Volume::from_data(src.width, src.height, src.depth, data)
}

fn clamp_axis(position: usize, offset: isize, extent: usize) -> usize {
    (position as isize + offset).clamp(0, extent as isize - 1) as usize
}

/// Maximum along the z axis, producing a single plane.
pub fn max_project_z(src: &Volume) -> Volume {
    let plane = src.plane_len();
    let data = (0..plane)
        .into_par_iter()
        .map(|offset| {
            (0..src.depth)
                .map(|z| src.data[z * plane + offset])
                .fold(f32::NEG_INFINITY, f32::max)
        })
        .collect();
    Volume::from_data(src.width, src.height, 1, data)
}

/// Extract plane `z` of a volume.
pub fn slice(src: &Volume, z: usize) -> Volume {
    let plane = src.plane_len();
    let start = z * plane;
    Volume::from_data(src.width, src.height, 1, src.data[start..start + plane].to_vec())
}

/// Overwrite plane `z` of `dst` with a single-plane volume.
pub fn put_slice(dst: &mut Volume, plane: &Volume, z: usize) {
    let len = dst.plane_len();
    dst.data[z * len..(z + 1) * len].copy_from_slice(&plane.data);
}

/// Distribute planes round-robin over `count` stacks.
///
/// Plane `z` of the source becomes plane `z / count` of output `z % count`.
pub fn split_stack(src: &Volume, count: usize) -> Vec<Volume> {
    let plane = src.plane_len();
    (0..count)
        .map(|member| {
            let data: Vec<f32> = (member..src.depth)
                .step_by(count)
                .flat_map(|z| src.data[z * plane..(z + 1) * plane].iter().copied())
                .collect();
            let depth = data.len() / plane.max(1);
            Volume::from_data(src.width, src.height, depth, data)
        })
        .collect()
}
