//! Precondition checks shared by array operations.
//!
//! Every check runs before any allocation or kernel invocation.

use crate::core::error::{DispatchError, DispatchResult};
use crate::core::types::DeviceArray;

/// Source and destination must be different allocations.
pub fn check_different(operation: &str, src: &DeviceArray, dst: &DeviceArray) -> DispatchResult<()> {
    if src.is_same(dst) {
        return Err(DispatchError::AliasingViolation {
            operation: operation.to_string(),
            array: src.id(),
        });
    }
    Ok(())
}

/// Both arrays must have the same representation kind.
pub fn check_same_kind(operation: &str, left: &DeviceArray, right: &DeviceArray) -> DispatchResult<()> {
    if left.kind() != right.kind() {
        return Err(DispatchError::RepresentationKindMismatch {
            operation: operation.to_string(),
            left: left.kind(),
            right: right.kind(),
        });
    }
    Ok(())
}

/// Both arrays must have equal extents.
pub fn check_same_shape(operation: &str, left: &DeviceArray, right: &DeviceArray) -> DispatchResult<()> {
    if left.shape().extents() != right.shape().extents() {
        return Err(DispatchError::ShapeMismatch {
            operation: operation.to_string(),
            details: format!("{} vs {}", left.shape(), right.shape()),
        });
    }
    Ok(())
}

/// Both arrays must have equal width and height.
pub fn check_same_plane(operation: &str, left: &DeviceArray, right: &DeviceArray) -> DispatchResult<()> {
    let (l, r) = (left.shape(), right.shape());
    if l.width() != r.width() || l.height() != r.height() {
        return Err(DispatchError::ShapeMismatch {
            operation: operation.to_string(),
            details: format!("planes of {}x{} vs {}x{}", l.width(), l.height(), r.width(), r.height()),
        });
    }
    Ok(())
}

/// The array must have exactly `expected` kernel dimensions.
pub fn check_dimensions(operation: &str, array: &DeviceArray, expected: usize) -> DispatchResult<()> {
    let got = array.shape().kernel_dimensions();
    if got != expected {
        return Err(DispatchError::DimensionMismatch {
            operation: operation.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

/// A local window may hold at most `maximum` elements.
pub fn check_window(operation: &str, window: &[usize], maximum: u64) -> DispatchResult<()> {
    let requested = window
        .iter()
        .try_fold(1u64, |acc, &n| acc.checked_mul(n as u64))
        .unwrap_or(u64::MAX);
    if requested > maximum {
        return Err(DispatchError::UnsupportedElementCount {
            operation: operation.to_string(),
            requested,
            maximum,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ArrayId, ElementType, RepresentationKind, Shape};

    fn array(shape: Shape, kind: RepresentationKind) -> DeviceArray {
        DeviceArray::new(ArrayId::new(), shape, ElementType::F32, kind)
    }

    #[test]
    fn test_aliasing() {
        let a = array(Shape::new_2d(2, 2), RepresentationKind::LinearBuffer);
        assert!(check_different("copy", &a, &a.clone()).is_err());
        let b = array(Shape::new_2d(2, 2), RepresentationKind::LinearBuffer);
        assert!(check_different("copy", &a, &b).is_ok());
    }

    #[test]
    fn test_shape_and_kind() {
        let a = array(Shape::new_2d(2, 2), RepresentationKind::LinearBuffer);
        let b = array(Shape::new_3d(2, 2, 1), RepresentationKind::FormattedImage);
        // Same extents, different dimensionality tag
        assert!(check_same_shape("blur", &a, &b).is_ok());
        assert!(matches!(
            check_same_kind("blur", &a, &b),
            Err(DispatchError::RepresentationKindMismatch { .. })
        ));
    }

    #[test]
    fn test_window() {
        assert!(check_window("median", &[9, 9, 9], 1000).is_ok());
        assert!(matches!(
            check_window("median", &[11, 11, 11], 1000),
            Err(DispatchError::UnsupportedElementCount { requested: 1331, .. })
        ));
        assert!(check_window("median", &[usize::MAX, 3], 1000).is_err());
    }
}
