//! Error types for arraygate.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Name the operation that refused to run
//! - Be raised before any device work when they describe a precondition
//! - Carry actionable advice where there is some

use crate::core::types::{ArrayId, ElementType, Region, Representation, RepresentationKind, Shape};
use thiserror::Error;

/// Top-level error type for dispatch operations.
///
/// Precondition failures are checked before any allocation or kernel
/// invocation. Backend failures propagate unchanged and are always fatal.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{operation}: shape mismatch: {details}")]
    ShapeMismatch { operation: String, details: String },

    #[error("{operation}: source and destination must be different arrays (got {array} twice)")]
    AliasingViolation { operation: String, array: ArrayId },

    #[error("{operation}: representation kinds differ ({left} vs {right})")]
    RepresentationKindMismatch {
        operation: String,
        left: RepresentationKind,
        right: RepresentationKind,
    },

    #[error("{operation}: window of {requested} elements exceeds the maximum of {maximum}")]
    UnsupportedElementCount {
        operation: String,
        requested: u64,
        maximum: u64,
    },

    #[error("{operation}: expected {expected} elements, got {got}")]
    ElementTypeMismatch {
        operation: String,
        expected: ElementType,
        got: ElementType,
    },

    #[error("{operation}: expected {expected}D arrays, got {got}D")]
    DimensionMismatch {
        operation: String,
        expected: usize,
        got: usize,
    },

    #[error("No converter registered from {from} to {to}")]
    NoConverterFound { from: Representation, to: Representation },

    #[error("{operation}: {requested} stack members requested, at most {maximum} supported")]
    TooManyStackMembers {
        operation: String,
        requested: usize,
        maximum: usize,
    },

    #[error("{operation}: at least one output array is required")]
    EmptyStack { operation: String },

    #[error("Expected a {expected} value, got {got}")]
    UnexpectedRepresentation {
        expected: Representation,
        got: Representation,
    },

    #[error("Invalid host data: {0}")]
    InvalidHostData(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by a compute backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Kernel '{symbol}' not found in '{file}'")]
    KernelNotFound { file: String, symbol: String },

    #[error("Failed to allocate {element_type} array of shape {shape}: {reason}")]
    Allocation {
        shape: Shape,
        element_type: ElementType,
        reason: String,
    },

    #[error("Array {0} not found (already released or owned by another context)")]
    ArrayNotFound(ArrayId),

    #[error("Region {region} lies outside array of shape {shape}")]
    RegionOutOfBounds { region: Region, shape: Shape },

    #[error("Kernel '{symbol}' is missing argument '{name}'")]
    MissingArgument { symbol: String, name: String },

    #[error("Kernel '{symbol}': argument '{name}' has the wrong type, expected {expected}")]
    ArgumentType {
        symbol: String,
        name: String,
        expected: String,
    },

    #[error("Transfer of {element_type} data: expected {expected} bytes, got {actual}")]
    ByteLength {
        element_type: ElementType,
        expected: usize,
        actual: usize,
    },

    #[error("Kernel '{symbol}' failed: {reason}")]
    Execution { symbol: String, reason: String },
}

/// Errors loading or saving a context configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access {path}: {error}")]
    Io {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl DispatchError {
    /// Check if this error was raised by a precondition check.
    ///
    /// Precondition errors guarantee that no device work was performed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DispatchError::ShapeMismatch { .. }
                | DispatchError::AliasingViolation { .. }
                | DispatchError::RepresentationKindMismatch { .. }
                | DispatchError::UnsupportedElementCount { .. }
                | DispatchError::ElementTypeMismatch { .. }
                | DispatchError::DimensionMismatch { .. }
                | DispatchError::NoConverterFound { .. }
                | DispatchError::TooManyStackMembers { .. }
                | DispatchError::EmptyStack { .. }
        )
    }

    /// Get suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            DispatchError::AliasingViolation { .. } => {
                Some("Write the result into a separate destination array".to_string())
            }
            DispatchError::RepresentationKindMismatch { left, .. } => Some(format!(
                "Convert both arrays to {} before calling",
                left
            )),
            DispatchError::UnsupportedElementCount { .. } => {
                Some("Reduce the window size".to_string())
            }
            DispatchError::TooManyStackMembers { maximum, .. } => Some(format!(
                "Split into at most {} arrays per call",
                maximum
            )),
            DispatchError::NoConverterFound { from, to } => Some(format!(
                "Register a converter from {} to {}",
                from, to
            )),
            _ => None,
        }
    }
}

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
