//! Core types and services for the dispatch layer.
//!
//! This module contains the foundational pieces every operation builds on:
//! - Element types, shapes and device array handles
//! - Kernel argument maps
//! - Error types
//! - Context configuration
//! - Host-side arrays and image stacks
//! - The compute context and the chunked transfer engine

pub mod types;
pub mod args;
pub mod error;
pub mod config;
pub mod context;
pub mod host;
pub mod chunked;

// Re-export commonly used types
pub use types::{ArrayId, DeviceArray, ElementType, Region, Representation, RepresentationKind, Shape};
pub use args::{ArgValue, ArgumentRole, KernelArgs};
pub use error::{BackendError, ConfigError, DispatchError, DispatchResult};
pub use config::ContextConfig;
pub use context::ComputeContext;
pub use host::{HostArray, HostData, HostElement, ImageStack, StackPlane};
pub use chunked::TransferEngine;
