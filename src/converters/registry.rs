//! Conversion registry keyed by (source, target) representation.

use super::{ArrayValue, Converter};
use crate::core::context::ComputeContext;
use crate::core::error::{DispatchError, DispatchResult};
use crate::core::types::Representation;
use indexmap::IndexMap;
use log::debug;
use std::sync::Arc;

/// Registry of converters, one per ordered pair of representations.
///
/// Lookup is an exact match on the pair. There is no fallback through
/// intermediate representations and no identity conversion.
#[derive(Clone, Default)]
pub struct ConversionRegistry {
    converters: IndexMap<(Representation, Representation), Arc<dyn Converter>>,
}

impl ConversionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in converter, bound to `ctx`.
    pub fn with_defaults(ctx: &ComputeContext) -> Self {
        let mut registry = Self::new();
        crate::converters::builtin::register_all(&mut registry, ctx);
        registry
    }

    /// Register a converter under the pair it declares.
    ///
    /// Returns the converter previously registered for that pair, if any.
    pub fn register<C>(&mut self, converter: C) -> Option<Arc<dyn Converter>>
    where
        C: Converter + 'static,
    {
        let key = (converter.source_kind(), converter.target_kind());
        self.converters.insert(key, Arc::new(converter))
    }

    /// Find the converter for a pair.
    pub fn lookup(&self, from: Representation, to: Representation) -> DispatchResult<Arc<dyn Converter>> {
        self.converters
            .get(&(from, to))
            .cloned()
            .ok_or(DispatchError::NoConverterFound { from, to })
    }

    /// Check if a pair is registered.
    pub fn contains(&self, from: Representation, to: Representation) -> bool {
        self.converters.contains_key(&(from, to))
    }

    /// All registered pairs, in registration order.
    pub fn pairs(&self) -> impl Iterator<Item = (Representation, Representation)> + '_ {
        self.converters.keys().copied()
    }

    /// Remove the converter for a pair.
    pub fn unregister(&mut self, from: Representation, to: Representation) -> bool {
        self.converters.shift_remove(&(from, to)).is_some()
    }

    /// Convert a value into the target representation.
    pub fn convert(&self, value: &ArrayValue, target: Representation) -> DispatchResult<ArrayValue> {
        let source = value.representation();
        let converter = self.lookup(source, target)?;
        debug!("converting {} -> {}", source, target);
        converter.convert(value)
    }

    /// Get the total number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::builtin::StackToHost;
    use crate::core::host::HostArray;
    use crate::core::types::Shape;

    #[test]
    fn test_registry_creation() {
        let registry = ConversionRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.lookup(Representation::HostArray, Representation::ImageStack),
            Err(DispatchError::NoConverterFound { .. })
        ));
    }

    #[test]
    fn test_register_and_unregister() {
        let mut registry = ConversionRegistry::new();
        assert!(registry.register(StackToHost).is_none());
        assert!(registry.register(StackToHost).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(Representation::ImageStack, Representation::HostArray));

        assert!(registry.unregister(Representation::ImageStack, Representation::HostArray));
        assert!(!registry.unregister(Representation::ImageStack, Representation::HostArray));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_identity_is_not_registered() {
        let ctx = ComputeContext::reference();
        let registry = ConversionRegistry::with_defaults(&ctx);
        let value = ArrayValue::Host(HostArray::from_vec(Shape::new_2d(1, 1), vec![1u8]).unwrap());
        assert!(matches!(
            registry.convert(&value, Representation::HostArray),
            Err(DispatchError::NoConverterFound { .. })
        ));
    }
}
