//! Kernel invocation arguments.
//!
//! A kernel is invoked with an ordered map from parameter name to a tagged
//! value. The backend binds parameters by name, and the type unifier decides
//! which arrays are inputs and which are outputs from the name alone.

use crate::core::types::DeviceArray;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value bound to one kernel parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ArgValue {
    /// Integer scalar
    Int(i64),
    /// Float scalar
    Float(f32),
    /// Boolean scalar
    Bool(bool),
    /// Device array handle
    Array(DeviceArray),
}

impl ArgValue {
    /// Try to get this value as an array handle.
    pub fn as_array(&self) -> Option<&DeviceArray> {
        if let ArgValue::Array(array) = self {
            Some(array)
        } else {
            None
        }
    }

    /// Try to get this value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            ArgValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Try to get this value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            ArgValue::Float(f) => Some(*f),
            ArgValue::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        if let ArgValue::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Array(array) => write!(f, "{}", array),
        }
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(value as i64)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<usize> for ArgValue {
    fn from(value: usize) -> Self {
        ArgValue::Int(value as i64)
    }
}

impl From<f32> for ArgValue {
    fn from(value: f32) -> Self {
        ArgValue::Float(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<DeviceArray> for ArgValue {
    fn from(array: DeviceArray) -> Self {
        ArgValue::Array(array)
    }
}

impl From<&DeviceArray> for ArgValue {
    fn from(array: &DeviceArray) -> Self {
        ArgValue::Array(array.clone())
    }
}

/// Role of an array argument within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentRole {
    /// Read by the kernel
    Input,
    /// Written by the kernel
    Output,
}

impl ArgumentRole {
    /// Classify a parameter by name.
    ///
    /// This is a public contract: names containing `"src"` or `"input"` are
    /// inputs, every other array-valued parameter is an output. A caller
    /// naming an output `"source_mask"` still gets an output, while one
    /// naming it `"src_out"` gets an input.
    pub fn of(name: &str) -> Self {
        if name.contains("src") || name.contains("input") {
            ArgumentRole::Input
        } else {
            ArgumentRole::Output
        }
    }
}

impl fmt::Display for ArgumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentRole::Input => f.write_str("input"),
            ArgumentRole::Output => f.write_str("output"),
        }
    }
}

/// Named arguments of one kernel invocation, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelArgs {
    entries: IndexMap<String, ArgValue>,
}

impl KernelArgs {
    /// Create an empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or overwrite an argument, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Option<ArgValue> {
        self.entries.insert(name.into(), value.into())
    }

    /// Get an argument by name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.entries.get(name)
    }

    /// Get an array argument by name.
    pub fn get_array(&self, name: &str) -> Option<&DeviceArray> {
        self.entries.get(name).and_then(ArgValue::as_array)
    }

    /// Check if an argument exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Swap the array bound to `name`, keeping its position.
    ///
    /// Returns the previous array, or `None` (leaving the map unchanged) if
    /// `name` is not bound to an array.
    pub fn replace_array(&mut self, name: &str, array: DeviceArray) -> Option<DeviceArray> {
        match self.entries.get_mut(name) {
            Some(ArgValue::Array(slot)) => Some(std::mem::replace(slot, array)),
            _ => None,
        }
    }

    /// Iterate over all arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over array-valued arguments only.
    pub fn arrays(&self) -> impl Iterator<Item = (&str, &DeviceArray)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_array().map(|array| (k.as_str(), array)))
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ArrayId, ElementType, RepresentationKind, Shape};
    use proptest::prelude::*;

    fn array(element_type: ElementType) -> DeviceArray {
        DeviceArray::new(
            ArrayId::new(),
            Shape::new_2d(2, 2),
            element_type,
            RepresentationKind::LinearBuffer,
        )
    }

    #[test]
    fn test_role_classification() {
        assert_eq!(ArgumentRole::of("src"), ArgumentRole::Input);
        assert_eq!(ArgumentRole::of("src1"), ArgumentRole::Input);
        assert_eq!(ArgumentRole::of("input_mask"), ArgumentRole::Input);
        assert_eq!(ArgumentRole::of("dst"), ArgumentRole::Output);
        assert_eq!(ArgumentRole::of("dst_max"), ArgumentRole::Output);
        // Not a substring match on "source"
        assert_eq!(ArgumentRole::of("source_mask"), ArgumentRole::Output);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let args = KernelArgs::new()
            .with("src", array(ElementType::U8))
            .with("scalar", 1.0f32)
            .with("dst", array(ElementType::F32));

        let names: Vec<_> = args.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["src", "scalar", "dst"]);
        assert_eq!(args.arrays().count(), 2);
    }

    #[test]
    fn test_replace_array() {
        let original = array(ElementType::U8);
        let replacement = array(ElementType::F32);
        let mut args = KernelArgs::new()
            .with("src", &original)
            .with("value", 3);

        let previous = args.replace_array("src", replacement.clone()).unwrap();
        assert!(previous.is_same(&original));
        assert!(args.get_array("src").unwrap().is_same(&replacement));

        // Scalars are never replaced
        assert!(args.replace_array("value", original).is_none());
        assert_eq!(args.get("value").and_then(ArgValue::as_int), Some(3));
    }

    #[test]
    fn test_scalar_accessors() {
        assert_eq!(ArgValue::from(3).as_float(), Some(3.0));
        assert_eq!(ArgValue::from(2.5f32).as_int(), None);
        assert_eq!(ArgValue::from(true).as_bool(), Some(true));
        assert!(ArgValue::from(1.0f32).as_array().is_none());
    }

    proptest! {
        #[test]
        fn prop_names_with_src_are_inputs(prefix in "[a-z_]{0,6}", suffix in "[a-z0-9_]{0,6}") {
            let name = format!("{}src{}", prefix, suffix);
            prop_assert_eq!(ArgumentRole::of(&name), ArgumentRole::Input);
        }

        #[test]
        fn prop_names_without_markers_are_outputs(name in "[a-hj-rt-z0-9_]{1,12}") {
            // Alphabet excludes 'i' and 's', so neither marker can appear
            prop_assert_eq!(ArgumentRole::of(&name), ArgumentRole::Output);
        }
    }
}
