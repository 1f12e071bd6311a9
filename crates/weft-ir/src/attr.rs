//! Operator Attributes
//!
//! Typed, ordered attribute storage for nodes.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::collections::BTreeMap;
use std::fmt;

use crate::tensor::Tensor;

// =============================================================================
// Attribute Values
// =============================================================================

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Integer scalar.
    Int(i64),
    /// Float scalar.
    Float(f32),
    /// String.
    String(String),
    /// Integer list.
    Ints(Vec<i64>),
    /// Float list.
    Floats(Vec<f32>),
    /// Constant tensor.
    Tensor(Tensor),
}

impl Attribute {
    /// Name of the attribute kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Ints(_) => "ints",
            Self::Floats(_) => "floats",
            Self::Tensor(_) => "tensor",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Ints(v) => write!(f, "{v:?}"),
            Self::Floats(v) => write!(f, "{v:?}"),
            Self::Tensor(t) => write!(f, "{t}"),
        }
    }
}

impl From<i64> for Attribute {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Attribute {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Attribute {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Attribute {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<i64>> for Attribute {
    fn from(v: Vec<i64>) -> Self {
        Self::Ints(v)
    }
}

impl From<Vec<f32>> for Attribute {
    fn from(v: Vec<f32>) -> Self {
        Self::Floats(v)
    }
}

impl From<Tensor> for Attribute {
    fn from(v: Tensor) -> Self {
        Self::Tensor(v)
    }
}

// =============================================================================
// Attribute Map
// =============================================================================

/// Attributes of a node, keyed by name in sorted order.
///
/// Typed getters return `None` both for a missing attribute and for one of a
/// different kind; callers decide on the default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(BTreeMap<String, Attribute>);

impl Attributes {
    /// Creates an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: &str, value: impl Into<Attribute>) -> Self {
        self.set(name, value);
        self
    }

    /// Inserts or replaces an attribute.
    pub fn set(&mut self, name: &str, value: impl Into<Attribute>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Removes an attribute.
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        self.0.remove(name)
    }

    /// Returns the raw attribute.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.0.get(name)
    }

    /// Returns whether the attribute is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Integer attribute.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            Attribute::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float attribute.
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.0.get(name)? {
            Attribute::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String attribute.
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.0.get(name)? {
            Attribute::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Integer list attribute.
    pub fn ints(&self, name: &str) -> Option<&[i64]> {
        match self.0.get(name)? {
            Attribute::Ints(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Float list attribute.
    pub fn floats(&self, name: &str) -> Option<&[f32]> {
        match self.0.get(name)? {
            Attribute::Floats(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Tensor attribute.
    pub fn tensor(&self, name: &str) -> Option<&Tensor> {
        match self.0.get(name)? {
            Attribute::Tensor(v) => Some(v),
            _ => None,
        }
    }

    /// Reads an attribute that has a default.
    ///
    /// A missing attribute yields `Some(default)`. An attribute stored with a
    /// different kind yields `None`, so callers can tell it apart from absence.
    pub fn read_or<'a, T>(
        &'a self,
        name: &str,
        read: impl FnOnce(&'a Self, &str) -> Option<T>,
        default: T,
    ) -> Option<T> {
        if self.contains(name) {
            read(self, name)
        } else {
            Some(default)
        }
    }

    /// Iterates attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let attrs = Attributes::new()
            .with("axis", 1i64)
            .with("mode", "constant")
            .with("pads", vec![0i64, 0, 1, 1])
            .with("value", 0.0f32);

        assert_eq!(attrs.int("axis"), Some(1));
        assert_eq!(attrs.string("mode"), Some("constant"));
        assert_eq!(attrs.ints("pads"), Some(&[0, 0, 1, 1][..]));
        assert_eq!(attrs.float("value"), Some(0.0));
        assert_eq!(attrs.len(), 4);
    }

    #[test]
    fn test_kind_mismatch_is_none() {
        let attrs = Attributes::new().with("axis", "one");
        assert_eq!(attrs.int("axis"), None);
        assert_eq!(attrs.get("axis").map(Attribute::kind), Some("string"));
    }

    #[test]
    fn test_read_or_distinguishes_missing_from_mismatched() {
        let attrs = Attributes::new().with("value", 5i64).with("mode", "edge");
        assert_eq!(attrs.read_or("value", Attributes::float, 0.0), None);
        assert_eq!(attrs.read_or("mode", Attributes::string, "constant"), Some("edge"));
        assert_eq!(attrs.read_or("perm", Attributes::ints, &[1i64, 0][..]), Some(&[1i64, 0][..]));
    }

    #[test]
    fn test_sorted_iteration() {
        let attrs = Attributes::new().with("b", 1i64).with("a", 2i64);
        let names: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
