//! Value Types
//!
//! Static type descriptors attached to every value edge.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;

use crate::tensor::DType;

/// A single dimension of a value's shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Statically known extent.
    Fixed(usize),
    /// Extent known only at run time (e.g. a batch dimension).
    Symbolic(String),
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Symbolic(s) => f.write_str(s),
        }
    }
}

/// Type descriptor of a value: element type plus an optional shape.
///
/// `dims == None` means even the rank is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ValueType {
    /// Element type.
    pub dtype: DType,
    /// Shape, if the rank is known.
    pub dims: Option<Vec<Dim>>,
}

impl ValueType {
    /// A type with a fully static shape.
    pub fn new(dtype: DType, dims: &[usize]) -> Self {
        Self {
            dtype,
            dims: Some(dims.iter().map(|&d| Dim::Fixed(d)).collect()),
        }
    }

    /// A type whose shape is entirely unknown.
    pub fn unknown(dtype: DType) -> Self {
        Self { dtype, dims: None }
    }

    /// A type with the given per-axis dimensions.
    pub fn with_dims(dtype: DType, dims: Vec<Dim>) -> Self {
        Self {
            dtype,
            dims: Some(dims),
        }
    }

    /// Returns the rank, if known.
    pub fn ndim(&self) -> Option<usize> {
        self.dims.as_ref().map(Vec::len)
    }

    /// Returns true when every dimension is statically known.
    pub fn has_known_shape(&self) -> bool {
        self.dims
            .as_ref()
            .is_some_and(|dims| dims.iter().all(|d| matches!(d, Dim::Fixed(_))))
    }

    /// Returns the static shape, if fully known.
    pub fn static_shape(&self) -> Option<Vec<usize>> {
        self.dims
            .as_ref()?
            .iter()
            .map(|d| match d {
                Dim::Fixed(n) => Some(*n),
                Dim::Symbolic(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dims {
            None => write!(f, "{}[?]", self.dtype),
            Some(dims) => {
                let dims: Vec<String> = dims.iter().map(ToString::to_string).collect();
                write!(f, "{}[{}]", self.dtype, dims.join(","))
            }
        }
    }
}
