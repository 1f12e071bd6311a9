//! Tensor Payloads
//!
//! Compile-time constant tensors carried by initializer values and
//! `Constant` nodes. Storage is delegated to `ndarray`.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;

use ndarray::{ArrayD, IxDyn};

use crate::error::{IrError, IrResult};

// =============================================================================
// Element Types
// =============================================================================

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// 32-bit floating point.
    #[default]
    F32,
    /// 64-bit floating point.
    F64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// Boolean.
    Bool,
}

impl DType {
    /// Size in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            Self::F32 | Self::I32 => 4,
            Self::F64 | Self::I64 => 8,
            Self::Bool => 1,
        }
    }

    /// Returns whether this is a floating point type.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Tensor
// =============================================================================

/// A dense constant tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    /// 32-bit float data.
    F32(ArrayD<f32>),
    /// 64-bit float data.
    F64(ArrayD<f64>),
    /// 32-bit integer data.
    I32(ArrayD<i32>),
    /// 64-bit integer data.
    I64(ArrayD<i64>),
    /// Boolean data.
    Bool(ArrayD<bool>),
}

impl Tensor {
    /// Creates an f32 tensor from a flat vector and a shape.
    pub fn from_f32(data: Vec<f32>, shape: &[usize]) -> IrResult<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Self::F32)
            .map_err(|e| IrError::InvalidTensor(e.to_string()))
    }

    /// Creates an f64 tensor from a flat vector and a shape.
    pub fn from_f64(data: Vec<f64>, shape: &[usize]) -> IrResult<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Self::F64)
            .map_err(|e| IrError::InvalidTensor(e.to_string()))
    }

    /// Creates an i64 tensor from a flat vector and a shape.
    pub fn from_i64(data: Vec<i64>, shape: &[usize]) -> IrResult<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Self::I64)
            .map_err(|e| IrError::InvalidTensor(e.to_string()))
    }

    /// Creates a scalar f32 tensor.
    pub fn scalar_f32(value: f32) -> Self {
        Self::F32(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        match self {
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
            Self::I32(_) => DType::I32,
            Self::I64(_) => DType::I64,
            Self::Bool(_) => DType::Bool,
        }
    }

    /// Returns the dimensions.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::F32(a) => a.shape(),
            Self::F64(a) => a.shape(),
            Self::I32(a) => a.shape(),
            Self::I64(a) => a.shape(),
            Self::Bool(a) => a.shape(),
        }
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.shape().iter().product()
    }

    /// Returns the elements in logical order, widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::F32(a) => a.iter().map(|&v| f64::from(v)).collect(),
            Self::F64(a) => a.iter().copied().collect(),
            Self::I32(a) => a.iter().map(|&v| f64::from(v)).collect(),
            Self::I64(a) => a.iter().map(|&v| v as f64).collect(),
            Self::Bool(a) => a.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect(),
        }
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tensor<{}>{:?}", self.dtype(), self.shape())
    }
}
