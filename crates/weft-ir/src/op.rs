//! Operator Vocabulary
//!
//! The closed set of operator types a node may carry.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;
use std::str::FromStr;

macro_rules! op_types {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)*) => {
        /// Operator type of a node.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum OpType {
            $($(#[$doc])* $variant,)*
        }

        impl OpType {
            /// Every operator type, in declaration order.
            pub const ALL: &'static [OpType] = &[$(OpType::$variant,)*];

            /// Canonical operator name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(OpType::$variant => $name,)*
                }
            }
        }

        impl FromStr for OpType {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(OpType::$variant),)*
                    other => Err(format!("unknown operator type: {other}")),
                }
            }
        }
    };
}

op_types! {
    /// Element-wise addition.
    Add => "Add",
    /// Index of the maximum along an axis.
    ArgMax => "ArgMax",
    /// Average pooling.
    AveragePool => "AveragePool",
    /// Batch normalization.
    BatchNormalization => "BatchNormalization",
    /// Batch normalization followed by an embedded activation.
    BatchNormalizationActivation => "BatchNormalizationActivation",
    /// Element type conversion.
    Cast => "Cast",
    /// Clamp to a range.
    Clip => "Clip",
    /// Concatenation along an axis.
    Concat => "Concat",
    /// Materializes the tensor stored in its `value` attribute.
    Constant => "Constant",
    /// Fills a tensor with a constant.
    ConstantFill => "ConstantFill",
    /// Convolution.
    Conv => "Conv",
    /// Transposed convolution.
    ConvTranspose => "ConvTranspose",
    /// Region crop.
    Crop => "Crop",
    /// Element-wise division.
    Div => "Div",
    /// Dropout.
    Dropout => "Dropout",
    /// ELU activation.
    Elu => "Elu",
    /// Exponential.
    Exp => "Exp",
    /// Flatten to 2-D.
    Flatten => "Flatten",
    /// Opaque group of nodes offloaded to a backend.
    Fused => "Fused",
    /// GRU recurrence.
    Gru => "GRU",
    /// Gather along an axis.
    Gather => "Gather",
    /// Matrix multiply with bias: `alpha * A' * B' + beta * C`.
    Gemm => "Gemm",
    /// Global average pooling.
    GlobalAveragePool => "GlobalAveragePool",
    /// Global max pooling.
    GlobalMaxPool => "GlobalMaxPool",
    /// Identity.
    Identity => "Identity",
    /// Per-channel scale and bias.
    ImageScaler => "ImageScaler",
    /// Instance normalization.
    InstanceNormalization => "InstanceNormalization",
    /// Local response normalization.
    Lrn => "LRN",
    /// LSTM recurrence.
    Lstm => "LSTM",
    /// Leaky ReLU activation.
    LeakyRelu => "LeakyRelu",
    /// Natural logarithm.
    Log => "Log",
    /// Matrix multiplication.
    MatMul => "MatMul",
    /// Max pooling.
    MaxPool => "MaxPool",
    /// Element-wise multiplication.
    Mul => "Mul",
    /// Negation.
    Neg => "Neg",
    /// Padding.
    Pad => "Pad",
    /// Element-wise power.
    Pow => "Pow",
    /// Quantization.
    Quantize => "Quantize",
    /// Mean reduction.
    ReduceMean => "ReduceMean",
    /// Sum reduction.
    ReduceSum => "ReduceSum",
    /// ReLU activation.
    Relu => "Relu",
    /// Reshape.
    Reshape => "Reshape",
    /// Resize by scale factors.
    Resize => "Resize",
    /// Vanilla RNN recurrence.
    Rnn => "RNN",
    /// Sigmoid activation.
    Sigmoid => "Sigmoid",
    /// Slice.
    Slice => "Slice",
    /// Softmax.
    Softmax => "Softmax",
    /// Split along an axis.
    Split => "Split",
    /// Square root.
    Sqrt => "Sqrt",
    /// Remove unit dimensions.
    Squeeze => "Squeeze",
    /// Element-wise subtraction.
    Sub => "Sub",
    /// Variadic element-wise sum.
    Sum => "Sum",
    /// Hyperbolic tangent.
    Tanh => "Tanh",
    /// Axis permutation.
    Transpose => "Transpose",
    /// Insert unit dimensions.
    Unsqueeze => "Unsqueeze",
    /// Upsample by scale factors.
    Upsample => "Upsample",
}

impl OpType {
    /// Returns whether this operator is a pointwise computation.
    pub fn is_elementwise(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Sub
                | Self::Mul
                | Self::Div
                | Self::Pow
                | Self::Neg
                | Self::Exp
                | Self::Log
                | Self::Sqrt
                | Self::Relu
                | Self::LeakyRelu
                | Self::Elu
                | Self::Sigmoid
                | Self::Tanh
                | Self::Clip
                | Self::Identity
        )
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activation embedded in a fused normalization node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationKind {
    /// Rectified linear unit.
    Relu,
}

impl ActivationKind {
    /// Selector code understood by the runtime kernels.
    pub fn code(self) -> i64 {
        match self {
            Self::Relu => 4,
        }
    }

    /// Decodes a selector code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            4 => Some(Self::Relu),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for &op in OpType::ALL {
            assert_eq!(op.as_str().parse::<OpType>(), Ok(op));
        }
    }

    #[test]
    fn test_onnx_spelling() {
        assert_eq!(OpType::Lstm.to_string(), "LSTM");
        assert_eq!("GRU".parse::<OpType>(), Ok(OpType::Gru));
        assert!("Frobnicate".parse::<OpType>().is_err());
    }

    #[test]
    fn test_elementwise() {
        assert!(OpType::Relu.is_elementwise());
        assert!(!OpType::Conv.is_elementwise());
    }

    #[test]
    fn test_activation_code() {
        assert_eq!(ActivationKind::from_code(ActivationKind::Relu.code()), Some(ActivationKind::Relu));
        assert_eq!(ActivationKind::from_code(0), None);
    }
}
