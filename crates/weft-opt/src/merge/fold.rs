//! Compile-time folding of batch-normalization statistics into convolution
//! parameters.
//!
//! Arithmetic runs in the element type of the operands, so an f32 model is
//! folded in f32 and an f64 model in f64.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use ndarray::{ArrayD, Axis, Zip};
use num_traits::Float;
use weft_ir::{DType, Node, Tensor};

use crate::error::{OptError, OptResult};

/// Float element types the fold supports.
trait FoldElement: Float + 'static {
    const DTYPE: DType;

    fn array(tensor: &Tensor) -> Option<&ArrayD<Self>>;

    fn wrap(array: ArrayD<Self>) -> Tensor;

    fn from_epsilon(epsilon: f32) -> Self;
}

impl FoldElement for f32 {
    const DTYPE: DType = DType::F32;

    fn array(tensor: &Tensor) -> Option<&ArrayD<Self>> {
        match tensor {
            Tensor::F32(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(array: ArrayD<Self>) -> Tensor {
        Tensor::F32(array)
    }

    fn from_epsilon(epsilon: f32) -> Self {
        epsilon
    }
}

impl FoldElement for f64 {
    const DTYPE: DType = DType::F64;

    fn array(tensor: &Tensor) -> Option<&ArrayD<Self>> {
        match tensor {
            Tensor::F64(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(array: ArrayD<Self>) -> Tensor {
        Tensor::F64(array)
    }

    fn from_epsilon(epsilon: f32) -> Self {
        f64::from(epsilon)
    }
}

/// Constant operands of a `Conv -> BatchNormalization` pair.
#[derive(Debug, Clone, Copy)]
pub struct ConvBnOperands<'a> {
    /// Convolution weight, output channels first.
    pub weight: &'a Tensor,
    /// Convolution bias; zeros when absent.
    pub bias: Option<&'a Tensor>,
    /// Normalization scale (gamma).
    pub scale: &'a Tensor,
    /// Normalization shift (beta).
    pub shift: &'a Tensor,
    /// Running mean.
    pub mean: &'a Tensor,
    /// Running variance.
    pub var: &'a Tensor,
    /// Variance epsilon.
    pub epsilon: f32,
}

impl ConvBnOperands<'_> {
    /// Computes the folded `(weight, bias)`.
    ///
    /// With `s = scale / sqrt(var + eps)`, each output channel `i` of the
    /// weight is multiplied by `s[i]`, and the bias becomes
    /// `(bias - mean) * s + shift`. `site` is the node blamed for mismatches.
    pub fn fold(&self, site: &Node) -> OptResult<(Tensor, Tensor)> {
        match self.weight.dtype() {
            DType::F32 => self.fold_as::<f32>(site),
            DType::F64 => self.fold_as::<f64>(site),
            actual => Err(OptError::DTypeMismatch {
                node: site.name().to_string(),
                op: site.op_type(),
                expected: DType::F32,
                actual,
            }),
        }
    }

    fn fold_as<T: FoldElement>(&self, site: &Node) -> OptResult<(Tensor, Tensor)> {
        let weight = typed::<T>(site, self.weight)?;
        let Some(&channels) = weight.shape().first() else {
            return Err(shape_error(site, "convolution weight is a scalar".to_string()));
        };

        let scale = per_channel::<T>(site, "scale", self.scale, channels)?;
        let shift = per_channel::<T>(site, "bias", self.shift, channels)?;
        let mean = per_channel::<T>(site, "mean", self.mean, channels)?;
        let var = per_channel::<T>(site, "var", self.var, channels)?;
        let bias = match self.bias {
            Some(tensor) => per_channel::<T>(site, "conv bias", tensor, channels)?.clone(),
            None => ArrayD::zeros(scale.raw_dim()),
        };

        let eps = T::from_epsilon(self.epsilon);
        let s = Zip::from(scale)
            .and(var)
            .map_collect(|&g, &v| g / (v + eps).sqrt());

        let mut new_weight = weight.clone();
        for (mut filter, &factor) in new_weight.axis_iter_mut(Axis(0)).zip(s.iter()) {
            filter.mapv_inplace(|x| x * factor);
        }
        let new_bias = Zip::from(&bias)
            .and(mean)
            .and(&s)
            .and(shift)
            .map_collect(|&b, &m, &f, &beta| (b - m) * f + beta);

        Ok((T::wrap(new_weight), T::wrap(new_bias)))
    }
}

fn typed<'t, T: FoldElement>(site: &Node, tensor: &'t Tensor) -> OptResult<&'t ArrayD<T>> {
    T::array(tensor).ok_or_else(|| OptError::DTypeMismatch {
        node: site.name().to_string(),
        op: site.op_type(),
        expected: T::DTYPE,
        actual: tensor.dtype(),
    })
}

fn per_channel<'t, T: FoldElement>(
    site: &Node,
    name: &str,
    tensor: &'t Tensor,
    channels: usize,
) -> OptResult<&'t ArrayD<T>> {
    let array = typed::<T>(site, tensor)?;
    if array.shape() != [channels] {
        return Err(shape_error(
            site,
            format!("{name} has shape {:?}, expected [{channels}]", array.shape()),
        ));
    }
    Ok(array)
}

fn shape_error(site: &Node, message: String) -> OptError {
    OptError::ShapeMismatch {
        node: site.name().to_string(),
        op: site.op_type(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Attributes, DType, Graph, OpType, ValueType};

    fn site() -> (Graph, weft_ir::NodeId) {
        let mut graph = Graph::new("site");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[2]));
        let y = graph.add_value("y", ValueType::new(DType::F32, &[2]));
        let id = graph
            .add_node(OpType::BatchNormalization, &[x], &[y], Attributes::new())
            .unwrap();
        (graph, id)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_fold_values() {
        let (graph, id) = site();
        let weight = Tensor::from_f32(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let bias = Tensor::from_f32(vec![0.5, -0.5], &[2]).unwrap();
        let scale = Tensor::from_f32(vec![2.0, 1.0], &[2]).unwrap();
        let shift = Tensor::from_f32(vec![0.1, 0.2], &[2]).unwrap();
        let mean = Tensor::from_f32(vec![1.0, 0.0], &[2]).unwrap();
        let var = Tensor::from_f32(vec![3.0, 0.0], &[2]).unwrap();
        let ops = ConvBnOperands {
            weight: &weight,
            bias: Some(&bias),
            scale: &scale,
            shift: &shift,
            mean: &mean,
            var: &var,
            epsilon: 1.0,
        };

        let (w, b) = ops.fold(graph.node(id)).unwrap();

        // s = [2 / sqrt(4), 1 / sqrt(1)] = [1, 1]
        assert_eq!(w.dtype(), DType::F32);
        assert_eq!(w.shape(), &[2, 2]);
        let w = w.to_f64_vec();
        for (got, want) in w.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert!(close(*got, want));
        }
        let b = b.to_f64_vec();
        assert!(close(b[0], -0.5 + 0.1));
        assert!(close(b[1], -0.5 + 0.2));
    }

    #[test]
    fn test_fold_without_bias_in_f64() {
        let (graph, id) = site();
        let weight = Tensor::from_f64(vec![1.0, 1.0], &[2, 1]).unwrap();
        let scale = Tensor::from_f64(vec![3.0, 4.0], &[2]).unwrap();
        let shift = Tensor::from_f64(vec![0.0, 0.0], &[2]).unwrap();
        let mean = Tensor::from_f64(vec![2.0, 0.0], &[2]).unwrap();
        let var = Tensor::from_f64(vec![1.0, 1.0], &[2]).unwrap();
        let ops = ConvBnOperands {
            weight: &weight,
            bias: None,
            scale: &scale,
            shift: &shift,
            mean: &mean,
            var: &var,
            epsilon: 0.0,
        };

        let (w, b) = ops.fold(graph.node(id)).unwrap();
        assert_eq!(w.dtype(), DType::F64);
        assert_eq!(w.to_f64_vec(), vec![3.0, 4.0]);
        assert_eq!(b.to_f64_vec(), vec![-6.0, 0.0]);
    }

    #[test]
    fn test_fold_rejects_mismatches() {
        let (graph, id) = site();
        let weight = Tensor::from_f32(vec![1.0; 6], &[3, 2]).unwrap();
        let two = Tensor::from_f32(vec![1.0, 1.0], &[2]).unwrap();
        let ops = ConvBnOperands {
            weight: &weight,
            bias: None,
            scale: &two,
            shift: &two,
            mean: &two,
            var: &two,
            epsilon: 1e-5,
        };
        let err = ops.fold(graph.node(id)).unwrap_err();
        assert!(matches!(err, OptError::ShapeMismatch { ref node, .. } if node == "BatchNormalization_0"));

        let wide = Tensor::from_f64(vec![1.0; 3], &[3]).unwrap();
        let ops = ConvBnOperands {
            scale: &wide,
            ..ops
        };
        let err = ops.fold(graph.node(id)).unwrap_err();
        assert!(matches!(
            err,
            OptError::DTypeMismatch { expected: DType::F32, actual: DType::F64, .. }
        ));

        let ints = Tensor::from_i64(vec![1; 3], &[3]).unwrap();
        let ops = ConvBnOperands {
            weight: &ints,
            ..ops
        };
        assert!(matches!(
            ops.fold(graph.node(id)).unwrap_err(),
            OptError::DTypeMismatch { actual: DType::I64, .. }
        ));
    }
}
