use comms::specs::machine_learning::LayerSpec;
use ndarray::{Array2, ArrayD, ArrayView2};

use super::{Dense, Relu, Sigmoid};
use crate::Result;

/// A single stage of a sequential model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layer {
    Dense(Dense),
    Relu(Relu),
    Sigmoid(Sigmoid),
}

impl Layer {
    pub fn dense(dim: (usize, usize)) -> Self {
        Self::Dense(Dense::new(dim))
    }

    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn sigmoid(amp: f32) -> Self {
        Self::Sigmoid(Sigmoid::new(amp))
    }

    /// Returns the shapes of the parameter tensors this layer consumes.
    pub fn param_shapes(&self) -> Vec<Vec<usize>> {
        match self {
            Self::Dense(l) => l.param_shapes(),
            Self::Relu(_) | Self::Sigmoid(_) => Vec::new(),
        }
    }

    pub fn forward(&self, params: &[ArrayD<f32>], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
            Self::Relu(l) => Ok(l.forward(x)),
            Self::Sigmoid(l) => Ok(l.forward(x)),
        }
    }

    pub fn backward(
        &self,
        params: &[ArrayD<f32>],
        grads: &mut [ArrayD<f32>],
        x: ArrayView2<f32>,
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grads, x, d),
            Self::Relu(l) => Ok(l.backward(x, d)),
            Self::Sigmoid(l) => Ok(l.backward(x, d)),
        }
    }
}

impl From<LayerSpec> for Layer {
    fn from(spec: LayerSpec) -> Self {
        match spec {
            LayerSpec::Dense { dim } => Self::dense(dim),
            LayerSpec::Relu => Self::relu(),
            LayerSpec::Sigmoid { amp } => Self::sigmoid(amp),
        }
    }
}
