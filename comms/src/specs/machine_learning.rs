use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// The specification for the `Layer` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense { dim: (usize, usize) },
    Relu,
    Sigmoid { amp: f32 },
}

/// The specification for the `Sequential` model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential { layers: Vec<LayerSpec> },
}

/// The specification for the initial values of a model's parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    #[default]
    LecunUniform,
    Const {
        value: f32,
    },
    Normal {
        mean: f32,
        std_dev: f32,
    },
}

/// The layout of a parameter set, that is, the shape of each of it's tensors in order.
///
/// Travels right before the flat `Payload::Params` it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsSpec {
    pub shapes: Vec<Vec<usize>>,
}

/// The header of a training shard, followed by its features and labels payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSpec {
    pub samples: usize,
    pub x_size: usize,
}

/// The hyper-parameters a worker uses for each of it's local updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalTrainingSpec {
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    pub learning_rate: f32,
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_spec_json_shape() {
        let spec = ParamsSpec {
            shapes: vec![vec![784, 200], vec![200]],
        };

        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"shapes":[[784,200],[200]]}"#);
    }

    #[test]
    fn model_spec_json_shape() {
        let json = r#"{"sequential":{"layers":[{"dense":{"dim":[2,3]}},"relu",{"dense":{"dim":[3,1]}}]}}"#;
        let spec: ModelSpec = serde_json::from_str(json).unwrap();

        let ModelSpec::Sequential { layers } = spec;
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[1], LayerSpec::Relu);
    }
}
