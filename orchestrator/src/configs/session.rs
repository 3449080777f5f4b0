use std::{fs, num::NonZeroUsize, path::Path, path::PathBuf};

use comms::specs::machine_learning::{InitSpec, ModelSpec};
use serde::{Deserialize, Serialize};

use crate::{OrchestratorError, Result};

/// How the workers of a session are found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryConfig {
    /// Ask a notice board for every worker registered on it.
    NoticeBoard { seed: String },
    /// A fixed list of `host:port` addresses.
    Static { workers: Vec<String> },
}

/// Where the training and held out samples are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetConfig {
    Idx {
        train_images: PathBuf,
        train_labels: PathBuf,
        test_images: PathBuf,
        test_labels: PathBuf,
        #[serde(default = "default_normalize")]
        normalize: bool,
    },
}

/// The hyper-parameters every worker uses for it's local updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_epochs")]
    pub epochs: NonZeroUsize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
        }
    }
}

/// The whole configuration of a training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub discovery: DiscoveryConfig,
    pub dataset: DatasetConfig,
    pub model: ModelSpec,
    #[serde(default)]
    pub init: InitSpec,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default = "default_num_global_cycles")]
    pub num_global_cycles: NonZeroUsize,
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    #[serde(default = "default_benchmark_workload")]
    pub benchmark_workload: usize,
    /// The amount of training samples to distribute, the whole training set if missing.
    #[serde(default)]
    pub train_samples: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SessionConfig {
    /// Reads a JSON session configuration.
    ///
    /// # Arguments
    /// * `path` - The path to the configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| OrchestratorError::InvalidConfig(e.to_string()))
    }
}

fn default_normalize() -> bool {
    true
}

fn default_epochs() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn default_learning_rate() -> f32 {
    0.01
}

fn default_num_global_cycles() -> NonZeroUsize {
    NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN)
}

fn default_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(32).unwrap_or(NonZeroUsize::MIN)
}

fn default_benchmark_workload() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "discovery": { "notice_board": { "seed": "board:5000" } },
        "dataset": {
            "idx": {
                "train_images": "data/train-images-idx3-ubyte",
                "train_labels": "data/train-labels-idx1-ubyte",
                "test_images": "data/t10k-images-idx3-ubyte",
                "test_labels": "data/t10k-labels-idx1-ubyte"
            }
        },
        "model": {
            "sequential": {
                "layers": [{ "dense": { "dim": [784, 200] } }, "relu", { "dense": { "dim": [200, 10] } }]
            }
        }
    }"#;

    #[test]
    fn defaults_fill_the_gaps() {
        let config = SessionConfig::from_json(MINIMAL).unwrap();

        assert_eq!(config.num_global_cycles.get(), 10);
        assert_eq!(config.batch_size.get(), 32);
        assert_eq!(config.benchmark_workload, 1000);
        assert_eq!(config.train_samples, None);
        assert_eq!(config.init, InitSpec::LecunUniform);
        assert_eq!(config.local, LocalConfig::default());

        let DatasetConfig::Idx { normalize, .. } = config.dataset;
        assert!(normalize);
    }

    #[test]
    fn zero_cycles_is_rejected() {
        let raw = MINIMAL.replacen('{', r#"{ "num_global_cycles": 0,"#, 1);
        assert!(matches!(
            SessionConfig::from_json(&raw),
            Err(OrchestratorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn static_discovery() {
        let raw = MINIMAL.replace(
            r#"{ "notice_board": { "seed": "board:5000" } }"#,
            r#"{ "static": { "workers": ["worker-0:4000", "worker-1:4000"] } }"#,
        );

        let config = SessionConfig::from_json(&raw).unwrap();
        assert_eq!(
            config.discovery,
            DiscoveryConfig::Static {
                workers: vec!["worker-0:4000".into(), "worker-1:4000".into()]
            }
        );
    }
}
