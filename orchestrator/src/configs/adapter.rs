use comms::specs::{machine_learning::LocalTrainingSpec, worker::WorkerSpec};
use machine_learning::{
    MlErr,
    arch::{Sequential, check_init},
    dataset::Dataset,
};

use super::{DatasetConfig, DiscoveryConfig, SessionConfig};
use crate::{OrchestratorError, Result};

/// Validates a `SessionConfig` and turns it into the pieces each node needs.
pub struct Adapter<'a> {
    config: &'a SessionConfig,
}

impl<'a> Adapter<'a> {
    pub fn new(config: &'a SessionConfig) -> Self {
        Self { config }
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Checks the configuration for mistakes that can be caught before connecting to anyone.
    ///
    /// # Returns
    /// The model described by the configuration or an `InvalidConfig` error.
    pub fn validate(&self) -> Result<Sequential> {
        let config = self.config;

        let model = Sequential::from_spec(&config.model).map_err(|e| match e {
            MlErr::InvalidModel(msg) => OrchestratorError::InvalidConfig(msg),
            other => OrchestratorError::InvalidConfig(other.to_string()),
        })?;

        check_init(config.init).map_err(|e| OrchestratorError::InvalidConfig(e.to_string()))?;

        if config.benchmark_workload == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "benchmark_workload must be greater than 0".into(),
            ));
        }

        let lr = config.local.learning_rate;
        if !lr.is_finite() || lr <= 0.0 {
            return Err(OrchestratorError::InvalidConfig(format!(
                "the learning rate must be a positive number, got {lr}"
            )));
        }

        if let DiscoveryConfig::Static { workers } = &config.discovery
            && workers.is_empty()
        {
            return Err(OrchestratorError::InvalidConfig(
                "at least one worker address is required".into(),
            ));
        }

        Ok(model)
    }

    /// Checks that the loaded samples fit the model.
    pub fn validate_dataset(&self, model: &Sequential, dataset: &Dataset) -> Result<()> {
        if let Some(expected) = model.input_size()
            && dataset.x_size() != expected
        {
            return Err(OrchestratorError::InvalidConfig(format!(
                "the samples have {} features but the model takes {expected}",
                dataset.x_size()
            )));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Adaptation
    // -------------------------------------------------------------------------

    /// Loads the training and held out datasets.
    ///
    /// # Returns
    /// The training set and the held out set.
    pub fn load_datasets(&self) -> Result<(Dataset, Dataset)> {
        let DatasetConfig::Idx {
            train_images,
            train_labels,
            test_images,
            test_labels,
            normalize,
        } = &self.config.dataset;

        let train = Dataset::from_idx(train_images, train_labels, *normalize)?;
        let test = Dataset::from_idx(test_images, test_labels, *normalize)?;
        Ok((train, test))
    }

    /// Builds the bootstrap spec of a worker.
    ///
    /// Each worker trains with it's own seed derived from the session's.
    pub fn worker_spec(&self, worker_id: usize) -> WorkerSpec {
        let config = self.config;

        WorkerSpec {
            worker_id,
            model: config.model.clone(),
            training: LocalTrainingSpec {
                epochs: config.local.epochs,
                batch_size: config.batch_size,
                learning_rate: config.local.learning_rate,
                seed: config.seed.map(|seed| seed.wrapping_add(worker_id as u64 + 1)),
            },
        }
    }
}
