//! Splitting the training data between the workers proportionally to their throughput.

use futures::future;
use log::debug;
use machine_learning::dataset::Dataset;
use rand::{Rng, seq::index};

use crate::{OrchestratorError, Result, handle::WorkerHandle};

/// The amount of batches assigned to each worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    batches: Vec<usize>,
}

impl Allocation {
    /// Distributes `total_batches` proportionally to `scores`.
    ///
    /// Each share is rounded half to even. Roundings that overshoot `total_batches` are taken
    /// back one batch at a time from the workers that gained the most by rounding, the highest
    /// index first on ties, so the allocation never exceeds `total_batches`. Falling short is
    /// accepted.
    ///
    /// # Arguments
    /// * `scores` - The throughput score of each worker.
    /// * `total_batches` - The amount of batches available.
    ///
    /// # Returns
    /// The allocation or `EmptyAllocation` if no worker got a single batch.
    pub fn from_scores(scores: &[f64], total_batches: usize) -> Result<Self> {
        let sum: f64 = scores.iter().sum();
        if scores.is_empty() || sum <= 0.0 {
            return Err(OrchestratorError::EmptyAllocation);
        }

        let factor = total_batches as f64 / sum;
        let exact: Vec<f64> = scores.iter().map(|s| factor * s).collect();
        let mut batches: Vec<usize> = exact.iter().map(|e| e.round_ties_even() as usize).collect();

        let gain = |batches: &[usize], i: usize| batches[i] as f64 - exact[i];
        let mut excess = batches.iter().sum::<usize>().saturating_sub(total_batches);

        while excess > 0 {
            let Some(i) = (0..batches.len())
                .filter(|&i| batches[i] > 0)
                .max_by(|&a, &b| gain(&batches, a).total_cmp(&gain(&batches, b)))
            else {
                break;
            };

            batches[i] -= 1;
            excess -= 1;
        }

        let allocation = Self { batches };
        if allocation.total() == 0 {
            return Err(OrchestratorError::EmptyAllocation);
        }

        Ok(allocation)
    }

    /// Returns the amount of batches of each worker.
    pub fn batches(&self) -> &[usize] {
        &self.batches
    }

    /// Returns the amount of batches assigned overall.
    pub fn total(&self) -> usize {
        self.batches.iter().sum()
    }

    /// Returns the share of the assigned data each worker holds, these always add up to one.
    pub fn weights(&self) -> Vec<f64> {
        let total = self.total() as f64;
        self.batches.iter().map(|&a| a as f64 / total).collect()
    }
}

/// Samples the training shard of each worker.
///
/// Every shard is drawn uniformly without replacement from the whole training set, independently
/// of the others, so shards of different workers may overlap.
///
/// # Arguments
/// * `train` - The training set.
/// * `allocation` - The amount of batches of each worker.
/// * `batch_size` - The amount of samples per batch.
/// * `rng` - The source of randomness.
pub fn sample_shards<R: Rng>(
    train: &Dataset,
    allocation: &Allocation,
    batch_size: usize,
    rng: &mut R,
) -> Result<Vec<Dataset>> {
    allocation
        .batches()
        .iter()
        .map(|&batches| {
            let amount = (batches * batch_size).min(train.len());
            let indices = index::sample(&mut *rng, train.len(), amount).into_vec();
            Ok(train.select(&indices)?)
        })
        .collect()
}

/// Sends every worker it's shard at once and waits for all of them.
///
/// # Returns
/// The first `DataTransmissionFailure`, if any.
pub async fn assign_shards<H: WorkerHandle>(handles: &mut [H], shards: Vec<Dataset>) -> Result<()> {
    let futs = handles
        .iter_mut()
        .zip(shards)
        .enumerate()
        .map(|(worker, (handle, shard))| async move {
            let samples = shard.len();
            handle.assign_training_data(shard).await.map_err(|e| {
                OrchestratorError::DataTransmissionFailure {
                    worker,
                    msg: e.to_string(),
                }
            })?;

            debug!(worker = worker, samples = samples; "shard assigned");
            Ok::<_, OrchestratorError>(())
        });

    future::try_join_all(futs).await?;
    Ok(())
}
