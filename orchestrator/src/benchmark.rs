use futures::future;
use log::debug;

use crate::{OrchestratorError, Result, handle::WorkerHandle};

/// Benchmarks every worker at once and waits for all of them.
///
/// # Arguments
/// * `handles` - The workers of the session.
/// * `workload` - The size of the benchmark, the same for every worker.
///
/// # Returns
/// The throughput score of each worker, in the order of `handles`, or the first
/// `BenchmarkFailure`. A score that isn't a positive finite number is a failure.
pub async fn benchmark_workers<H: WorkerHandle>(handles: &mut [H], workload: usize) -> Result<Vec<f64>> {
    let futs = handles
        .iter_mut()
        .enumerate()
        .map(|(worker, handle)| async move {
            let score = handle.benchmark(workload).await.map_err(|e| {
                OrchestratorError::BenchmarkFailure {
                    worker,
                    msg: e.to_string(),
                }
            })?;

            if !score.is_finite() || score <= 0.0 {
                return Err(OrchestratorError::BenchmarkFailure {
                    worker,
                    msg: format!("invalid throughput score {score}"),
                });
            }

            debug!(worker = worker, score = score; "worker benchmarked");
            Ok(score)
        });

    future::try_join_all(futs).await
}
