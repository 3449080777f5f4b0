use serde::{Deserialize, Serialize};

use super::machine_learning::{LocalTrainingSpec, ModelSpec};

/// Wire-level bootstrap specification for a worker instance.
///
/// Sent once by the orchestrator right after connecting, it fixes the architecture the
/// worker trains and how it trains it for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub worker_id: usize,
    pub model: ModelSpec,
    pub training: LocalTrainingSpec,
}
