use std::{error::Error, fmt, io};

use machine_learning::MlErr;

use crate::{aggregation::AggregationErr, evaluation::EvalErr};

/// The orchestrator's result type.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// The step of a global round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStep {
    Dispatch,
    Collect,
    Aggregate,
    Evaluate,
}

/// The phases a training session goes through, used to tell where a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Discovery,
    Connection,
    Benchmark,
    Partition,
    Baseline,
    Round { round: usize, step: RoundStep },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Discovery => write!(f, "discovery"),
            Self::Connection => write!(f, "connection"),
            Self::Benchmark => write!(f, "benchmark"),
            Self::Partition => write!(f, "partition"),
            Self::Baseline => write!(f, "baseline evaluation"),
            Self::Round { round, step } => {
                let step = match step {
                    RoundStep::Dispatch => "dispatch",
                    RoundStep::Collect => "collect",
                    RoundStep::Aggregate => "aggregate",
                    RoundStep::Evaluate => "evaluate",
                };
                write!(f, "round {round} {step}")
            }
        }
    }
}

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before connecting.
    InvalidConfig(String),
    /// No workers could be discovered.
    DiscoveryFailure(String),
    /// Failed to connect to or bootstrap a worker.
    ConnectionFailed { addr: String, source: io::Error },
    /// A worker failed to produce a throughput score.
    BenchmarkFailure { worker: usize, msg: String },
    /// Every worker was allocated zero batches.
    EmptyAllocation,
    /// A worker failed to receive it's training shard.
    DataTransmissionFailure { worker: usize, msg: String },
    /// A worker failed to produce it's local update.
    LocalUpdateFailure {
        round: usize,
        worker: usize,
        msg: String,
    },
    Aggregation {
        round: usize,
        source: AggregationErr,
    },
    /// The global model couldn't be evaluated, round `0` is the evaluation prior to training.
    Evaluation { round: usize, source: EvalErr },
    Dataset(MlErr),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl OrchestratorError {
    /// Returns the phase of the session this error happened in.
    pub fn phase(&self) -> Phase {
        match self {
            Self::InvalidConfig(_) | Self::Dataset(_) | Self::Io(_) => Phase::Setup,
            Self::DiscoveryFailure(_) => Phase::Discovery,
            Self::ConnectionFailed { .. } => Phase::Connection,
            Self::BenchmarkFailure { .. } => Phase::Benchmark,
            Self::EmptyAllocation | Self::DataTransmissionFailure { .. } => Phase::Partition,
            Self::LocalUpdateFailure { round, .. } => Phase::Round {
                round: *round,
                step: RoundStep::Collect,
            },
            Self::Aggregation { round, .. } => Phase::Round {
                round: *round,
                step: RoundStep::Aggregate,
            },
            Self::Evaluation { round: 0, .. } => Phase::Baseline,
            Self::Evaluation { round, .. } => Phase::Round {
                round: *round,
                step: RoundStep::Evaluate,
            },
        }
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::DiscoveryFailure(msg) => write!(f, "discovery failed: {msg}"),
            Self::ConnectionFailed { addr, source } => {
                write!(f, "connection failed to {addr}: {source}")
            }
            Self::BenchmarkFailure { worker, msg } => {
                write!(f, "worker {worker} failed to benchmark: {msg}")
            }
            Self::EmptyAllocation => {
                write!(f, "the allocation assigns no batches to any worker")
            }
            Self::DataTransmissionFailure { worker, msg } => {
                write!(f, "failed to send training data to worker {worker}: {msg}")
            }
            Self::LocalUpdateFailure { round, worker, msg } => {
                write!(f, "worker {worker} failed it's local update on round {round}: {msg}")
            }
            Self::Aggregation { round, source } => {
                write!(f, "aggregation failed on round {round}: {source}")
            }
            Self::Evaluation { round, source } => {
                write!(f, "evaluation failed on round {round}: {source}")
            }
            Self::Dataset(e) => write!(f, "dataset error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::Aggregation { source, .. } => Some(source),
            Self::Evaluation { source, .. } => Some(source),
            Self::Dataset(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OrchestratorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<MlErr> for OrchestratorError {
    fn from(e: MlErr) -> Self {
        Self::Dataset(e)
    }
}
