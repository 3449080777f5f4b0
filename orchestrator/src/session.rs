use futures::future;
use log::{debug, error, info, warn};
use machine_learning::{
    ParameterSet,
    arch::{Model, Sequential, loss::CrossEntropy, metric::Accuracy},
    dataset::Dataset,
    placement::{Cpu, HostParams, Placement},
};
use rand::rngs::StdRng;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    OrchestratorError, Result,
    aggregation::aggregate,
    benchmark::benchmark_workers,
    configs::SessionConfig,
    error::{Phase, RoundStep},
    evaluation::{Evaluation, evaluate},
    handle::WorkerHandle,
    partition::{self, Allocation},
};

/// The authoritative model of a session, replaced wholesale after every round.
#[derive(Debug, Clone)]
pub struct GlobalModel<P: Placement = Cpu> {
    model: Sequential,
    params: ParameterSet,
    placement: P,
}

impl<P: Placement> GlobalModel<P> {
    /// Creates a new `GlobalModel`.
    ///
    /// # Arguments
    /// * `model` - The architecture.
    /// * `params` - The initial parameters, already on the model's device.
    /// * `placement` - Where the parameters live.
    ///
    /// # Returns
    /// The model or an `InvalidConfig` error if `params` doesn't fit the architecture.
    pub fn new(model: Sequential, params: ParameterSet, placement: P) -> Result<Self> {
        let expected = model.param_shapes();
        if params.shapes() != expected {
            return Err(OrchestratorError::InvalidConfig(format!(
                "the initial parameters have layout {:?}, expected {expected:?}",
                params.shapes()
            )));
        }

        Ok(Self {
            model,
            params,
            placement,
        })
    }

    pub fn model(&self) -> &Sequential {
        &self.model
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Stages the parameters in host memory so they can be sent to the workers.
    pub fn stage(&self) -> HostParams {
        self.placement.to_host(&self.params)
    }

    /// Replaces the parameters with a host resident set, moving it to the model's device.
    fn install(&mut self, params: ParameterSet) {
        self.params = self.placement.to_device(params);
    }
}

/// The numeric knobs of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub num_global_cycles: usize,
    pub batch_size: usize,
    pub benchmark_workload: usize,
    /// The amount of training samples to distribute, the whole training set if missing.
    pub train_samples: Option<usize>,
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            num_global_cycles: config.num_global_cycles.get(),
            batch_size: config.batch_size.get(),
            benchmark_workload: config.benchmark_workload,
            train_samples: config.train_samples,
        }
    }
}

/// Where a session is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Benchmarked,
    Partitioned,
    Round { round: usize, step: RoundStep },
    Done,
    Failed(Phase),
}

/// The progress reports of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    Benchmarked { scores: Vec<f64> },
    Partitioned { allocation: Vec<usize> },
    /// The evaluation of the initial model, prior to any training.
    Evaluated(Evaluation),
    RoundFinished { round: usize, evaluation: Evaluation },
    Finished,
    Failed { phase: Phase, msg: String },
}

/// The outcome of a finished session.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub scores: Vec<f64>,
    pub allocation: Allocation,
    pub baseline: Evaluation,
    /// The evaluation after each round, in order.
    pub rounds: Vec<Evaluation>,
    pub params: ParameterSet,
}

/// A training session over a fixed set of workers.
pub struct Session<H: WorkerHandle, P: Placement = Cpu> {
    handles: Vec<H>,
    model: GlobalModel<P>,
    train: Dataset,
    test: Dataset,
    settings: SessionSettings,
    rng: StdRng,
    events: Option<UnboundedSender<TrainingEvent>>,
    state: SessionState,
}

impl<H: WorkerHandle, P: Placement> Session<H, P> {
    /// Creates a new `Session`.
    ///
    /// # Arguments
    /// * `handles` - The workers, their order is kept through every phase.
    /// * `model` - The global model.
    /// * `train` - The samples to distribute between the workers.
    /// * `test` - The held out samples to evaluate the global model on.
    /// * `settings` - The numeric knobs of the session.
    /// * `rng` - The source of randomness for sampling the shards.
    pub fn new(
        handles: Vec<H>,
        model: GlobalModel<P>,
        train: Dataset,
        test: Dataset,
        settings: SessionSettings,
        rng: StdRng,
    ) -> Self {
        Self {
            handles,
            model,
            train,
            test,
            settings,
            rng,
            events: None,
            state: SessionState::Idle,
        }
    }

    /// Reports the progress of the session through `events`.
    pub fn with_events(mut self, events: UnboundedSender<TrainingEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the whole session: benchmark, partition and every global round.
    ///
    /// # Returns
    /// The report of the session or the error that ended it, the session is left in the
    /// `Failed` state recording the phase it failed at.
    pub async fn run(&mut self) -> Result<TrainingReport> {
        match self.drive().await {
            Ok(report) => {
                self.state = SessionState::Done;
                self.emit(TrainingEvent::Finished);
                Ok(report)
            }
            Err(e) => {
                let phase = e.phase();
                error!("training failed during the {phase} phase: {e}");

                self.state = SessionState::Failed(phase);
                self.emit(TrainingEvent::Failed {
                    phase,
                    msg: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<TrainingReport> {
        let SessionSettings {
            num_global_cycles,
            batch_size,
            benchmark_workload,
            train_samples,
        } = self.settings;

        info!(workers = self.handles.len(); "benchmarking workers");
        let scores = benchmark_workers(&mut self.handles, benchmark_workload).await?;
        self.state = SessionState::Benchmarked;
        self.emit(TrainingEvent::Benchmarked {
            scores: scores.clone(),
        });

        let budget = train_samples
            .unwrap_or(self.train.len())
            .min(self.train.len());
        let total_batches = budget.checked_div(batch_size).unwrap_or(0);
        let allocation = Allocation::from_scores(&scores, total_batches)?;
        debug!("allocated {:?} batches", allocation.batches());

        info!("sending data to workers");
        let shards = partition::sample_shards(&self.train, &allocation, batch_size, &mut self.rng)?;
        partition::assign_shards(&mut self.handles, shards).await?;
        self.state = SessionState::Partitioned;
        self.emit(TrainingEvent::Partitioned {
            allocation: allocation.batches().to_vec(),
        });

        let baseline = self.evaluate(0)?;
        info!(loss = baseline.loss, accuracy = baseline.accuracy; "evaluation prior to training");
        self.emit(TrainingEvent::Evaluated(baseline));

        let weights = allocation.weights();
        let mut rounds = Vec::with_capacity(num_global_cycles);

        for round in 1..=num_global_cycles {
            info!("training round {round} out of {num_global_cycles}");

            self.enter(round, RoundStep::Dispatch);
            let params = self.model.stage();
            debug!(round = round; "staged parameters from {}", self.model.placement.device());

            self.enter(round, RoundStep::Collect);
            let updates = self.local_updates(round, &params).await?;

            self.enter(round, RoundStep::Aggregate);
            let aggregated = aggregate(&updates, &weights)
                .map_err(|source| OrchestratorError::Aggregation { round, source })?;
            self.model.install(aggregated);

            self.enter(round, RoundStep::Evaluate);
            let evaluation = self.evaluate(round)?;
            info!(
                round = round,
                loss = evaluation.loss,
                accuracy = evaluation.accuracy;
                "round finished"
            );

            self.emit(TrainingEvent::RoundFinished { round, evaluation });
            rounds.push(evaluation);
        }

        self.disconnect().await;

        Ok(TrainingReport {
            scores,
            allocation,
            baseline,
            rounds,
            params: self.model.params().clone(),
        })
    }

    /// Issues a local update to every worker at once and waits for all of them.
    async fn local_updates(&mut self, round: usize, params: &HostParams) -> Result<Vec<ParameterSet>> {
        let futs = self
            .handles
            .iter_mut()
            .enumerate()
            .map(|(worker, handle)| async move {
                handle.local_update(params).await.map_err(|e| {
                    OrchestratorError::LocalUpdateFailure {
                        round,
                        worker,
                        msg: e.to_string(),
                    }
                })
            });

        future::try_join_all(futs).await
    }

    fn evaluate(&self, round: usize) -> Result<Evaluation> {
        evaluate(
            self.model.model(),
            self.model.params(),
            &self.test,
            self.settings.batch_size,
            &CrossEntropy::new(),
            &Accuracy,
        )
        .map_err(|source| OrchestratorError::Evaluation { round, source })
    }

    async fn disconnect(&mut self) {
        let futs = self.handles.iter_mut().map(|handle| handle.disconnect());

        for (worker, res) in future::join_all(futs).await.into_iter().enumerate() {
            if let Err(e) = res {
                warn!("failed to disconnect worker {worker}: {e}");
            }
        }
    }

    fn enter(&mut self, round: usize, step: RoundStep) {
        debug!(round = round; "entering {}", Phase::Round { round, step });
        self.state = SessionState::Round { round, step };
    }

    fn emit(&self, event: TrainingEvent) {
        if let Some(events) = &self.events
            && events.send(event).is_err()
        {
            debug!("nobody is listening to the training events");
        }
    }
}
