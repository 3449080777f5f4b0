mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use comms::specs::machine_learning::InitSpec;
use machine_learning::{ParameterSet, dataset::Dataset, placement::HostParams};
use orchestrator::{
    OrchestratorError, Phase, RoundStep, Session, SessionState, TrainingEvent,
    handle::{HandleErr, WorkerHandle},
};
use tokio::{
    sync::{Barrier, mpsc},
    time,
};

use common::{linear_model, rng, samples, settings};

/// A worker that shifts every parameter it's handed by a fixed amount.
struct MockWorker {
    score: f64,
    shift: f32,
    fail_at: Option<usize>,
    fail_assign: bool,
    updates: Arc<AtomicUsize>,
    assigned: Arc<AtomicUsize>,
    disconnected: Arc<AtomicUsize>,
}

impl MockWorker {
    fn new(score: f64, shift: f32) -> Self {
        Self {
            score,
            shift,
            fail_at: None,
            fail_assign: false,
            updates: Arc::new(AtomicUsize::new(0)),
            assigned: Arc::new(AtomicUsize::new(0)),
            disconnected: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_at(mut self, round: usize) -> Self {
        self.fail_at = Some(round);
        self
    }

    fn rejecting_data(mut self) -> Self {
        self.fail_assign = true;
        self
    }
}

impl WorkerHandle for MockWorker {
    async fn benchmark(&mut self, _workload: usize) -> Result<f64, HandleErr> {
        Ok(self.score)
    }

    async fn assign_training_data(&mut self, shard: Dataset) -> Result<(), HandleErr> {
        if self.fail_assign {
            return Err(HandleErr::Remote("disk full".into()));
        }

        self.assigned.store(shard.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn local_update(&mut self, params: &HostParams) -> Result<ParameterSet, HandleErr> {
        let round = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(round) {
            return Err(HandleErr::Remote("out of memory".into()));
        }

        let mut trained = ParameterSet::clone(params);
        for tensor in trained.tensors_mut() {
            tensor.mapv_inplace(|x| x + self.shift);
        }

        Ok(trained)
    }

    async fn disconnect(&mut self) -> Result<(), HandleErr> {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<TrainingEvent>) -> Vec<TrainingEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn runs_exactly_the_configured_rounds() {
    let workers = vec![MockWorker::new(1.0, 1.0), MockWorker::new(1.0, 3.0)];
    let updates: Vec<_> = workers.iter().map(|w| w.updates.clone()).collect();
    let disconnected: Vec<_> = workers.iter().map(|w| w.disconnected.clone()).collect();

    let model = linear_model(InitSpec::Const { value: 0.0 });
    let mut session = Session::new(workers, model, samples(40), samples(8), settings(10, 4), rng());

    let report = session.run().await.unwrap();

    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(report.rounds.len(), 10);
    assert_eq!(report.allocation.batches(), &[5, 5]);
    for (updates, disconnected) in updates.iter().zip(&disconnected) {
        assert_eq!(updates.load(Ordering::SeqCst), 10);
        assert_eq!(disconnected.load(Ordering::SeqCst), 1);
    }

    // Equal weights average the shifts of 1 and 3 into 2 per round.
    for tensor in report.params.tensors() {
        assert!(tensor.iter().all(|&x| (x - 20.0).abs() < 1e-4));
    }
}

#[tokio::test]
async fn allocation_follows_the_benchmark_scores() {
    let workers = vec![
        MockWorker::new(10.0, 0.0),
        MockWorker::new(20.0, 0.0),
        MockWorker::new(30.0, 0.0),
    ];
    let assigned: Vec<_> = workers.iter().map(|w| w.assigned.clone()).collect();

    let model = linear_model(InitSpec::LecunUniform);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::new(workers, model, samples(400), samples(8), settings(1, 4), rng())
        .with_events(tx);

    let report = session.run().await.unwrap();

    assert_eq!(report.scores, vec![10.0, 20.0, 30.0]);
    assert_eq!(report.allocation.batches(), &[17, 33, 50]);
    let sizes: Vec<usize> = assigned.iter().map(|a| a.load(Ordering::SeqCst)).collect();
    assert_eq!(sizes, vec![68, 132, 200]);

    let events = drain(&mut rx);
    assert_eq!(
        events.first(),
        Some(&TrainingEvent::Benchmarked {
            scores: vec![10.0, 20.0, 30.0]
        })
    );
    assert_eq!(
        events.get(1),
        Some(&TrainingEvent::Partitioned {
            allocation: vec![17, 33, 50]
        })
    );
    assert!(matches!(events.get(2), Some(TrainingEvent::Evaluated(_))));
    assert!(matches!(
        events.get(3),
        Some(TrainingEvent::RoundFinished { round: 1, .. })
    ));
    assert_eq!(events.last(), Some(&TrainingEvent::Finished));
}

#[tokio::test]
async fn a_failed_local_update_aborts_the_session() {
    let workers = vec![MockWorker::new(1.0, 0.0), MockWorker::new(1.0, 0.0).failing_at(2)];

    let model = linear_model(InitSpec::LecunUniform);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::new(workers, model, samples(40), samples(8), settings(5, 4), rng())
        .with_events(tx);

    let err = session.run().await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::LocalUpdateFailure {
            round: 2,
            worker: 1,
            ..
        }
    ));

    let phase = Phase::Round {
        round: 2,
        step: RoundStep::Collect,
    };
    assert_eq!(session.state(), SessionState::Failed(phase));

    let events = drain(&mut rx);
    let finished = events
        .iter()
        .filter(|e| matches!(e, TrainingEvent::RoundFinished { .. }))
        .count();
    assert_eq!(finished, 1);
    assert!(matches!(
        events.last(),
        Some(TrainingEvent::Failed { phase: p, .. }) if *p == phase
    ));
}

#[tokio::test]
async fn an_invalid_score_fails_the_benchmark() {
    let workers = vec![MockWorker::new(1.0, 0.0), MockWorker::new(f64::NAN, 0.0)];
    let updates = workers[0].updates.clone();

    let model = linear_model(InitSpec::LecunUniform);
    let mut session = Session::new(workers, model, samples(40), samples(8), settings(3, 4), rng());

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::BenchmarkFailure { worker: 1, .. }));
    assert_eq!(session.state(), SessionState::Failed(Phase::Benchmark));
    assert_eq!(updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn too_few_samples_for_a_batch_is_an_empty_allocation() {
    let workers = vec![MockWorker::new(1.0, 0.0)];

    let model = linear_model(InitSpec::LecunUniform);
    let mut session = Session::new(workers, model, samples(3), samples(8), settings(3, 4), rng());

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::EmptyAllocation));
    assert_eq!(session.state(), SessionState::Failed(Phase::Partition));
}

#[tokio::test]
async fn a_test_set_smaller_than_a_batch_fails_the_baseline() {
    let workers = vec![MockWorker::new(1.0, 0.0)];
    let updates = workers[0].updates.clone();

    let model = linear_model(InitSpec::LecunUniform);
    let mut session = Session::new(workers, model, samples(40), samples(3), settings(3, 4), rng());

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::Evaluation { round: 0, .. }));
    assert_eq!(session.state(), SessionState::Failed(Phase::Baseline));
    assert_eq!(updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn a_failed_data_assignment_fails_the_partition() {
    let workers = vec![
        MockWorker::new(1.0, 0.0),
        MockWorker::new(1.0, 0.0),
        MockWorker::new(1.0, 0.0).rejecting_data(),
    ];
    let updates = workers[0].updates.clone();

    let model = linear_model(InitSpec::LecunUniform);
    let mut session = Session::new(workers, model, samples(40), samples(8), settings(3, 4), rng());

    let err = session.run().await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::DataTransmissionFailure { worker: 2, .. }
    ));
    assert_eq!(session.state(), SessionState::Failed(Phase::Partition));
    assert_eq!(updates.load(Ordering::SeqCst), 0);
}

/// A worker that only answers once every worker of the session is waiting on the same request.
struct LockstepWorker {
    barrier: Arc<Barrier>,
}

impl WorkerHandle for LockstepWorker {
    async fn benchmark(&mut self, _workload: usize) -> Result<f64, HandleErr> {
        self.barrier.wait().await;
        Ok(1.0)
    }

    async fn assign_training_data(&mut self, _shard: Dataset) -> Result<(), HandleErr> {
        self.barrier.wait().await;
        Ok(())
    }

    async fn local_update(&mut self, params: &HostParams) -> Result<ParameterSet, HandleErr> {
        self.barrier.wait().await;
        Ok(ParameterSet::clone(params))
    }

    async fn disconnect(&mut self) -> Result<(), HandleErr> {
        Ok(())
    }
}

#[tokio::test]
async fn every_phase_addresses_all_workers_at_once() {
    let barrier = Arc::new(Barrier::new(3));
    let workers: Vec<_> = (0..3)
        .map(|_| LockstepWorker {
            barrier: barrier.clone(),
        })
        .collect();

    let model = linear_model(InitSpec::LecunUniform);
    let mut session = Session::new(workers, model, samples(60), samples(8), settings(10, 4), rng());

    let report = time::timeout(Duration::from_secs(5), session.run())
        .await
        .expect("a phase issued its requests one worker at a time")
        .unwrap();

    assert_eq!(report.rounds.len(), 10);
    assert_eq!(report.allocation.batches(), &[5, 5, 5]);
}
