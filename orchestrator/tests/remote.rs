mod common;

use std::{net::SocketAddr, num::NonZeroUsize};

use comms::{
    OnoReceiver, OnoSender,
    specs::{
        machine_learning::{InitSpec, LayerSpec, LocalTrainingSpec, ModelSpec},
        worker::WorkerSpec,
    },
};
use orchestrator::{
    OrchestratorError, Session, SessionState, discovery,
    handle::{HandleErr, RemoteWorker},
};
use tokio::{
    io::{self, DuplexStream, ReadHalf, WriteHalf},
    task::JoinHandle,
};
use worker::board::{self, NoticeBoard};

use common::{diagonal_dataset, linear_model, rng, settings};

type Rx = OnoReceiver<ReadHalf<DuplexStream>>;
type Tx = OnoSender<WriteHalf<DuplexStream>>;

fn channel_pair() -> ((Rx, Tx), (Rx, Tx)) {
    let (stream1, stream2) = io::duplex(1 << 16);
    let (rx1, tx1) = io::split(stream1);
    let (rx2, tx2) = io::split(stream2);
    (comms::channel(rx1, tx1), comms::channel(rx2, tx2))
}

fn worker_spec(worker_id: usize, layers: Vec<LayerSpec>) -> WorkerSpec {
    WorkerSpec {
        worker_id,
        model: ModelSpec::Sequential { layers },
        training: LocalTrainingSpec {
            epochs: NonZeroUsize::new(2).unwrap(),
            batch_size: NonZeroUsize::new(4).unwrap(),
            learning_rate: 0.5,
            seed: Some(worker_id as u64),
        },
    }
}

/// Spawns a worker node on one end of a channel and bootstraps it from the other.
async fn spawn_worker(
    spec: WorkerSpec,
) -> (
    Result<RemoteWorker<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>, HandleErr>,
    JoinHandle<worker::Result<()>>,
) {
    let ((worker_rx, worker_tx), (rx, tx)) = channel_pair();
    let served = tokio::spawn(worker::serve(worker_rx, worker_tx));
    (RemoteWorker::bootstrap(rx, tx, spec).await, served)
}

#[tokio::test]
async fn trains_against_real_workers() {
    let layers = vec![LayerSpec::Dense { dim: (2, 2) }];

    let mut handles = Vec::new();
    let mut nodes = Vec::new();
    for worker_id in 0..2 {
        let (handle, served) = spawn_worker(worker_spec(worker_id, layers.clone())).await;
        handles.push(handle.unwrap());
        nodes.push(served);
    }

    let model = linear_model(InitSpec::Const { value: 0.0 });
    let mut session = Session::new(
        handles,
        model,
        diagonal_dataset(12),
        diagonal_dataset(12),
        settings(3, 4),
        rng(),
    );

    let report = session.run().await.unwrap();

    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(report.rounds.len(), 3);
    assert!((report.baseline.loss - std::f32::consts::LN_2).abs() < 1e-4);

    let last = report.rounds[2];
    assert!(last.loss.is_finite());
    assert!(last.loss < report.baseline.loss);

    for node in nodes {
        node.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn a_rejected_spec_is_reported_by_the_worker() {
    let (handle, served) = spawn_worker(worker_spec(0, vec![LayerSpec::Dense { dim: (0, 2) }])).await;

    assert!(matches!(handle, Err(HandleErr::Remote(_))));
    assert!(served.await.unwrap().is_err());
}

#[tokio::test]
async fn lists_the_workers_of_a_notice_board() {
    let nb = NoticeBoard::new();
    let addrs: Vec<SocketAddr> = vec!["10.0.0.1:4000".parse().unwrap(), "10.0.0.2:4000".parse().unwrap()];

    for &addr in &addrs {
        let ((nb_rx, nb_tx), (mut rx, mut tx)) = channel_pair();
        let served = {
            let nb = nb.clone();
            tokio::spawn(async move { nb.serve(nb_rx, nb_tx).await })
        };

        board::register(&mut rx, &mut tx, addr).await.unwrap();
        served.await.unwrap().unwrap();
    }

    let ((nb_rx, nb_tx), (mut rx, mut tx)) = channel_pair();
    let served = {
        let nb = nb.clone();
        tokio::spawn(async move { nb.serve(nb_rx, nb_tx).await })
    };

    let listed = discovery::list_workers(&mut rx, &mut tx).await.unwrap();
    served.await.unwrap().unwrap();

    assert_eq!(listed, addrs);
}

#[tokio::test]
async fn an_empty_notice_board_fails_discovery() {
    let nb = NoticeBoard::new();
    let ((nb_rx, nb_tx), (mut rx, mut tx)) = channel_pair();
    let served = tokio::spawn(async move { nb.serve(nb_rx, nb_tx).await });

    let err = discovery::list_workers(&mut rx, &mut tx).await.unwrap_err();
    served.await.unwrap().unwrap();

    assert!(matches!(err, OrchestratorError::DiscoveryFailure(_)));
}
