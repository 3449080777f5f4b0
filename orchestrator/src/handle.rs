//! The orchestrator's view of a remote training participant.

use std::{error::Error, fmt, io, net::SocketAddr};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::{
        machine_learning::{ParamsSpec, ShardSpec},
        worker::WorkerSpec,
    },
};
use log::debug;
use machine_learning::{MlErr, ParameterSet, dataset::Dataset, placement::HostParams};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

use crate::OrchestratorError;

/// The failures of a single request to a worker.
#[derive(Debug)]
pub enum HandleErr {
    Io(io::Error),
    /// The worker answered with an error message.
    Remote(String),
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },
    Ml(MlErr),
}

impl fmt::Display for HandleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Remote(detail) => write!(f, "the worker reported: {detail}"),
            Self::UnexpectedMessage { expected, got } => {
                write!(f, "unexpected message: expected {expected}, got {got}")
            }
            Self::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl Error for HandleErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HandleErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<MlErr> for HandleErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<HandleErr> for io::Error {
    fn from(value: HandleErr) -> Self {
        match value {
            HandleErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// A local proxy of a single remote worker.
///
/// Handles are fixed at the start of a session, every phase addresses all of them at once.
#[allow(unused)]
#[trait_variant::make(WorkerHandle: Send)]
pub trait WorkerHandleTemplate {
    /// Runs the standardized benchmark on the worker.
    ///
    /// # Arguments
    /// * `workload` - The size of the benchmark, the same for every worker of a session.
    ///
    /// # Returns
    /// The worker's throughput score.
    async fn benchmark(&mut self, workload: usize) -> Result<f64, HandleErr>;

    /// Hands the worker the samples it trains on for the rest of the session.
    async fn assign_training_data(&mut self, shard: Dataset) -> Result<(), HandleErr>;

    /// Asks the worker to train the given parameters over it's shard.
    ///
    /// # Arguments
    /// * `params` - The global parameters, already staged in host memory.
    ///
    /// # Returns
    /// The worker's trained parameters, sharing the layout of `params`.
    async fn local_update(&mut self, params: &HostParams) -> Result<ParameterSet, HandleErr>;

    /// Ends the session with the worker.
    async fn disconnect(&mut self) -> Result<(), HandleErr>;
}

/// A `WorkerHandle` over a `comms` channel.
pub struct RemoteWorker<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    worker_id: usize,
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
    rx_buf: Vec<f32>,
}

impl RemoteWorker<OwnedReadHalf, OwnedWriteHalf> {
    /// Connects to a worker node and bootstraps it.
    ///
    /// # Arguments
    /// * `addr` - The worker's network address.
    /// * `spec` - The bootstrap specification of the worker.
    ///
    /// # Returns
    /// The handle or a `ConnectionFailed` error if the worker can't be reached or rejects the spec.
    pub async fn connect(addr: SocketAddr, spec: WorkerSpec) -> Result<Self, OrchestratorError> {
        let failed = |source: io::Error| OrchestratorError::ConnectionFailed {
            addr: addr.to_string(),
            source,
        };

        let stream = TcpStream::connect(addr).await.map_err(failed)?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);

        Self::bootstrap(rx, tx, spec)
            .await
            .map_err(|e| failed(e.into()))
    }
}

impl<R, W> RemoteWorker<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Sends the `CreateWorker` bootstrap through an open channel and waits for it's `Ack`.
    pub async fn bootstrap(
        rx: OnoReceiver<R>,
        mut tx: OnoSender<W>,
        spec: WorkerSpec,
    ) -> Result<Self, HandleErr> {
        let worker_id = spec.worker_id;
        tx.send(&Msg::Control(Command::CreateWorker(spec))).await?;

        let mut handle = Self {
            worker_id,
            rx,
            tx,
            rx_buf: Vec::new(),
        };

        handle.expect_ack().await?;
        debug!(worker_id = worker_id; "worker bootstrapped");
        Ok(handle)
    }

    async fn recv_control(&mut self, expected: &'static str) -> Result<Command, HandleErr> {
        match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Control(cmd) => Ok(cmd),
            Msg::Err(detail) => Err(HandleErr::Remote(detail.into_owned())),
            other => Err(HandleErr::UnexpectedMessage {
                expected,
                got: other.kind(),
            }),
        }
    }

    async fn expect_ack(&mut self) -> Result<(), HandleErr> {
        match self.recv_control("ack").await? {
            Command::Ack => Ok(()),
            _ => Err(HandleErr::UnexpectedMessage {
                expected: "ack",
                got: "control",
            }),
        }
    }
}

impl<R, W> WorkerHandle for RemoteWorker<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn benchmark(&mut self, workload: usize) -> Result<f64, HandleErr> {
        let msg = Msg::Control(Command::Benchmark { workload });
        self.tx.send(&msg).await?;

        match self.recv_control("score").await? {
            Command::Score { value } => Ok(value),
            _ => Err(HandleErr::UnexpectedMessage {
                expected: "score",
                got: "control",
            }),
        }
    }

    async fn assign_training_data(&mut self, shard: Dataset) -> Result<(), HandleErr> {
        let spec = ShardSpec {
            samples: shard.len(),
            x_size: shard.x_size(),
        };

        let features: Vec<f32> = shard.x().iter().copied().collect();
        let labels = shard.y().to_vec();

        self.tx
            .send(&Msg::Control(Command::AssignData(spec)))
            .await?;
        self.tx
            .send(&Msg::Data(Payload::Features(&features)))
            .await?;
        self.tx.send(&Msg::Data(Payload::Labels(&labels))).await?;

        self.expect_ack().await
    }

    async fn local_update(&mut self, params: &HostParams) -> Result<ParameterSet, HandleErr> {
        let layout = ParamsSpec {
            shapes: params.shapes(),
        };
        let flat = params.to_flat();

        self.tx
            .send(&Msg::Control(Command::LocalUpdate(layout.clone())))
            .await?;
        self.tx.send(&Msg::Data(Payload::Params(&flat))).await?;

        let updated = match self.recv_control("updated").await? {
            Command::Updated(updated) => updated,
            _ => {
                return Err(HandleErr::UnexpectedMessage {
                    expected: "updated",
                    got: "control",
                });
            }
        };

        if updated != layout {
            return Err(MlErr::LayoutMismatch {
                what: "local update",
                got: updated.shapes,
                expected: layout.shapes,
            }
            .into());
        }

        match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Data(Payload::Params(trained)) => {
                debug!(worker_id = self.worker_id, size = trained.len(); "received local update");
                Ok(ParameterSet::from_flat(&updated.shapes, trained)?)
            }
            Msg::Err(detail) => Err(HandleErr::Remote(detail.into_owned())),
            other => Err(HandleErr::UnexpectedMessage {
                expected: "data/params",
                got: other.kind(),
            }),
        }
    }

    async fn disconnect(&mut self) -> Result<(), HandleErr> {
        self.tx.send(&Msg::Control(Command::Disconnect)).await?;
        self.tx.shutdown().await?;
        Ok(())
    }
}
