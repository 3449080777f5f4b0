use std::{borrow::Cow, io};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::{
        machine_learning::{LocalTrainingSpec, ParamsSpec, ShardSpec},
        worker::WorkerSpec,
    },
};
use log::{debug, info, warn};
use machine_learning::{
    MlErr, ParameterSet,
    arch::{Sequential, loss::CrossEntropy},
    dataset::Dataset,
    optimization::GradientDescent,
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task,
};

use crate::{Result, WorkerErr, benchmark};

/// Infrastructure worker runtime.
///
/// Holds the architecture and the training shard for a whole session, the parameters themselves
/// always arrive with each local update request.
pub struct Worker {
    worker_id: usize,
    model: Sequential,
    training: LocalTrainingSpec,
    shard: Option<Dataset>,
    rng: StdRng,
}

impl Worker {
    /// Creates a new worker out of it's bootstrap spec.
    ///
    /// # Args
    /// * `spec` - The architecture and local training hyper-parameters.
    ///
    /// # Returns
    /// The worker or an error if the model spec is invalid.
    pub fn new(spec: WorkerSpec) -> Result<Self> {
        let model = Sequential::from_spec(&spec.model)?;
        let rng = match spec.training.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            worker_id: spec.worker_id,
            model,
            training: spec.training,
            shard: None,
            rng,
        })
    }

    /// Replaces the training shard of this worker.
    ///
    /// # Returns
    /// A `SizeMismatch` error if the samples don't fit the model's input.
    pub fn assign(&mut self, shard: Dataset) -> Result<()> {
        if let Some(expected) = self.model.input_size()
            && shard.x_size() != expected
        {
            return Err(MlErr::SizeMismatch {
                what: "shard features",
                got: shard.x_size(),
                expected,
            }
            .into());
        }

        info!(worker_id = self.worker_id, samples = shard.len(); "training data assigned");
        self.shard = Some(shard);
        Ok(())
    }

    /// Trains `params` over the assigned shard for the configured amount of epochs.
    ///
    /// An empty shard leaves the parameters untouched.
    ///
    /// # Returns
    /// The trained parameters and the mean loss of the last epoch.
    pub fn local_update(&mut self, mut params: ParameterSet) -> Result<(ParameterSet, f32)> {
        let Some(shard) = &self.shard else {
            return Err(WorkerErr::NoShard);
        };

        if shard.is_empty() {
            debug!(worker_id = self.worker_id; "empty shard, returning parameters untouched");
            return Ok((params, 0.0));
        }

        let LocalTrainingSpec {
            epochs,
            batch_size,
            learning_rate,
            ..
        } = self.training;

        let loss = CrossEntropy::new();
        let mut optimizer = GradientDescent::new(learning_rate);
        let mut last = 0.0;

        for _ in 0..epochs.get() {
            last = self.model.train_epoch(
                &mut params,
                shard,
                batch_size.get(),
                &loss,
                &mut optimizer,
                &mut self.rng,
            )?;
        }

        Ok((params, last))
    }

    /// Serves the orchestrator's requests until it disconnects.
    ///
    /// Failures to fulfill a request are reported back as error messages and the worker keeps
    /// serving, only failures of the channel itself end the loop.
    ///
    /// # Args
    /// * `rx` - Receiving end of the orchestrator channel.
    /// * `tx` - Sending end of the orchestrator channel.
    ///
    /// # Errors
    /// Returns `WorkerErr::Io` on I/O failures.
    pub async fn run<R, W>(self, mut rx: OnoReceiver<R>, mut tx: OnoSender<W>) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut worker = self;
        let mut rx_buf: Vec<f32> = Vec::new();
        let mut labels_buf: Vec<u32> = Vec::new();

        loop {
            debug!("waiting for message");

            let cmd = match rx.recv_into(&mut rx_buf).await? {
                Msg::Control(cmd) => cmd,
                other => {
                    let err = WorkerErr::UnexpectedMessage {
                        expected: "control",
                        got: other.kind(),
                    };
                    report(&mut tx, err).await?;
                    continue;
                }
            };

            match cmd {
                Command::Benchmark { workload } => {
                    debug!(workload = workload; "running benchmark");
                    let value = task::spawn_blocking(move || benchmark::score(workload))
                        .await
                        .map_err(io::Error::other)?;

                    info!(worker_id = worker.worker_id, score = value; "benchmark finished");
                    tx.send(&Msg::Control(Command::Score { value })).await?;
                }
                Command::AssignData(spec) => {
                    let res = recv_shard(&mut rx, spec, &mut rx_buf, &mut labels_buf)
                        .await
                        .and_then(|shard| worker.assign(shard));

                    match res {
                        Ok(()) => tx.send(&Msg::Control(Command::Ack)).await?,
                        Err(e) => report(&mut tx, e).await?,
                    }
                }
                Command::LocalUpdate(layout) => {
                    let params = match rx.recv_into(&mut rx_buf).await? {
                        Msg::Data(Payload::Params(flat)) => {
                            ParameterSet::from_flat(&layout.shapes, flat).map_err(WorkerErr::from)
                        }
                        other => Err(WorkerErr::UnexpectedMessage {
                            expected: "data/params",
                            got: other.kind(),
                        }),
                    };

                    let res = match params {
                        Ok(params) => {
                            let (back, res) = task::spawn_blocking(move || {
                                let res = worker.local_update(params);
                                (worker, res)
                            })
                            .await
                            .map_err(io::Error::other)?;

                            worker = back;
                            res
                        }
                        Err(e) => Err(e),
                    };

                    match res {
                        Ok((params, loss)) => {
                            info!(worker_id = worker.worker_id, loss = loss; "local update finished");

                            let layout = ParamsSpec {
                                shapes: params.shapes(),
                            };
                            tx.send(&Msg::Control(Command::Updated(layout))).await?;

                            let flat = params.to_flat();
                            tx.send(&Msg::Data(Payload::Params(&flat))).await?;
                        }
                        Err(e) => report(&mut tx, e).await?,
                    }
                }
                Command::Disconnect => {
                    info!(worker_id = worker.worker_id; "disconnect received from orchestrator");
                    break;
                }
                other => {
                    let got = match other {
                        Command::CreateWorker(_) => "create_worker",
                        _ => "control",
                    };

                    let err = WorkerErr::UnexpectedMessage {
                        expected: "benchmark, assign_data, local_update or disconnect",
                        got,
                    };
                    report(&mut tx, err).await?;
                }
            }
        }

        Ok(())
    }
}

/// Receives the features and labels that follow an `AssignData` header.
async fn recv_shard<R>(
    rx: &mut OnoReceiver<R>,
    spec: ShardSpec,
    features_buf: &mut Vec<f32>,
    labels_buf: &mut Vec<u32>,
) -> Result<Dataset>
where
    R: AsyncRead + Unpin + Send,
{
    let features = match rx.recv_into(features_buf).await? {
        Msg::Data(Payload::Features(features)) => features,
        other => {
            return Err(WorkerErr::UnexpectedMessage {
                expected: "data/features",
                got: other.kind(),
            });
        }
    };

    let labels = match rx.recv_into(labels_buf).await? {
        Msg::Data(Payload::Labels(labels)) => labels,
        other => {
            return Err(WorkerErr::UnexpectedMessage {
                expected: "data/labels",
                got: other.kind(),
            });
        }
    };

    if labels.len() != spec.samples {
        return Err(MlErr::SizeMismatch {
            what: "shard labels",
            got: labels.len(),
            expected: spec.samples,
        }
        .into());
    }

    Ok(Dataset::from_flat(spec.x_size, features, labels)?)
}

/// Reports a failed request to the orchestrator, failures of the channel itself are returned.
async fn report<W>(tx: &mut OnoSender<W>, err: WorkerErr) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    if let WorkerErr::Io(e) = err {
        return Err(e.into());
    }

    warn!("request failed: {err}");
    let detail = err.to_string();
    tx.send(&Msg::Err(Cow::Borrowed(&detail))).await?;
    Ok(())
}
