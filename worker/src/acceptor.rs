use std::borrow::Cow;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
    specs::worker::WorkerSpec,
};
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Result, Worker};

/// Receives `CreateWorker(WorkerSpec)` and returns the spec.
///
/// # Args
/// * `rx` - Receiving end of the communication channel.
///
/// # Returns
/// Returns `Ok(Some(spec))` on `CreateWorker`.
/// Returns `Ok(None)` if `Disconnect` is received before bootstrap.
///
/// # Errors
/// Returns `WorkerErr::Io` if receiving fails.
pub async fn handshake<R>(rx: &mut OnoReceiver<R>) -> Result<Option<WorkerSpec>>
where
    R: AsyncRead + Unpin + Send,
{
    info!("waiting for CreateWorker spec");

    let mut rx_buf: Vec<u32> = Vec::new();
    let spec = loop {
        match rx.recv_into(&mut rx_buf).await? {
            Msg::Control(Command::CreateWorker(spec)) => break spec,
            Msg::Control(Command::Disconnect) => {
                info!("received Disconnect before bootstrap, exiting");
                return Ok(None);
            }
            msg => warn!("expected CreateWorker, got {}", msg.kind()),
        }
    };

    Ok(Some(spec))
}

/// Bootstraps a worker out of the first orchestrator message and serves it until disconnection.
///
/// The spec is acknowledged with `Ack` once the worker is built, a spec that can't be built is
/// answered with an error message instead.
///
/// # Args
/// * `rx` - Receiving end of the orchestrator channel.
/// * `tx` - Sending end of the orchestrator channel.
pub async fn serve<R, W>(mut rx: OnoReceiver<R>, mut tx: OnoSender<W>) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let Some(spec) = handshake(&mut rx).await? else {
        return Ok(());
    };

    debug!(
        worker_id = spec.worker_id,
        epochs = spec.training.epochs.get(),
        batch_size = spec.training.batch_size.get();
        "received worker spec"
    );

    let worker = match Worker::new(spec) {
        Ok(worker) => worker,
        Err(e) => {
            warn!("rejecting worker spec: {e}");
            let detail = e.to_string();
            tx.send(&Msg::Err(Cow::Borrowed(&detail))).await?;
            return Err(e);
        }
    };

    tx.send(&Msg::Control(Command::Ack)).await?;
    worker.run(rx, tx).await
}
