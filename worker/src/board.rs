//! The notice board, a registry through which workers announce themselves and orchestrators
//! discover them.

use std::{borrow::Cow, net::SocketAddr, sync::Arc};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    sync::Mutex,
};

use crate::{Result, WorkerErr};

/// A shared registry of worker addresses, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    workers: Arc<Mutex<Vec<SocketAddr>>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registered workers in registration order.
    pub async fn workers(&self) -> Vec<SocketAddr> {
        self.workers.lock().await.clone()
    }

    /// Accepts connections forever, serving each of them on it's own task.
    ///
    /// # Args
    /// * `listener` - The socket to accept connections on.
    pub async fn listen(self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!("notice board connection from {peer}");

            let board = self.clone();
            tokio::spawn(async move {
                let (rx, tx) = stream.into_split();
                let (rx, tx) = comms::channel(rx, tx);

                if let Err(e) = board.serve(rx, tx).await {
                    warn!("notice board connection from {peer} failed: {e}");
                }
            });
        }
    }

    /// Serves a single connection until the peer disconnects.
    ///
    /// # Args
    /// * `rx` - Receiving end of the peer channel.
    /// * `tx` - Sending end of the peer channel.
    pub async fn serve<R, W>(&self, mut rx: OnoReceiver<R>, mut tx: OnoSender<W>) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut rx_buf: Vec<u32> = Vec::new();

        loop {
            match rx.recv_into(&mut rx_buf).await? {
                Msg::Control(Command::Register { addr }) => {
                    let mut workers = self.workers.lock().await;
                    if !workers.contains(&addr) {
                        workers.push(addr);
                        info!("registered worker at {addr}");
                    }
                    drop(workers);

                    tx.send(&Msg::Control(Command::Ack)).await?;
                }
                Msg::Control(Command::ListWorkers) => {
                    let addrs = self.workers().await;
                    debug!(workers = addrs.len(); "listing workers");
                    tx.send(&Msg::Control(Command::Workers { addrs })).await?;
                }
                Msg::Control(Command::Disconnect) => return Ok(()),
                other => {
                    let detail = format!("the notice board can't handle {}", other.kind());
                    warn!("{detail}");
                    tx.send(&Msg::Err(Cow::Borrowed(&detail))).await?;
                }
            }
        }
    }
}

/// Announces a worker to a notice board and closes the session.
///
/// # Args
/// * `rx` - Receiving end of the notice board channel.
/// * `tx` - Sending end of the notice board channel.
/// * `addr` - The address orchestrators should reach this worker at.
pub async fn register<R, W>(
    rx: &mut OnoReceiver<R>,
    tx: &mut OnoSender<W>,
    addr: SocketAddr,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    tx.send(&Msg::Control(Command::Register { addr })).await?;

    let mut rx_buf: Vec<u32> = Vec::new();
    match rx.recv_into(&mut rx_buf).await? {
        Msg::Control(Command::Ack) => {}
        Msg::Err(detail) => return Err(WorkerErr::Remote(detail.into_owned())),
        other => {
            return Err(WorkerErr::UnexpectedMessage {
                expected: "ack",
                got: other.kind(),
            });
        }
    }

    tx.send(&Msg::Control(Command::Disconnect)).await?;
    Ok(())
}
