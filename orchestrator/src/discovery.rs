use std::net::SocketAddr;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
};
use log::{debug, info};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, lookup_host},
};

use crate::{OrchestratorError, Result, configs::DiscoveryConfig};

/// Finds the workers that take part in a session.
#[allow(unused)]
#[trait_variant::make(Discovery: Send)]
pub trait DiscoveryTemplate {
    /// Returns the address of every available worker, in a fixed order.
    ///
    /// # Returns
    /// The addresses or a `DiscoveryFailure` if there are none.
    async fn discover(&mut self) -> Result<Vec<SocketAddr>>;
}

/// Discovery over a fixed list of addresses.
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    workers: Vec<String>,
}

impl StaticDiscovery {
    /// Creates a new `StaticDiscovery`.
    ///
    /// # Arguments
    /// * `workers` - The `host:port` address of each worker.
    pub fn new(workers: Vec<String>) -> Self {
        Self { workers }
    }
}

impl Discovery for StaticDiscovery {
    async fn discover(&mut self) -> Result<Vec<SocketAddr>> {
        if self.workers.is_empty() {
            return Err(OrchestratorError::DiscoveryFailure(
                "no worker addresses were given".into(),
            ));
        }

        let mut addrs = Vec::with_capacity(self.workers.len());
        for (i, host) in self.workers.iter().enumerate() {
            let addr = lookup_host(host.as_str())
                .await
                .map_err(|e| {
                    OrchestratorError::DiscoveryFailure(format!("worker[{i}] {host}: {e}"))
                })?
                .next()
                .ok_or_else(|| {
                    OrchestratorError::DiscoveryFailure(format!(
                        "worker[{i}] {host}: could not resolve address"
                    ))
                })?;

            addrs.push(addr);
        }

        Ok(addrs)
    }
}

/// Discovery through a notice board the workers registered at.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    seed: String,
}

impl NoticeBoard {
    /// Creates a new `NoticeBoard` client.
    ///
    /// # Arguments
    /// * `seed` - The `host:port` address of the notice board.
    pub fn new(seed: String) -> Self {
        Self { seed }
    }
}

impl Discovery for NoticeBoard {
    async fn discover(&mut self) -> Result<Vec<SocketAddr>> {
        let stream = TcpStream::connect(self.seed.as_str()).await.map_err(|e| {
            OrchestratorError::DiscoveryFailure(format!("notice board {}: {e}", self.seed))
        })?;

        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);
        info!("asking notice board {} for workers", self.seed);

        list_workers(&mut rx, &mut tx).await
    }
}

/// Lists the workers registered at a notice board and closes the session with it.
///
/// # Arguments
/// * `rx` - Receiving end of the notice board channel.
/// * `tx` - Sending end of the notice board channel.
pub async fn list_workers<R, W>(
    rx: &mut OnoReceiver<R>,
    tx: &mut OnoSender<W>,
) -> Result<Vec<SocketAddr>>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    tx.send(&Msg::Control(Command::ListWorkers)).await?;

    let mut rx_buf: Vec<u32> = Vec::new();
    let addrs = match rx.recv_into(&mut rx_buf).await? {
        Msg::Control(Command::Workers { addrs }) => addrs,
        Msg::Err(detail) => return Err(OrchestratorError::DiscoveryFailure(detail.into_owned())),
        other => {
            return Err(OrchestratorError::DiscoveryFailure(format!(
                "expected the list of workers, got {}",
                other.kind()
            )));
        }
    };

    tx.send(&Msg::Control(Command::Disconnect)).await?;
    debug!(workers = addrs.len(); "notice board answered");

    if addrs.is_empty() {
        return Err(OrchestratorError::DiscoveryFailure(
            "no workers are registered at the notice board".into(),
        ));
    }

    Ok(addrs)
}

/// Discovers the workers with the mechanism a session is configured with.
pub async fn discover(config: &DiscoveryConfig) -> Result<Vec<SocketAddr>> {
    match config {
        DiscoveryConfig::NoticeBoard { seed } => {
            Discovery::discover(&mut NoticeBoard::new(seed.clone())).await
        }
        DiscoveryConfig::Static { workers } => {
            Discovery::discover(&mut StaticDiscovery::new(workers.clone())).await
        }
    }
}
