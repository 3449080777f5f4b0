pub mod aggregation;
pub mod benchmark;
pub mod configs;
pub mod discovery;
pub mod error;
pub mod evaluation;
pub mod handle;
pub mod partition;
mod session;

use futures::future;
use log::info;
use machine_learning::placement::Cpu;
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::mpsc::UnboundedSender;

use configs::{Adapter, SessionConfig};
use handle::RemoteWorker;

pub use error::{OrchestratorError, Phase, Result, RoundStep};
pub use session::{
    GlobalModel, Session, SessionSettings, SessionState, TrainingEvent, TrainingReport,
};

/// Runs an entire training session: discovers and connects to the workers, then trains the
/// configured model for every global round.
///
/// # Arguments
/// * `config` - The session configuration.
/// * `events` - Where to report the progress of the session, if anywhere.
///
/// # Errors
/// Returns the `OrchestratorError` that ended the session, `OrchestratorError::phase` tells
/// where it happened.
pub async fn train(
    config: SessionConfig,
    events: Option<UnboundedSender<TrainingEvent>>,
) -> Result<TrainingReport> {
    info!("adapting configs");
    let adapter = Adapter::new(&config);
    let model = adapter.validate()?;

    let (train, test) = adapter.load_datasets()?;
    adapter.validate_dataset(&model, &train)?;
    adapter.validate_dataset(&model, &test)?;
    info!(train = train.len(), test = test.len(); "datasets loaded");

    let addrs = discovery::discover(&config.discovery).await?;
    info!("connecting to {} worker(s)", addrs.len());

    let connections = addrs
        .iter()
        .enumerate()
        .map(|(i, &addr)| RemoteWorker::connect(addr, adapter.worker_spec(i)));
    let handles = future::try_join_all(connections).await?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let params = model
        .init_params(config.init, &mut rng)
        .map_err(|e| OrchestratorError::InvalidConfig(e.to_string()))?;
    let model = GlobalModel::new(model, params, Cpu)?;

    let mut session = Session::new(
        handles,
        model,
        train,
        test,
        SessionSettings::from(&config),
        rng,
    );

    if let Some(events) = events {
        session = session.with_events(events);
    }

    session.run().await
}
