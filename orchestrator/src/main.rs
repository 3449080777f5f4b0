use std::{env, process::ExitCode};

use anyhow::Context;
use log::error;
use orchestrator::{TrainingEvent, configs::SessionConfig, train};
use tokio::sync::mpsc;

const DEFAULT_CONFIG: &str = "session.json";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = SessionConfig::from_path(&path)
        .with_context(|| format!("failed to read the session config at {path}"))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                TrainingEvent::Benchmarked { scores } => println!("benchmark scores: {scores:?}"),
                TrainingEvent::Partitioned { allocation } => {
                    println!("batches per worker: {allocation:?}")
                }
                TrainingEvent::Evaluated(eval) => println!(
                    "network loss and accuracy prior to training: {:.4} {:.4}",
                    eval.loss, eval.accuracy
                ),
                TrainingEvent::RoundFinished { round, evaluation } => println!(
                    "round {round}: loss {:.4} accuracy {:.4}",
                    evaluation.loss, evaluation.accuracy
                ),
                TrainingEvent::Finished => println!("training finished"),
                TrainingEvent::Failed { phase, msg } => {
                    eprintln!("training failed during the {phase} phase: {msg}")
                }
            }
        }
    });

    let res = train(config, Some(tx)).await;
    progress.await?;

    match res {
        Ok(report) => {
            if let Some(last) = report.rounds.last() {
                println!(
                    "final loss {:.4} accuracy {:.4} after {} rounds",
                    last.loss,
                    last.accuracy,
                    report.rounds.len()
                );
            }

            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("training failed during the {} phase: {e}", e.phase());
            Ok(ExitCode::FAILURE)
        }
    }
}
