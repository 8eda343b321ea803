//! Boot-time agent that answers systemd ask-password requests for encrypted
//! volumes, fetching passphrases from the configured provider instead of
//! prompting a human.

use anyhow::{Context, Result};
use lockagent_agent::AgentServer;
use lockagent_core::config::AgentPaths;
use lockagent_core::logging;
use log::{error, info, warn};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Entry point for the Tokio runtime; logs failures before exit.
#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(err) = run().await {
        error!("agent exit: {err:?}");
        std::process::exit(1);
    }
}

/// Start the watch loop and drain request outcomes until shutdown.
async fn run() -> Result<()> {
    logging::init("info");
    let paths = AgentPaths::from_env();
    info!(
        "lockagent booting (requests: {}, device configs: {})",
        paths.ask_dir.display(),
        paths.dev_config_dir.display()
    );

    let server = AgentServer::bind(paths).context("failed to initialize ask-password watcher")?;

    let ctx = CancellationToken::new();
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let loop_handle = tokio::spawn(server.serve_requests(ctx.clone(), outcome_tx));

    loop {
        tokio::select! {
            maybe_outcome = outcome_rx.recv() => match maybe_outcome {
                Some(Err(err)) => warn!("request failed: {err}"),
                Some(Ok(())) => {}
                // All senders gone: the loop ended and every task drained.
                None => break,
            },
            _ = signal::ctrl_c() => {
                info!("received shutdown signal");
                ctx.cancel();
            }
        }
    }

    loop_handle.await.context("watch loop panicked")?;
    Ok(())
}
