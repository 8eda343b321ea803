//! Watch loop over the ask-password request directory.
//!
//! One concurrent task per discovered request, no ordering across requests,
//! and a single many-producer outcome channel drained by the caller. The
//! channel is unbounded so tasks can never block on error reporting.

use crate::reply::send_passphrase;
use crate::request::{cryptsetup_id, parse_request};
use crate::retrieve::get_passphrase;
use lockagent_core::config::AgentPaths;
use lockagent_core::{BlockdevResolver, LockagentError, LockagentResult};
use log::debug;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const REQUEST_PREFIX: &str = "ask.";

/// Outcome channel shared by all per-request tasks. `Ok(())` means either
/// "handled" or "not addressed to this agent".
pub type OutcomeSender = mpsc::UnboundedSender<LockagentResult<()>>;

/// Password agent bound to one ask-password directory.
#[derive(Debug)]
pub struct AgentServer {
    paths: AgentPaths,
    // Dropping the watcher stops event delivery, so it lives as long as the
    // server even though only the receiver is polled.
    _watcher: RecommendedWatcher,
    events_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
}

impl AgentServer {
    /// Start watching the request directory named in `paths`.
    pub fn bind(paths: AgentPaths) -> LockagentResult<Self> {
        if paths.ask_dir.as_os_str().is_empty() {
            return Err(LockagentError::InvalidInput(
                "empty ask-password directory".into(),
            ));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |event| {
                let _ = events_tx.send(event);
            },
            notify::Config::default(),
        )
        .map_err(watch_error)?;
        watcher
            .watch(&paths.ask_dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        Ok(Self {
            paths,
            _watcher: watcher,
            events_rx,
        })
    }

    /// Process password requests until cancelled.
    ///
    /// Pre-existing request files are backfilled first, then every creation
    /// event under the watched directory schedules one task. Watcher errors
    /// are forwarded on the outcome channel without stopping the loop;
    /// cancellation is surfaced as the loop's terminal outcome.
    pub async fn serve_requests(mut self, ctx: CancellationToken, outcomes: OutcomeSender) {
        match fs::read_dir(&self.paths.ask_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if is_request_path(&path) {
                        spawn_request(ctx.clone(), self.paths.clone(), path, outcomes.clone());
                    }
                }
            }
            Err(err) => {
                let _ = outcomes.send(Err(err.into()));
                return;
            }
        }

        loop {
            tokio::select! {
                maybe_event = self.events_rx.recv() => match maybe_event {
                    Some(Ok(event)) => {
                        if !is_arrival(&event.kind) {
                            continue;
                        }
                        for path in event.paths {
                            if is_request_path(&path) {
                                spawn_request(
                                    ctx.clone(),
                                    self.paths.clone(),
                                    path,
                                    outcomes.clone(),
                                );
                            }
                        }
                    }
                    Some(Err(err)) => {
                        let _ = outcomes.send(Err(watch_error(err)));
                    }
                    None => {
                        let _ = outcomes.send(Err(LockagentError::Io(io::Error::other(
                            "filesystem watcher stopped unexpectedly",
                        ))));
                        return;
                    }
                },
                _ = ctx.cancelled() => {
                    let _ = outcomes.send(Err(LockagentError::Cancelled));
                    return;
                }
            }
        }
    }
}

/// Handle a single password request file from parse to acknowledgment.
///
/// The request file is removed only after the reply was delivered; any
/// earlier failure leaves it in place for a later restart to pick up.
pub async fn process_request(
    ctx: &CancellationToken,
    paths: &AgentPaths,
    path: &Path,
) -> LockagentResult<()> {
    let file = File::open(path)?;
    let fields = parse_request(BufReader::new(file))?;

    let socket = fields
        .get("Socket")
        .ok_or_else(|| LockagentError::InvalidInput("missing 'Socket' field".into()))?;

    let Some(id) = cryptsetup_id(&fields) else {
        debug!("request {} is not a cryptsetup ask, skipping", path.display());
        return Ok(());
    };

    let resolver = BlockdevResolver::new(paths);
    let passphrase = get_passphrase(ctx, &resolver, id).await?;
    send_passphrase(ctx, Path::new(socket), &passphrase).await?;

    // Removing the file is the only acknowledgment systemd sees.
    fs::remove_file(path)?;
    Ok(())
}

fn spawn_request(
    ctx: CancellationToken,
    paths: AgentPaths,
    path: PathBuf,
    outcomes: OutcomeSender,
) {
    tokio::spawn(async move {
        let outcome = process_request(&ctx, &paths, &path).await;
        let _ = outcomes.send(outcome);
    });
}

/// systemd publishes a request by renaming a temp file into place; inotify
/// reports that as moved-to, not create, so both count as arrivals.
fn is_arrival(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}

fn is_request_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(REQUEST_PREFIX))
        .unwrap_or(false)
}

fn watch_error(err: notify::Error) -> LockagentError {
    LockagentError::Io(io::Error::other(err))
}
