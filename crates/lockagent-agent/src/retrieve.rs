//! Passphrase retrieval orchestration.
//!
//! Resolves a request id to its device config directory, constructs the
//! configured provider, and wraps retrieval in a fixed-interval retry loop.
//! This outer loop is deliberately independent of the content provider's own
//! exponential backoff: the inner layer absorbs transient network failures
//! within one logical call, the outer layer absorbs failures of the call as
//! a whole.

use lockagent_core::config::ProviderConfig;
use lockagent_core::{BlockdevResolver, LockagentError, LockagentResult};
use lockagent_provider::{Cleartext, PassProvider};
use log::warn;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const RETRIEVE_ATTEMPTS: u32 = 5;
const RETRIEVE_PAUSE: Duration = Duration::from_secs(4);

/// Retrieve the cleartext passphrase for a cryptsetup request id.
pub async fn get_passphrase(
    ctx: &CancellationToken,
    resolver: &BlockdevResolver,
    id: &str,
) -> LockagentResult<Cleartext> {
    if id.is_empty() {
        return Err(LockagentError::InvalidInput("empty request id".into()));
    }

    let conf_dir = resolver.resolve_config_dir(Path::new(id))?;
    let conf_path = conf_dir.join("0.json");
    let file = File::open(&conf_path)?;
    let cfg = ProviderConfig::from_reader(BufReader::new(file))?;
    let provider = lockagent_provider::from_provider_config(&cfg)?;

    retrieve_with_retry(ctx, provider.as_ref()).await
}

/// Call the provider up to five times, pausing 4s between failed attempts,
/// and return the final attempt's outcome.
pub(crate) async fn retrieve_with_retry(
    ctx: &CancellationToken,
    provider: &dyn PassProvider,
) -> LockagentResult<Cleartext> {
    let mut last = Err(LockagentError::InvalidInput("no retrieval attempted".into()));
    for attempt in 1..=RETRIEVE_ATTEMPTS {
        last = provider.get_cleartext(ctx, None).await;
        match &last {
            Ok(_) => return last,
            Err(err) => {
                warn!(
                    "unable to retrieve cleartext passphrase \
                     (attempt {attempt}/{RETRIEVE_ATTEMPTS}): {err}"
                );
                if attempt < RETRIEVE_ATTEMPTS {
                    tokio::select! {
                        _ = tokio::time::sleep(RETRIEVE_PAUSE) => {}
                        _ = ctx.cancelled() => return Err(LockagentError::Cancelled),
                    }
                }
            }
        }
    }
    last
}
