#![forbid(unsafe_code)]

//! Passphrase provider contracts shared across lockagent.
//!
//! Consumers work against the [`PassProvider`] trait and the registry
//! dispatch in [`from_provider_config`] without depending on any concrete
//! backend. Only the remote-content backend is built today; the vault kinds
//! are recognized but rejected explicitly so a misprovisioned device fails
//! loudly instead of silently doing nothing.

pub mod content;

pub use content::ContentProvider;

use async_trait::async_trait;
use lockagent_core::config::ProviderConfig;
use lockagent_core::{LockagentError, LockagentResult};
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

/// Cleartext passphrase material, wiped on drop.
pub type Cleartext = Zeroizing<String>;

/// Optional per-call knobs for remote operations.
#[derive(Debug, Clone, Default)]
pub struct RemoteOptions {
    /// Extra headers attached to remote requests, replacing (not appending
    /// to) any default header with the same name.
    pub headers: HeaderMap,
}

/// A pluggable backend capable of producing a cleartext passphrase.
///
/// Retrieval may entail network I/O and must honor cancellation from `ctx`.
/// Backends that cannot wrap an external cleartext fail `encrypt` immediately
/// rather than blocking.
#[async_trait]
pub trait PassProvider: Send + Sync {
    /// Return the cleartext passphrase for a volume.
    async fn get_cleartext(
        &self,
        ctx: &CancellationToken,
        opts: Option<&RemoteOptions>,
    ) -> LockagentResult<Cleartext>;

    /// Wrap an externally supplied cleartext into this provider's ciphertext.
    async fn encrypt(
        &self,
        ctx: &CancellationToken,
        opts: Option<&RemoteOptions>,
        cleartext: &str,
    ) -> LockagentResult<Cleartext>;

    /// Whether [`PassProvider::encrypt`] can succeed for this backend.
    fn can_encrypt(&self) -> bool;

    /// Store an externally supplied ciphertext for later serialization.
    /// Backends with nothing to persist accept and ignore it.
    fn set_ciphertext(&mut self, ciphertext: String);

    /// Serialize the current provider state back to its config form.
    fn to_provider_config(&self) -> LockagentResult<ProviderConfig>;
}

/// Construct a provider from a decoded configuration document.
///
/// Unknown kinds never reach this point: the decode layer already rejects
/// them with `InvalidConfig`. Recognized-but-unbuilt kinds are distinct and
/// fail with `Unimplemented`.
pub fn from_provider_config(cfg: &ProviderConfig) -> LockagentResult<Box<dyn PassProvider>> {
    match cfg {
        ProviderConfig::ContentV1(value) => Ok(Box::new(ContentProvider::from_config(value))),
        ProviderConfig::AzureVaultV1(_) => {
            Err(LockagentError::Unimplemented("azure-vault".into()))
        }
        ProviderConfig::HcVaultV1(_) => Err(LockagentError::Unimplemented("hc-vault".into())),
    }
}
