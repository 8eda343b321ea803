//! On-disk configuration model for volumes and passphrase providers.
//!
//! Both documents are adjacently tagged unions (`{kind, value}`); the `kind`
//! discriminator is decoded first and selects the value shape. An unknown
//! discriminator or a value that does not match its declared kind is a hard
//! decode error, never a silent fallback to another variant.

use crate::error::{LockagentError, LockagentResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::env;
use std::io::Read;
use std::path::PathBuf;

/// Directory where systemd materialises pending ask-password requests.
pub const DEFAULT_ASK_DIR: &str = "/run/systemd/ask-password";
/// Kernel-maintained directory of `<major>:<minor>` block device nodes.
pub const DEFAULT_DEV_BLOCK_DIR: &str = "/dev/block";
/// Base directory holding one config subdirectory per managed device.
pub const DEFAULT_DEV_CONFIG_DIR: &str = "/boot/etc/lockagent/dev";

const ASK_DIR_ENV: &str = "LOCKAGENT_ASK_DIR";
const DEV_BLOCK_DIR_ENV: &str = "LOCKAGENT_DEV_BLOCK_DIR";
const DEV_CONFIG_DIR_ENV: &str = "LOCKAGENT_DEV_CONFIG_DIR";

/// Filesystem locations the engine operates on.
///
/// The fixed system paths are defaults only; constructors take this struct so
/// tests and non-standard layouts never touch the real directories.
#[derive(Debug, Clone)]
pub struct AgentPaths {
    /// Watched directory containing `ask.*` request files.
    pub ask_dir: PathBuf,
    /// Block-device identity directory (`/dev/block`).
    pub dev_block_dir: PathBuf,
    /// Per-device configuration base directory.
    pub dev_config_dir: PathBuf,
}

impl Default for AgentPaths {
    fn default() -> Self {
        Self {
            ask_dir: PathBuf::from(DEFAULT_ASK_DIR),
            dev_block_dir: PathBuf::from(DEFAULT_DEV_BLOCK_DIR),
            dev_config_dir: PathBuf::from(DEFAULT_DEV_CONFIG_DIR),
        }
    }
}

impl AgentPaths {
    /// Build paths from the environment, falling back to the system defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ask_dir: env_path(ASK_DIR_ENV).unwrap_or(defaults.ask_dir),
            dev_block_dir: env_path(DEV_BLOCK_DIR_ENV).unwrap_or(defaults.dev_block_dir),
            dev_config_dir: env_path(DEV_CONFIG_DIR_ENV).unwrap_or(defaults.dev_config_dir),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Per-volume configuration stored as `volume.json` in a device directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value")]
pub enum VolumeConfig {
    #[serde(rename = "CryptsetupLUKS1V1")]
    CryptsetupLuks1V1(CryptsetupLuks1V1),
}

impl VolumeConfig {
    /// Decode a volume document, mapping any decode failure to `InvalidConfig`.
    pub fn from_reader<R: Read>(reader: R) -> LockagentResult<Self> {
        serde_json::from_reader(reader)
            .map_err(|err| LockagentError::InvalidConfig(format!("volume config: {err}")))
    }
}

/// A cryptsetup-LUKS1 volume (v1 schema).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CryptsetupLuks1V1 {
    pub name: String,
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_discard: Option<bool>,
}

/// Per-device provider configuration stored as `0.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value")]
pub enum ProviderConfig {
    ContentV1(ContentV1),
    AzureVaultV1(AzureVaultV1),
    HcVaultV1(HcVaultV1),
}

impl ProviderConfig {
    /// Decode a provider document, mapping any decode failure to `InvalidConfig`.
    pub fn from_reader<R: Read>(reader: R) -> LockagentResult<Self> {
        serde_json::from_reader(reader)
            .map_err(|err| LockagentError::InvalidConfig(format!("provider config: {err}")))
    }
}

/// Generic remote content provider (v1 schema).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentV1 {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<ContentV1Timeouts>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate_authorities: Vec<ContentV1CertAuth>,
}

/// HTTPS client timeouts, in seconds. A zero value disables that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentV1Timeouts {
    pub http_response_headers: u64,
    pub http_total: u64,
}

/// Reference to a custom certificate authority trusted for content fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContentV1CertAuth {
    pub authority: String,
}

/// Azure Vault provider (v1 schema).
///
/// The shape decodes so provisioning data survives round-trips, but retrieval
/// through this kind is not built yet and the registry rejects it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureVaultV1 {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub encryption_algorithm: String,
    pub key_name: String,
    pub key_version: String,
    pub ciphertext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_auth: Option<AzureVaultV1PasswordAuth>,
}

/// Password authentication stanza for `AzureVaultV1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AzureVaultV1PasswordAuth {
    #[serde(rename = "appID")]
    pub app_id: String,
    pub password: String,
}

/// HashiCorp Vault provider placeholder; the v1 schema is not settled yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HcVaultV1 {}
