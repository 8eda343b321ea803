#![forbid(unsafe_code)]

//! Core building blocks shared by lockagent binaries.
//!
//! Path configuration, device resolution, and the on-disk config model live
//! here so the protocol engine and provider crates can focus on their own
//! surfaces instead of reimplementing plumbing.

pub mod blockdev;
pub mod config;
pub mod devpath;
pub mod error;
pub mod logging;

pub use blockdev::BlockdevResolver;
pub use config::{
    AgentPaths, AzureVaultV1, ContentV1, ContentV1CertAuth, ContentV1Timeouts, CryptsetupLuks1V1,
    HcVaultV1, ProviderConfig, VolumeConfig,
};
pub use error::{LockagentError, LockagentResult};
