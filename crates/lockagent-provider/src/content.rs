//! Remote-content passphrase provider.
//!
//! Fetches the cleartext from an HTTPS source, absorbing transient transport
//! failures and 5xx responses with capped exponential backoff. Any other
//! terminal status is returned immediately; the caller's cancellation token
//! and the configured total timeout are the only bounds on retrying.

use crate::{Cleartext, PassProvider, RemoteOptions};
use async_trait::async_trait;
use lockagent_core::config::{ContentV1, ContentV1CertAuth, ContentV1Timeouts, ProviderConfig};
use lockagent_core::{LockagentError, LockagentResult};
use log::warn;
use reqwest::header::HeaderMap;
use reqwest::{Certificate, Client, StatusCode};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Provider that retrieves the cleartext passphrase over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct ContentProvider {
    source: String,
    /// Per-attempt budget for receiving response headers, in seconds. Zero
    /// disables the bound.
    response_headers_timeout: u64,
    /// Overall budget for one retrieval, in seconds. Zero disables the bound.
    total_timeout: u64,
    cert_authorities: Vec<String>,
}

/// Outcome of a single fetch attempt.
enum Attempt {
    Body(Cleartext),
    /// 5xx status, worth retrying.
    ServerError(u16),
    /// Anything else that is not a 200; returned to the caller as-is.
    Terminal(u16),
}

impl ContentProvider {
    /// Build a provider from a decoded `ContentV1` value, dropping empty
    /// certificate-authority entries.
    pub fn from_config(value: &ContentV1) -> Self {
        let mut provider = Self::new(value.source.clone());
        if let Some(timeouts) = &value.timeouts {
            provider.total_timeout = timeouts.http_total;
            provider.response_headers_timeout = timeouts.http_response_headers;
        }
        provider.cert_authorities = value
            .certificate_authorities
            .iter()
            .map(|ca| ca.authority.clone())
            .filter(|authority| !authority.is_empty())
            .collect();
        provider
    }

    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Build the HTTP client; connect timeout covers TCP plus TLS handshake.
    fn build_client(&self) -> LockagentResult<Client> {
        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(KEEPALIVE_INTERVAL)
            .hickory_dns(true);

        for authority in &self.cert_authorities {
            let pem = std::fs::read(authority)?;
            // The rustls backend accepts arbitrary bytes in from_pem, so the
            // bundle is parsed first and must yield at least one certificate.
            let parsed: Vec<_> = rustls_pemfile::certs(&mut pem.as_slice())
                .collect::<Result<_, _>>()
                .map_err(|err| {
                    LockagentError::InvalidConfig(format!(
                        "certificate authority {authority}: {err}"
                    ))
                })?;
            if parsed.is_empty() {
                return Err(LockagentError::InvalidConfig(format!(
                    "certificate authority {authority}: no certificates found"
                )));
            }
            let cert = Certificate::from_pem(&pem).map_err(|err| {
                LockagentError::InvalidConfig(format!(
                    "certificate authority {authority}: {err}"
                ))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|err| LockagentError::Network(err.to_string()))
    }

    async fn attempt(&self, client: &Client, headers: &HeaderMap) -> LockagentResult<Attempt> {
        // RequestBuilder::headers replaces same-named defaults instead of
        // appending to them.
        let send = client.get(&self.source).headers(headers.clone()).send();
        let response = match self.response_headers_timeout {
            0 => send.await,
            secs => match tokio::time::timeout(Duration::from_secs(secs), send).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(LockagentError::Network(format!(
                        "no response headers from {} within {secs}s",
                        self.source
                    )))
                }
            },
        }
        .map_err(|err| LockagentError::Network(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Ok(Attempt::ServerError(status.as_u16()));
        }
        if status != StatusCode::OK {
            return Ok(Attempt::Terminal(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|err| LockagentError::Network(err.to_string()))?;
        Ok(Attempt::Body(Zeroizing::new(body)))
    }

    /// Retry loop around [`ContentProvider::attempt`]: transport failures and
    /// 5xx responses back off starting at 100ms, doubling up to 5s, with no
    /// attempt limit short of the deadline or cancellation.
    async fn fetch(
        &self,
        ctx: &CancellationToken,
        client: &Client,
        headers: &HeaderMap,
    ) -> LockagentResult<Cleartext> {
        let deadline = match self.total_timeout {
            0 => None,
            secs => Some(Instant::now() + Duration::from_secs(secs)),
        };

        let mut backoff = INITIAL_BACKOFF;
        loop {
            let outcome = tokio::select! {
                outcome = self.attempt(client, headers) => outcome,
                _ = ctx.cancelled() => return Err(LockagentError::Cancelled),
                _ = deadline_elapsed(deadline) => return Err(self.deadline_error()),
            };

            match outcome {
                Ok(Attempt::Body(body)) => return Ok(body),
                Ok(Attempt::Terminal(code)) => return Err(LockagentError::HttpStatus(code)),
                Ok(Attempt::ServerError(code)) => {
                    warn!("server error {code} fetching {}, backing off", self.source);
                }
                Err(err) => {
                    warn!("transport error fetching {}: {err}", self.source);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = ctx.cancelled() => return Err(LockagentError::Cancelled),
                _ = deadline_elapsed(deadline) => return Err(self.deadline_error()),
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    fn deadline_error(&self) -> LockagentError {
        LockagentError::Timeout(format!("unable to fetch {} in time", self.source))
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl PassProvider for ContentProvider {
    async fn get_cleartext(
        &self,
        ctx: &CancellationToken,
        opts: Option<&RemoteOptions>,
    ) -> LockagentResult<Cleartext> {
        if self.source.is_empty() {
            return Err(LockagentError::InvalidInput("missing source URL".into()));
        }

        let client = self.build_client()?;
        let headers = opts.map(|opts| opts.headers.clone()).unwrap_or_default();
        self.fetch(ctx, &client, &headers).await
    }

    async fn encrypt(
        &self,
        _ctx: &CancellationToken,
        _opts: Option<&RemoteOptions>,
        _cleartext: &str,
    ) -> LockagentResult<Cleartext> {
        Err(LockagentError::Unimplemented(
            "content provider does not support encryption".into(),
        ))
    }

    fn can_encrypt(&self) -> bool {
        false
    }

    fn set_ciphertext(&mut self, _ciphertext: String) {
        // Nothing to persist locally for remote content.
    }

    fn to_provider_config(&self) -> LockagentResult<ProviderConfig> {
        if self.source.is_empty() {
            return Err(LockagentError::InvalidConfig("empty source".into()));
        }

        Ok(ProviderConfig::ContentV1(ContentV1 {
            source: self.source.clone(),
            timeouts: Some(ContentV1Timeouts {
                http_response_headers: self.response_headers_timeout,
                http_total: self.total_timeout,
            }),
            certificate_authorities: self
                .cert_authorities
                .iter()
                .map(|authority| ContentV1CertAuth {
                    authority: authority.clone(),
                })
                .collect(),
        }))
    }
}
