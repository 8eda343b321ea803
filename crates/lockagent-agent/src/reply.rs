//! Reply delivery over the ask-password datagram socket.

use lockagent_core::{LockagentError, LockagentResult};
use std::path::Path;
use tokio::net::UnixDatagram;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

/// Answer a password request with an accepted passphrase.
///
/// Writes `"+" + passphrase` to the connectionless socket named in the
/// request. The write races the cancellation token; if `ctx` fires first the
/// send is abandoned. Negative replies are not produced by this agent.
pub async fn send_passphrase(
    ctx: &CancellationToken,
    socket: &Path,
    passphrase: &str,
) -> LockagentResult<()> {
    if socket.as_os_str().is_empty() {
        return Err(LockagentError::InvalidInput(
            "missing socket address".into(),
        ));
    }
    if passphrase.is_empty() {
        return Err(LockagentError::InvalidInput("empty passphrase".into()));
    }
    if ctx.is_cancelled() {
        return Err(LockagentError::Cancelled);
    }

    let conn = UnixDatagram::unbound()?;
    let payload = Zeroizing::new(format!("+{passphrase}"));
    tokio::select! {
        sent = conn.send_to(payload.as_bytes(), socket) => {
            sent?;
            Ok(())
        }
        _ = ctx.cancelled() => Err(LockagentError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn delivers_positive_reply() {
        let dir = tempdir().unwrap();
        let sock_path = dir.path().join("s.sock");
        let receiver = UnixDatagram::bind(&sock_path).unwrap();

        let ctx = CancellationToken::new();
        send_passphrase(&ctx, &sock_path, "secret123")
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let len = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"+secret123");
    }

    #[tokio::test]
    async fn rejects_empty_inputs_before_io() {
        let ctx = CancellationToken::new();

        let err = send_passphrase(&ctx, Path::new(""), "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, LockagentError::InvalidInput(_)));

        // The socket path does not exist; validation must fire first.
        let err = send_passphrase(&ctx, Path::new("/nonexistent/s.sock"), "")
            .await
            .unwrap_err();
        assert!(matches!(err, LockagentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn cancelled_context_abandons_the_send() {
        let dir = tempdir().unwrap();
        let sock_path = dir.path().join("s.sock");
        let _receiver = UnixDatagram::bind(&sock_path).unwrap();

        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = send_passphrase(&ctx, &sock_path, "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, LockagentError::Cancelled));
    }
}
