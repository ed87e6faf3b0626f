//! Common test utilities and helpers

use camo_prefix::prefix::{AbsorbPolicy, PrefixAbsorber, PrefixMaker};
use camo_prefix::transport::{PlainCipher, PrefixDialer, PrefixListener, UpstreamGenerator};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Upstream base used by every test dialer
pub const TEST_UPSTREAM: &str = "local";

/// Bind a plain listener on an ephemeral port
#[allow(dead_code)]
pub async fn create_test_listener(policy: AbsorbPolicy) -> anyhow::Result<PrefixListener<PlainCipher>> {
    let absorber = PrefixAbsorber::new(policy).with_timeout(Duration::from_millis(500));
    Ok(PrefixListener::bind("127.0.0.1:0", absorber, PlainCipher).await?)
}

/// Create a plain dialer pointing at `listener`
#[allow(dead_code)]
pub fn create_test_dialer(
    listener: &PrefixListener<PlainCipher>,
    prefix: PrefixMaker,
) -> anyhow::Result<PrefixDialer<PlainCipher>> {
    Ok(PrefixDialer::new(
        listener.local_addr().to_string(),
        prefix,
        UpstreamGenerator::new(TEST_UPSTREAM)?,
        PlainCipher,
    ))
}

/// Echo every accepted connection back to its sender.
/// Each accepted target is reported on the returned channel.
#[allow(dead_code)]
pub fn spawn_echo(
    mut listener: PrefixListener<PlainCipher>,
) -> (tokio::sync::mpsc::UnboundedReceiver<String>, JoinHandle<()>) {
    let (targets_tx, targets_rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        while let Ok((mut conn, _peer)) = listener.accept().await {
            let _ = targets_tx.send(conn.get_ref().target().to_string());
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match conn.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            if conn.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
            });
        }
    });
    (targets_rx, handle)
}

/// Dial once, send `payload`, and read the same number of bytes back
#[allow(dead_code)]
pub async fn echo_once(dialer: &PrefixDialer<PlainCipher>, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut conn = dialer.dial().await?;
    conn.write_all(payload).await?;
    let mut buf = vec![0u8; payload.len()];
    tokio::time::timeout(Duration::from_secs(5), conn.read_exact(&mut buf)).await??;
    Ok(buf)
}
