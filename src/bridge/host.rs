//! Host side of the gateway.
//!
//! The orchestrator binds the gateway, waits for a worker to register and
//! then calls the worker's methods through a [`RemoteObject`]. Retrying a
//! failed call is the host's business ([`with_retry`]); workers never retry.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{BridgeError, BridgeResult};
use super::protocol::{read_frame, write_frame, Frame};
use crate::error::{Error, Result};
use crate::harvest::CanonicalRecord;

/// Attempts made by [`with_retry`].
pub const RETRY_ATTEMPTS: u32 = 3;

/// Base delay between attempts; attempt `n` waits `n * RETRY_BACKOFF`.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Gateway endpoint owned by the host.
pub struct Gateway {
    listener: TcpListener,
    expected_interface: Option<String>,
}

impl Gateway {
    /// Bind the gateway. Use port 0 for an ephemeral port.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Gateway listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            expected_interface: None,
        })
    }

    /// Only accept workers registering under this interface name.
    pub fn expect_interface(mut self, interface: impl Into<String>) -> Self {
        self.expected_interface = Some(interface.into());
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait until a worker registers, or fail after `timeout`.
    ///
    /// Workers announcing the wrong interface are rejected and the wait
    /// continues.
    pub async fn accept_registration(&self, timeout: Duration) -> Result<RemoteObject> {
        tokio::time::timeout(timeout, self.accept_loop())
            .await
            .map_err(|_| {
                Error::Gateway(format!(
                    "no worker registered within {}s",
                    timeout.as_secs_f32()
                ))
            })?
    }

    async fn accept_loop(&self) -> Result<RemoteObject> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            let (interface, methods, callback) = match read_frame(&mut reader).await {
                Ok(Some(Frame::Register {
                    interface,
                    methods,
                    callback,
                })) => (interface, methods, callback),
                Ok(other) => {
                    warn!("Expected registration from {}, got {:?}", peer, other);
                    continue;
                }
                Err(e) => {
                    warn!("Bad registration from {}: {}", peer, e);
                    continue;
                }
            };

            if let Some(expected) = &self.expected_interface {
                if *expected != interface {
                    let reason = format!("expected interface {}, got {}", expected, interface);
                    warn!("Rejecting worker from {}: {}", peer, reason);
                    reject(&mut write_half, peer, reason).await;
                    continue;
                }
            }

            let callback: SocketAddr = match callback.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    let reason = format!("invalid callback address '{}': {}", callback, e);
                    warn!("Rejecting worker from {}: {}", peer, reason);
                    reject(&mut write_half, peer, reason).await;
                    continue;
                }
            };

            if let Err(e) = write_frame(&mut write_half, &Frame::Registered).await {
                warn!("Lost worker from {} while acknowledging: {}", peer, e);
                continue;
            }
            info!(
                "Worker registered {} ({}) with callback {}",
                interface,
                methods.join(", "),
                callback
            );

            return Ok(RemoteObject {
                interface,
                methods,
                callback,
                _registration: (reader, write_half),
                connection: Mutex::new(None),
                next_id: AtomicU64::new(1),
            });
        }
    }
}

/// Best effort: the peer may already be gone.
async fn reject(writer: &mut OwnedWriteHalf, peer: SocketAddr, reason: String) {
    if let Err(e) = write_frame(writer, &Frame::Rejected { reason }).await {
        debug!("Could not send rejection to {}: {}", peer, e);
    }
}

type CallConnection = (BufReader<OwnedReadHalf>, OwnedWriteHalf);

/// Host-side proxy for a registered callback object.
pub struct RemoteObject {
    interface: String,
    methods: Vec<String>,
    callback: SocketAddr,
    // Dropping this closes the worker's gateway connection.
    _registration: CallConnection,
    connection: Mutex<Option<CallConnection>>,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct PapersPayload {
    papers: Vec<CanonicalRecord>,
}

#[derive(Deserialize)]
struct VectorPayload {
    vector: Vec<f32>,
}

impl RemoteObject {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn callback_addr(&self) -> SocketAddr {
        self.callback
    }

    /// Invoke `method` and return its raw JSON string.
    ///
    /// Calls over one proxy are sequential; the callback connection is
    /// opened on first use and dropped after a transport failure.
    pub async fn call(&self, method: &str, args: Vec<JsonValue>) -> BridgeResult<String> {
        if !self.methods.iter().any(|m| m == method) {
            return Err(BridgeError::UnknownMethod(method.to_string()));
        }

        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            let stream = TcpStream::connect(self.callback).await?;
            stream.set_nodelay(true)?;
            let (read_half, write_half) = stream.into_split();
            *guard = Some((BufReader::new(read_half), write_half));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let outcome = match guard.as_mut() {
            Some((reader, writer)) => exchange(reader, writer, id, method, args).await,
            None => Err(BridgeError::Protocol("no callback connection".to_string())),
        };
        if matches!(
            outcome,
            Err(BridgeError::IoError(_)) | Err(BridgeError::Protocol(_))
        ) {
            *guard = None;
        }
        outcome
    }

    /// `getPapers` with the `{"papers": [...]}` payload parsed.
    pub async fn get_papers(&self, year_from: i64, year_to: i64) -> BridgeResult<Vec<CanonicalRecord>> {
        let json = self
            .call("getPapers", vec![year_from.into(), year_to.into()])
            .await?;
        debug!("Received JSON preview: {}", preview(&json));
        let payload: PapersPayload = serde_json::from_str(&json)?;
        Ok(payload.papers)
    }

    /// `getVector` with the `{"vector": [...]}` payload parsed.
    pub async fn get_vector(&self, text: &str) -> BridgeResult<Vec<f32>> {
        let json = self.call("getVector", vec![text.into()]).await?;
        debug!("Received JSON preview: {}", preview(&json));
        let payload: VectorPayload = serde_json::from_str(&json)?;
        Ok(payload.vector)
    }
}

async fn exchange(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    id: u64,
    method: &str,
    args: Vec<JsonValue>,
) -> BridgeResult<String> {
    let call = Frame::Call {
        id,
        method: method.to_string(),
        args,
    };
    write_frame(writer, &call).await?;

    match read_frame(reader).await? {
        Some(Frame::Return { id: got, value }) if got == id => Ok(value),
        Some(Frame::Error { id: got, message }) if got == id => Err(BridgeError::Remote {
            method: method.to_string(),
            message,
        }),
        Some(other) => Err(BridgeError::Protocol(format!(
            "unexpected reply to call {}: {:?}",
            id, other
        ))),
        None => Err(BridgeError::IoError(
            "worker closed the call connection".to_string(),
        )),
    }
}

/// Whitespace-collapsed, truncated payload for logs.
fn preview(json: &str) -> String {
    let collapsed = json.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > 200 {
        let head: String = collapsed.chars().take(200).collect();
        format!("{}...", head)
    } else {
        collapsed
    }
}

/// Run `op` up to [`RETRY_ATTEMPTS`] times with linear backoff.
pub async fn with_retry<T, F, Fut>(mut op: F) -> BridgeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BridgeResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < RETRY_ATTEMPTS => {
                warn!("Attempt {}/{} failed: {}", attempt, RETRY_ATTEMPTS, e);
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn test_with_retry_succeeds_on_third_attempt() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result = with_retry(move || async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(BridgeError::IoError("flaky".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_three_attempts() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result: BridgeResult<()> = with_retry(move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(BridgeError::IoError("down".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_preview_truncates_and_collapses() {
        assert_eq!(preview("{ \"a\":\n  1 }"), "{ \"a\": 1 }");
        let long = "x".repeat(500);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.len(), 203);
    }

    #[tokio::test]
    async fn test_vanished_peer_does_not_end_the_wait() {
        use tokio::io::AsyncWriteExt;

        let gateway = Gateway::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap()
            .expect_interface("good.Interface");
        let addr = gateway.local_addr().unwrap();

        let peers = async move {
            // Wrong interface, gone before the rejection is written.
            let mut stray = TcpStream::connect(addr).await.unwrap();
            let register = Frame::Register {
                interface: "other.Interface".to_string(),
                methods: vec![],
                callback: "127.0.0.1:1".to_string(),
            };
            write_frame(&mut stray, &register).await.unwrap();
            drop(stray);

            // A well-formed worker arrives afterwards.
            let mut worker = TcpStream::connect(addr).await.unwrap();
            let register = Frame::Register {
                interface: "good.Interface".to_string(),
                methods: vec!["getPapers".to_string()],
                callback: "127.0.0.1:2".to_string(),
            };
            write_frame(&mut worker, &register).await.unwrap();
            worker.flush().await.unwrap();
            worker
        };

        let (remote, _worker) =
            tokio::join!(gateway.accept_registration(Duration::from_secs(5)), peers);
        let remote = match remote {
            Ok(remote) => remote,
            Err(e) => panic!("registration should have succeeded: {}", e),
        };
        assert_eq!(remote.interface(), "good.Interface");
        assert_eq!(remote.callback_addr().port(), 2);
    }

    #[tokio::test]
    async fn test_registration_timeout() {
        let gateway = Gateway::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let err = match gateway.accept_registration(Duration::from_millis(50)).await {
            Ok(_) => panic!("nothing should have registered"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("no worker registered"));
    }
}
