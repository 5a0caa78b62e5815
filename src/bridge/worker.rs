//! Worker side of the gateway.
//!
//! A [`WorkerBridge`] starts out idle. [`WorkerBridge::register`] binds the
//! callback listener, connects to the host's gateway and announces the
//! callback object, yielding a [`ServingBridge`]. Serving never ends on its
//! own: it runs until the process is terminated or the host drops the
//! gateway connection, which is reported as an error so the process can
//! exit and be restarted externally.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::callback::CallbackObject;
use super::method::CallContext;
use super::protocol::{read_frame, write_frame, Frame};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};

/// Idle bridge: configured but not yet registered.
pub struct WorkerBridge {
    config: GatewayConfig,
    callback: Arc<CallbackObject>,
}

impl WorkerBridge {
    pub fn new(config: GatewayConfig, callback: CallbackObject) -> Self {
        Self {
            config,
            callback: Arc::new(callback),
        }
    }

    /// Idle → Serving.
    ///
    /// Fails if the callback listener cannot be bound, the gateway is
    /// unreachable within the connect timeout, or the host rejects the
    /// registration.
    pub async fn register(self) -> Result<ServingBridge> {
        let listener = TcpListener::bind(self.config.callback_addr()?).await?;
        let callback_addr = listener.local_addr()?;
        info!("Callback listener bound on {}", callback_addr);

        let gateway_addr = self.config.gateway_addr()?;
        let stream = tokio::time::timeout(
            self.config.connect_timeout(),
            TcpStream::connect(gateway_addr),
        )
        .await
        .map_err(|_| Error::Gateway(format!("timed out connecting to {}", gateway_addr)))?
        .map_err(|e| Error::Gateway(format!("cannot reach {}: {}", gateway_addr, e)))?;
        stream.set_nodelay(true)?;

        let (read_half, mut write_half) = stream.into_split();
        let mut gateway = BufReader::new(read_half);

        let register = Frame::Register {
            interface: self.callback.interface().to_string(),
            methods: self.callback.method_names(),
            callback: callback_addr.to_string(),
        };
        write_frame(&mut write_half, &register).await?;

        match read_frame(&mut gateway).await? {
            Some(Frame::Registered) => {}
            Some(Frame::Rejected { reason }) => {
                return Err(Error::Gateway(format!("registration rejected: {}", reason)))
            }
            Some(other) => {
                return Err(Error::Gateway(format!(
                    "unexpected reply to registration: {:?}",
                    other
                )))
            }
            None => {
                return Err(Error::Gateway(
                    "gateway closed during registration".to_string(),
                ))
            }
        }

        info!(
            "Registered {} ({}) with gateway {}",
            self.callback.interface(),
            self.callback.method_names().join(", "),
            gateway_addr
        );

        Ok(ServingBridge {
            listener,
            callback_addr,
            gateway,
            _gateway_writer: write_half,
            callback: self.callback,
            dispatch_lock: Arc::new(Mutex::new(())),
        })
    }
}

/// Registered bridge, ready to accept calls.
pub struct ServingBridge {
    listener: TcpListener,
    callback_addr: SocketAddr,
    gateway: BufReader<OwnedReadHalf>,
    // Held so the gateway connection stays open while serving.
    _gateway_writer: OwnedWriteHalf,
    callback: Arc<CallbackObject>,
    dispatch_lock: Arc<Mutex<()>>,
}

impl ServingBridge {
    /// Address the host connects to for calls.
    pub fn callback_addr(&self) -> SocketAddr {
        self.callback_addr
    }

    /// Accept and dispatch calls until the gateway connection drops.
    pub async fn serve(mut self) -> Result<()> {
        info!("Waiting for calls on {}", self.callback_addr);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!("Host connected from {}", peer);
                    let callback = self.callback.clone();
                    let lock = self.dispatch_lock.clone();
                    tokio::spawn(async move {
                        let (read_half, write_half) = stream.into_split();
                        if let Err(e) = handle_connection(read_half, write_half, callback, lock).await {
                            warn!("Call connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
                frame = read_frame(&mut self.gateway) => {
                    match frame {
                        Ok(None) => {
                            error!("Gateway connection closed");
                            return Err(Error::GatewayClosed);
                        }
                        Ok(Some(frame)) => debug!("Ignoring gateway frame: {:?}", frame),
                        Err(e) => {
                            error!("Gateway connection failed: {}", e);
                            return Err(Error::GatewayClosed);
                        }
                    }
                }
            }
        }
    }
}

/// Serve one host connection: calls are answered in the order received.
async fn handle_connection<R, W>(
    reader: R,
    mut writer: W,
    callback: Arc<CallbackObject>,
    dispatch_lock: Arc<Mutex<()>>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    while let Some(frame) = read_frame(&mut reader).await? {
        let reply = match frame {
            Frame::Call { id, method, args } => {
                let ctx = CallContext::new(id);
                info!(call_id = id, request_id = %ctx.request_id, "Call {}", method);
                let result = {
                    let _guard = dispatch_lock.lock().await;
                    callback.dispatch(&ctx, &method, args).await
                };
                match result {
                    Ok(value) => Frame::Return { id, value },
                    Err(e) => Frame::Error {
                        id,
                        message: e.to_string(),
                    },
                }
            }
            other => {
                warn!("Unexpected frame on call connection: {:?}", other);
                continue;
            }
        };
        write_frame(&mut writer, &reply).await?;
    }
    Ok(())
}
