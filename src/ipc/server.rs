//! TCP server: accept loop and per-connection handler.
//!
//! Each connection runs a reader loop and a writer task joined by a bounded
//! queue. Request frames are dispatched on their own tasks; responses are
//! queued as they complete.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::gateway::jsonrpc::{self, JsonRpcResponse};
use crate::gateway::JsonRpcHandler;
use crate::ipc::codec::{read_frame, write_frame, Frame, FrameKind};
use crate::types::IpcConfig;

/// Framed TCP server in front of the JSON-RPC handler.
#[derive(Debug)]
pub struct IpcServer {
    rpc: Arc<JsonRpcHandler>,
    addr: SocketAddr,
    cancel: CancellationToken,
    ipc_config: IpcConfig,
}

impl IpcServer {
    pub fn new(rpc: Arc<JsonRpcHandler>, addr: SocketAddr, ipc_config: IpcConfig) -> Self {
        Self {
            rpc,
            addr,
            cancel: CancellationToken::new(),
            ipc_config,
        }
    }

    /// Share a shutdown token with the rest of the process.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Bind the configured address and serve until cancelled.
    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_listener(listener).await
    }

    /// Serve on an already bound listener until cancelled or accept fails.
    pub async fn serve_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        let conn_semaphore = Arc::new(Semaphore::new(self.ipc_config.max_connections));
        tracing::info!(
            "IPC server listening on {} (max_connections={})",
            listener.local_addr()?,
            self.ipc_config.max_connections,
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("IPC server shutting down");
                    break;
                }
                accept = listener.accept() => {
                    let (stream, peer) = accept?;

                    let permit = match conn_semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(
                                "Connection from {} rejected: at max_connections ({})",
                                peer,
                                self.ipc_config.max_connections,
                            );
                            drop(stream);
                            continue;
                        }
                    };

                    tracing::debug!("IPC connection from {} (active={})",
                        peer,
                        self.ipc_config.max_connections - conn_semaphore.available_permits(),
                    );
                    let rpc = self.rpc.clone();
                    let cancel = self.cancel.child_token();
                    let ipc_config = self.ipc_config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, rpc, cancel, ipc_config, permit).await {
                            tracing::warn!("Connection from {} error: {}", peer, e);
                        }
                        tracing::debug!("IPC connection from {} closed", peer);
                    });
                }
            }
        }
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Read frames, dispatch each on its own task, and let the writer task send
/// responses in completion order.
async fn handle_connection(
    stream: TcpStream,
    rpc: Arc<JsonRpcHandler>,
    cancel: CancellationToken,
    ipc_config: IpcConfig,
    _permit: OwnedSemaphorePermit, // held for connection lifetime
) -> std::io::Result<()> {
    let (mut reader, writer) = stream.into_split();
    let read_timeout = Duration::from_secs(ipc_config.read_timeout_secs);
    let write_timeout = Duration::from_secs(ipc_config.write_timeout_secs);

    let (tx, rx) = mpsc::channel::<Frame>(ipc_config.outbound_capacity.max(1));
    let writer_task = tokio::spawn(write_loop(writer, rx, write_timeout, cancel.clone()));

    let read_result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            frame_result = tokio::time::timeout(read_timeout, read_frame(&mut reader, ipc_config.max_frame_bytes)) => {
                let frame = match frame_result {
                    Err(_elapsed) => {
                        tracing::debug!("Read timeout ({}s), dropping connection", ipc_config.read_timeout_secs);
                        break Ok(());
                    }
                    Ok(Err(e)) => break Err(e),
                    Ok(Ok(None)) => break Ok(()), // clean EOF
                    Ok(Ok(Some(frame))) => frame,
                };

                if frame.kind != FrameKind::Request {
                    tracing::debug!("Unexpected frame type 0x{:02X}", u8::from(frame.kind));
                    let reply = Frame::error(jsonrpc::encode(&JsonRpcResponse::parse_error()));
                    if tx.send(reply).await.is_err() {
                        break Ok(());
                    }
                    continue;
                }

                let rpc = rpc.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let response = rpc.handle_frame(&frame.text()).await;
                    let _ = tx.send(Frame::response(response)).await;
                });
            }
        }
    };

    // Queued and in-flight responses are still delivered after the reader stops.
    drop(tx);
    let write_result = writer_task
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    read_result?;
    write_result
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Frame>,
    write_timeout: Duration,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = timed_write(&mut writer, &frame, write_timeout).await {
            // Stop the reader; nothing more can be delivered.
            cancel.cancel();
            return Err(e);
        }
    }
    Ok(())
}

/// Write a frame with a timeout so a slow consumer cannot hold the
/// connection indefinitely.
async fn timed_write<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    frame: &Frame,
    timeout: Duration,
) -> std::io::Result<()> {
    tokio::time::timeout(timeout, write_frame(writer, frame))
        .await
        .map_err(|_| {
            tracing::warn!("Write timeout ({}s), dropping connection", timeout.as_secs());
            std::io::Error::new(std::io::ErrorKind::TimedOut, "write timeout")
        })?
}
