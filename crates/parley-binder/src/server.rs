//! TCP server for the binder daemon.
//!
//! Mirrors the messenger's transport: line-framed JSON over TCP, a
//! protocol version on every request, graceful shutdown via
//! CancellationToken. Request handling is simple enough (two operations
//! against a RwLock table) to live inline in the connection task.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept and per-connection errors are logged, never fatal

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_protocol::{codes, BinderOp, BinderReply, BinderRequest, ProtocolVersion};

use crate::directory::{BinderError, Directory, ServiceEndpoint};

/// Default listen address for the binder
pub const DEFAULT_BINDER_ADDR: &str = "127.0.0.1:65431";

/// Maximum request size (1 MB)
const MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Read timeout for idle connections (5 minutes)
const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Write timeout (10 seconds)
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP server for the binder daemon.
pub struct BinderServer {
    /// Bound TCP listener
    listener: TcpListener,

    /// Shared service table
    directory: Directory,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for log correlation
    connection_counter: AtomicU64,
}

impl BinderServer {
    /// Binds the server to `addr`.
    pub async fn bind(
        addr: &str,
        directory: Directory,
        cancel_token: CancellationToken,
    ) -> Result<Self, BinderServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BinderServerError::Bind {
                addr: addr.to_string(),
                error: e.to_string(),
            })?;

        Ok(Self {
            listener,
            directory,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr, BinderServerError> {
        self.listener
            .local_addr()
            .map_err(|e| BinderServerError::Bind {
                addr: "local".to_string(),
                error: e.to_string(),
            })
    }

    /// Runs the server until the cancellation token is triggered.
    pub async fn run(&self) -> Result<(), BinderServerError> {
        match self.local_addr() {
            Ok(addr) => info!(addr = %addr, "Binder server listening"),
            Err(_) => info!("Binder server listening"),
        }

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Binder shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            debug!(peer = %peer, connection = conn_num, "Accepted connection");
                            self.handle_connection(stream, conn_num);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        info!("Binder stopped");
        Ok(())
    }

    /// Spawns a task serving one client connection.
    fn handle_connection(&self, stream: TcpStream, connection_number: u64) {
        let (reader, writer) = stream.into_split();
        let directory = self.directory.clone();

        tokio::spawn(async move {
            if let Err(e) = serve_connection(reader, writer, directory, connection_number).await {
                debug!(
                    connection = connection_number,
                    error = %e,
                    "Connection closed"
                );
            }
        });
    }
}

/// Request loop for one client connection.
async fn serve_connection(
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    directory: Directory,
    connection_number: u64,
) -> Result<(), BinderServerError> {
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    loop {
        let mut line = String::new();
        let bytes_read = match timeout(READ_TIMEOUT, reader.read_line(&mut line)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(BinderServerError::Io(e.to_string())),
            Err(_) => {
                debug!(connection = connection_number, "Connection timed out");
                return Ok(());
            }
        };

        if bytes_read == 0 {
            debug!(connection = connection_number, "Client sent EOF");
            return Ok(());
        }

        if line.len() > MAX_MESSAGE_SIZE {
            return Err(BinderServerError::Io(format!(
                "request too large: {} bytes",
                line.len()
            )));
        }

        let reply = match serde_json::from_str::<BinderRequest>(&line) {
            Ok(request) => {
                if request
                    .protocol_version
                    .is_compatible_with(&ProtocolVersion::CURRENT)
                {
                    dispatch(&directory, request.op).await
                } else {
                    warn!(
                        connection = connection_number,
                        client_version = %request.protocol_version,
                        "Protocol version mismatch"
                    );
                    BinderReply::error_with_code(
                        &format!(
                            "protocol version {} not compatible with server version {}",
                            request.protocol_version,
                            ProtocolVersion::CURRENT
                        ),
                        codes::BAD_REQUEST,
                    )
                }
            }
            Err(e) => {
                debug!(connection = connection_number, error = %e, "Malformed request");
                BinderReply::error_with_code(
                    &format!("malformed request: {e}"),
                    codes::BAD_REQUEST,
                )
            }
        };

        let json = serde_json::to_string(&reply)
            .map_err(|e| BinderServerError::Io(e.to_string()))?;

        let write_result = timeout(WRITE_TIMEOUT, async {
            writer.write_all(json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await;

        match write_result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BinderServerError::Io(e.to_string())),
            Err(_) => return Err(BinderServerError::Io("write timeout".to_string())),
        }
    }
}

/// Routes one operation to the directory.
async fn dispatch(directory: &Directory, op: BinderOp) -> BinderReply {
    match op {
        BinderOp::Register { name, host, port } => {
            let accepted = directory
                .register(name, ServiceEndpoint::new(host, port))
                .await;
            BinderReply::flag(accepted)
        }
        BinderOp::Lookup { name } => match directory.lookup(&name).await {
            Ok(address) => BinderReply::endpoint(address),
            Err(e @ BinderError::ServiceNotFound { .. }) => {
                BinderReply::error_with_code(&e.to_string(), codes::NOT_FOUND)
            }
        },
    }
}

/// Errors that can occur in binder server operations.
#[derive(Debug, thiserror::Error)]
pub enum BinderServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },

    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binder_addr() {
        assert_eq!(DEFAULT_BINDER_ADDR, "127.0.0.1:65431");
    }

    #[tokio::test]
    async fn test_dispatch_register_then_lookup() {
        let directory = Directory::new();

        let reply = dispatch(
            &directory,
            BinderOp::Register {
                name: "messenger".to_string(),
                host: "127.0.0.1".to_string(),
                port: 65432,
            },
        )
        .await;
        assert!(matches!(reply, BinderReply::Flag { value: true }));

        let reply = dispatch(
            &directory,
            BinderOp::Lookup {
                name: "messenger".to_string(),
            },
        )
        .await;
        assert!(matches!(
            reply,
            BinderReply::Endpoint { ref address } if address == "127.0.0.1:65432"
        ));
    }

    #[tokio::test]
    async fn test_dispatch_lookup_unknown_service() {
        let directory = Directory::new();

        let reply = dispatch(
            &directory,
            BinderOp::Lookup {
                name: "nowhere".to_string(),
            },
        )
        .await;
        assert!(matches!(
            reply,
            BinderReply::Error { code: Some(ref c), .. } if c == codes::NOT_FOUND
        ));
    }
}
