//! Binder registration at startup.
//!
//! The daemon announces its listen endpoint to the binder under a logical
//! service name so clients can resolve it by name. Registration failure is
//! not fatal; the caller logs a warning and keeps serving direct
//! connections.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::info;

use parley_protocol::{BinderReply, BinderRequest};

/// Logical name the messenger registers under.
pub const MESSENGER_SERVICE: &str = "messenger";

/// Overall timeout for the announce round trip
const ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Registers `service` as reachable at `host:port` with the binder.
///
/// # Errors
///
/// - `AnnounceError::Timeout` if the binder does not answer in time
/// - `AnnounceError::Io` on connect or transfer failure
/// - `AnnounceError::BadReply` if the binder answers with something
///   other than a successful flag
pub async fn announce(
    binder_addr: &str,
    service: &str,
    host: &str,
    port: u16,
) -> Result<(), AnnounceError> {
    timeout(ANNOUNCE_TIMEOUT, announce_inner(binder_addr, service, host, port))
        .await
        .map_err(|_| AnnounceError::Timeout)?
}

async fn announce_inner(
    binder_addr: &str,
    service: &str,
    host: &str,
    port: u16,
) -> Result<(), AnnounceError> {
    let stream = TcpStream::connect(binder_addr)
        .await
        .map_err(|e| AnnounceError::Io(e.to_string()))?;
    let (read_half, mut write_half) = stream.into_split();

    let request = BinderRequest::register(service, host, port);
    let json = serde_json::to_string(&request).map_err(|e| AnnounceError::Io(e.to_string()))?;

    write_half
        .write_all(json.as_bytes())
        .await
        .map_err(|e| AnnounceError::Io(e.to_string()))?;
    write_half
        .write_all(b"\n")
        .await
        .map_err(|e| AnnounceError::Io(e.to_string()))?;

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    let bytes_read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| AnnounceError::Io(e.to_string()))?;

    if bytes_read == 0 {
        return Err(AnnounceError::Io("binder closed connection".to_string()));
    }

    let reply: BinderReply =
        serde_json::from_str(&line).map_err(|e| AnnounceError::BadReply(e.to_string()))?;

    match reply {
        BinderReply::Flag { value: true } => {
            info!(
                binder = binder_addr,
                service = service,
                endpoint = %format!("{host}:{port}"),
                "Registered with binder"
            );
            Ok(())
        }
        BinderReply::Flag { value: false } => {
            Err(AnnounceError::BadReply("registration refused".to_string()))
        }
        BinderReply::Error { message, .. } => Err(AnnounceError::BadReply(message)),
        BinderReply::Endpoint { .. } => {
            Err(AnnounceError::BadReply("unexpected endpoint reply".to_string()))
        }
    }
}

/// Errors that can occur while registering with the binder.
#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("Binder did not answer within {}s", ANNOUNCE_TIMEOUT.as_secs())]
    Timeout,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Unexpected binder reply: {0}")]
    BadReply(String),
}
