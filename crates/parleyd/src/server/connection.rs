//! Connection handler for individual chat clients.
//!
//! Each client connection gets its own `ConnectionHandler` that:
//! - Reads line-framed JSON requests
//! - Validates the protocol version on every request
//! - Routes operations to the broker
//! - Writes one reply line per request
//!
//! Malformed requests and version mismatches get an error reply and the
//! connection stays open; I/O failures and timeouts close it.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Connection errors are logged and result in graceful disconnect

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tracing::{debug, warn};

use parley_core::ChatError;
use parley_protocol::{codes, BrokerOp, BrokerReply, BrokerRequest, ProtocolVersion};

use crate::broker::BrokerHandle;

/// Maximum request size (1 MB)
const MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Read timeout for idle connections (5 minutes)
const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Write timeout (10 seconds)
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection handler for a single chat client.
pub struct ConnectionHandler {
    /// Buffered reader for incoming requests
    reader: BufReader<OwnedReadHalf>,

    /// Buffered writer for outgoing replies
    writer: BufWriter<OwnedWriteHalf>,

    /// Handle to the room broker
    broker: BrokerHandle,

    /// Connection number for log correlation
    connection_number: u64,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        reader: OwnedReadHalf,
        writer: OwnedWriteHalf,
        broker: BrokerHandle,
        connection_number: u64,
    ) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            broker,
            connection_number,
        }
    }

    /// Runs the connection handler.
    ///
    /// This is the main entry point - enters the request loop and returns
    /// when the connection closes.
    pub async fn run(mut self) {
        debug!(connection = self.connection_number, "New client connected");

        if let Err(e) = self.process_requests().await {
            debug!(
                connection = self.connection_number,
                error = %e,
                "Connection closed"
            );
        }

        debug!(connection = self.connection_number, "Client disconnected");
    }

    /// Main request processing loop.
    ///
    /// Reads and answers requests until the client disconnects, idles out,
    /// or an unrecoverable I/O error occurs.
    async fn process_requests(&mut self) -> Result<(), ConnectionError> {
        loop {
            let line = match timeout(READ_TIMEOUT, self.read_line()).await {
                Ok(Ok(line)) => line,
                Ok(Err(ConnectionError::Eof)) => {
                    debug!(connection = self.connection_number, "Client sent EOF");
                    return Ok(());
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    debug!(connection = self.connection_number, "Connection timed out");
                    return Err(ConnectionError::Timeout);
                }
            };

            // Malformed JSON gets an error reply, not a disconnect
            let request: BrokerRequest = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    debug!(
                        connection = self.connection_number,
                        error = %e,
                        "Malformed request"
                    );
                    self.send_reply(&BrokerReply::error_with_code(
                        &format!("malformed request: {e}"),
                        codes::BAD_REQUEST,
                    ))
                    .await?;
                    continue;
                }
            };

            // Version check happens per request, not per connection
            let client_version = request.protocol_version;
            if !client_version.is_compatible_with(&ProtocolVersion::CURRENT) {
                warn!(
                    connection = self.connection_number,
                    client_version = %client_version,
                    server_version = %ProtocolVersion::CURRENT,
                    "Protocol version mismatch"
                );
                self.send_reply(&BrokerReply::error_with_code(
                    &format!(
                        "protocol version {} not compatible with server version {}",
                        client_version,
                        ProtocolVersion::CURRENT
                    ),
                    codes::BAD_REQUEST,
                ))
                .await?;
                continue;
            }

            let reply = self.dispatch(request.op).await;
            self.send_reply(&reply).await?;
        }
    }

    /// Routes one operation to the broker and shapes the reply.
    async fn dispatch(&self, op: BrokerOp) -> BrokerReply {
        match op {
            BrokerOp::CreateRoom { room } => {
                flag_reply(self.broker.create_room(room).await)
            }
            BrokerOp::JoinRoom { user, room } => {
                flag_reply(self.broker.join_room(user, room).await)
            }
            BrokerOp::LeaveRoom { user, room } => {
                flag_reply(self.broker.leave_room(user, room).await)
            }
            BrokerOp::SendMessage {
                user,
                room,
                text,
                recipient,
            } => flag_reply(self.broker.send_message(user, room, text, recipient).await),
            BrokerOp::ReceiveMessages { user, room } => {
                match self.broker.receive_messages(user, room).await {
                    Ok(messages) => BrokerReply::messages(messages),
                    Err(e) => fault_reply(&e),
                }
            }
            BrokerOp::ListRooms => BrokerReply::rooms(self.broker.list_rooms().await),
            BrokerOp::ListUsers { room } => match self.broker.list_users(room).await {
                Ok(users) => BrokerReply::users(users),
                Err(e) => fault_reply(&e),
            },
            BrokerOp::RegisterUser { user } => flag_reply(self.broker.register_user(user).await),
            BrokerOp::Disconnect { user, room } => {
                flag_reply(self.broker.disconnect(user, room).await)
            }
            BrokerOp::Ping { seq } => BrokerReply::pong(seq),
        }
    }

    /// Reads a single request line from the client.
    async fn read_line(&mut self) -> Result<String, ConnectionError> {
        let mut line = String::new();

        let bytes_read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;

        if bytes_read == 0 {
            return Err(ConnectionError::Eof);
        }

        if line.len() > MAX_MESSAGE_SIZE {
            return Err(ConnectionError::MessageTooLarge {
                size: line.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        Ok(line)
    }

    /// Sends one reply line to the client.
    async fn send_reply(&mut self, reply: &BrokerReply) -> Result<(), ConnectionError> {
        let json = serde_json::to_string(reply)
            .map_err(|e| ConnectionError::Serialize(e.to_string()))?;

        match timeout(WRITE_TIMEOUT, async {
            self.writer.write_all(json.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ConnectionError::Io(e.to_string())),
            Err(_) => Err(ConnectionError::WriteTimeout),
        }
    }
}

/// Shapes a flag-or-fault broker result into a reply.
fn flag_reply(result: Result<bool, ChatError>) -> BrokerReply {
    match result {
        Ok(value) => BrokerReply::flag(value),
        Err(e) => fault_reply(&e),
    }
}

/// Maps a domain fault to an error reply with a machine-readable code.
fn fault_reply(err: &ChatError) -> BrokerReply {
    let code = match err {
        ChatError::RoomNotFound { .. } => codes::NOT_FOUND,
        ChatError::NotMember { .. } => codes::NOT_MEMBER,
        ChatError::Unavailable => codes::UNAVAILABLE,
    };
    BrokerReply::error_with_code(&err.to_string(), code)
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Eof,

    #[error("Read timeout")]
    Timeout,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}
