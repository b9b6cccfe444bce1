//! Request and reply types for the broker and binder RPC surfaces.

use crate::version::ProtocolVersion;
use parley_core::{RoomName, UserName};
use serde::{Deserialize, Serialize};

/// Chat operations accepted by the messenger broker.
///
/// The serde tag is the RPC method name on the wire; field order mirrors
/// the call signature, so clients in any language can interoperate as long
/// as they preserve names and order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BrokerOp {
    /// Create a room. `false` if the name is empty or taken.
    CreateRoom { room: RoomName },

    /// Join a room. `false` if already a member.
    JoinRoom { user: UserName, room: RoomName },

    /// Leave a room.
    LeaveRoom { user: UserName, room: RoomName },

    /// Send a message to a room, optionally addressed to one recipient.
    SendMessage {
        user: UserName,
        room: RoomName,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient: Option<UserName>,
    },

    /// Fetch every message in the room visible to `user`.
    ///
    /// Full-history replay: there is no cursor, each call re-renders the
    /// entire room history. Kept for compatibility with existing clients.
    ReceiveMessages { user: UserName, room: RoomName },

    /// List all room names.
    ListRooms,

    /// List the members of a room.
    ListUsers { room: RoomName },

    /// Register a display name. `false` if already taken.
    RegisterUser { user: UserName },

    /// Leave the named room and drop the user's registration.
    Disconnect { user: UserName, room: RoomName },

    /// Liveness probe.
    Ping { seq: u64 },
}

/// Request envelope sent by chat clients to the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerRequest {
    /// Protocol version
    pub protocol_version: ProtocolVersion,

    /// Operation payload
    #[serde(flatten)]
    pub op: BrokerOp,
}

impl BrokerRequest {
    /// Creates a request with the current protocol version.
    pub fn new(op: BrokerOp) -> Self {
        Self {
            protocol_version: ProtocolVersion::CURRENT,
            op,
        }
    }

    pub fn create_room(room: impl Into<String>) -> Self {
        Self::new(BrokerOp::CreateRoom {
            room: RoomName::new(room),
        })
    }

    pub fn join_room(user: impl Into<String>, room: impl Into<String>) -> Self {
        Self::new(BrokerOp::JoinRoom {
            user: UserName::new(user),
            room: RoomName::new(room),
        })
    }

    pub fn leave_room(user: impl Into<String>, room: impl Into<String>) -> Self {
        Self::new(BrokerOp::LeaveRoom {
            user: UserName::new(user),
            room: RoomName::new(room),
        })
    }

    pub fn send_message(
        user: impl Into<String>,
        room: impl Into<String>,
        text: impl Into<String>,
        recipient: Option<&str>,
    ) -> Self {
        Self::new(BrokerOp::SendMessage {
            user: UserName::new(user),
            room: RoomName::new(room),
            text: text.into(),
            recipient: recipient.map(UserName::new),
        })
    }

    pub fn receive_messages(user: impl Into<String>, room: impl Into<String>) -> Self {
        Self::new(BrokerOp::ReceiveMessages {
            user: UserName::new(user),
            room: RoomName::new(room),
        })
    }

    pub fn list_rooms() -> Self {
        Self::new(BrokerOp::ListRooms)
    }

    pub fn list_users(room: impl Into<String>) -> Self {
        Self::new(BrokerOp::ListUsers {
            room: RoomName::new(room),
        })
    }

    pub fn register_user(user: impl Into<String>) -> Self {
        Self::new(BrokerOp::RegisterUser {
            user: UserName::new(user),
        })
    }

    pub fn disconnect(user: impl Into<String>, room: impl Into<String>) -> Self {
        Self::new(BrokerOp::Disconnect {
            user: UserName::new(user),
            room: RoomName::new(room),
        })
    }

    pub fn ping(seq: u64) -> Self {
        Self::new(BrokerOp::Ping { seq })
    }
}

/// Replies sent by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrokerReply {
    /// Boolean outcome of a validated operation. `false` means the request
    /// was understood but rejected (duplicate room, empty body, ...).
    Flag { value: bool },

    /// Rendered message lines, oldest first.
    Messages { messages: Vec<String> },

    /// Room names.
    Rooms { rooms: Vec<String> },

    /// Member names of one room.
    Users { users: Vec<String> },

    /// Response to a ping.
    Pong { seq: u64 },

    /// Fault response.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl BrokerReply {
    pub fn flag(value: bool) -> Self {
        Self::Flag { value }
    }

    pub fn messages(messages: Vec<String>) -> Self {
        Self::Messages { messages }
    }

    pub fn rooms(rooms: Vec<String>) -> Self {
        Self::Rooms { rooms }
    }

    pub fn users(users: Vec<String>) -> Self {
        Self::Users { users }
    }

    pub fn pong(seq: u64) -> Self {
        Self::Pong { seq }
    }

    pub fn error(message: &str) -> Self {
        Self::Error {
            message: message.to_string(),
            code: None,
        }
    }

    pub fn error_with_code(message: &str, code: &str) -> Self {
        Self::Error {
            message: message.to_string(),
            code: Some(code.to_string()),
        }
    }
}

/// Operations accepted by the binder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BinderOp {
    /// Store or overwrite the endpoint for a logical service name.
    /// Always succeeds; last writer wins.
    Register { name: String, host: String, port: u16 },

    /// Resolve a logical service name to "host:port".
    Lookup { name: String },
}

/// Request envelope sent to the binder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinderRequest {
    /// Protocol version
    pub protocol_version: ProtocolVersion,

    /// Operation payload
    #[serde(flatten)]
    pub op: BinderOp,
}

impl BinderRequest {
    /// Creates a request with the current protocol version.
    pub fn new(op: BinderOp) -> Self {
        Self {
            protocol_version: ProtocolVersion::CURRENT,
            op,
        }
    }

    pub fn register(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::new(BinderOp::Register {
            name: name.into(),
            host: host.into(),
            port,
        })
    }

    pub fn lookup(name: impl Into<String>) -> Self {
        Self::new(BinderOp::Lookup { name: name.into() })
    }
}

/// Replies sent by the binder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BinderReply {
    /// Registration outcome.
    Flag { value: bool },

    /// Resolved endpoint, rendered "host:port".
    Endpoint { address: String },

    /// Fault response.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl BinderReply {
    pub fn flag(value: bool) -> Self {
        Self::Flag { value }
    }

    pub fn endpoint(address: impl Into<String>) -> Self {
        Self::Endpoint {
            address: address.into(),
        }
    }

    pub fn error_with_code(message: &str, code: &str) -> Self {
        Self::Error {
            message: message.to_string(),
            code: Some(code.to_string()),
        }
    }
}
