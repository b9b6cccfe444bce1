//! Command types for broker actor communication.

use std::time::Duration;

use tokio::sync::oneshot;

use parley_core::{ChatResult, RoomName, UserName};

/// Commands processed by the broker actor.
///
/// Each request-style command carries a `respond_to` oneshot; the actor
/// sends the result back on it. `SweepIdle` is fire-and-forget.
#[derive(Debug)]
pub enum BrokerCommand {
    /// Create a room. `false` if the name is empty or already taken.
    CreateRoom {
        room: RoomName,
        respond_to: oneshot::Sender<bool>,
    },

    /// Add a user to a room's member list.
    JoinRoom {
        user: UserName,
        room: RoomName,
        respond_to: oneshot::Sender<ChatResult<bool>>,
    },

    /// Remove a user from a room's member list.
    LeaveRoom {
        user: UserName,
        room: RoomName,
        respond_to: oneshot::Sender<ChatResult<bool>>,
    },

    /// Append a message to a room's history.
    SendMessage {
        user: UserName,
        room: RoomName,
        text: String,
        recipient: Option<UserName>,
        respond_to: oneshot::Sender<ChatResult<bool>>,
    },

    /// Render the room's full history as seen by `user`.
    ReceiveMessages {
        user: UserName,
        room: RoomName,
        respond_to: oneshot::Sender<ChatResult<Vec<String>>>,
    },

    /// List all room names.
    ListRooms {
        respond_to: oneshot::Sender<Vec<String>>,
    },

    /// List the members of one room.
    ListUsers {
        room: RoomName,
        respond_to: oneshot::Sender<ChatResult<Vec<String>>>,
    },

    /// Claim a display name. `false` if empty or already taken.
    RegisterUser {
        user: UserName,
        respond_to: oneshot::Sender<bool>,
    },

    /// Leave the named room and drop the user's name registration.
    Disconnect {
        user: UserName,
        room: RoomName,
        respond_to: oneshot::Sender<ChatResult<bool>>,
    },

    /// Accrue idle time on empty rooms and evict the ones past the
    /// threshold. Sent by the sweeper ticker; no response.
    SweepIdle { elapsed: Duration },
}
