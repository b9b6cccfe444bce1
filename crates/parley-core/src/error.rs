//! Domain-specific error types following panic-free policy.

use crate::room::RoomName;
use crate::user::UserName;
use thiserror::Error;

/// Errors surfaced to RPC callers as faults.
///
/// Validation rejections (empty room name, empty message body, duplicate
/// state) are NOT errors; they travel as a `false` result so callers can
/// distinguish "rejected" from "crashed".
#[derive(Error, Debug, Clone)]
pub enum ChatError {
    /// No room is registered under this name.
    #[error("room not found: {room}")]
    RoomNotFound { room: RoomName },

    /// The operation referenced a user who is not in the named room.
    #[error("user {user} is not a member of {room}")]
    NotMember { user: UserName, room: RoomName },

    /// The broker actor has shut down and cannot answer.
    #[error("broker unavailable")]
    Unavailable,
}

impl ChatError {
    /// Fault for an unknown room name.
    pub fn room_not_found(room: &RoomName) -> Self {
        Self::RoomNotFound { room: room.clone() }
    }

    /// Fault for an operation naming a user outside the room.
    pub fn not_member(user: &UserName, room: &RoomName) -> Self {
        Self::NotMember {
            user: user.clone(),
            room: room.clone(),
        }
    }
}

/// Result type for broker operations.
pub type ChatResult<T> = Result<T, ChatError>;
