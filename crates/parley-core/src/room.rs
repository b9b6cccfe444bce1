//! Room state: membership, message history, and the idle clock.

use crate::message::Message;
use crate::user::UserName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Name of the distinguished room that always exists and is never evicted.
pub const DEFAULT_ROOM: &str = "default";

/// Unique key identifying a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a new RoomName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name of the permanent default room.
    pub fn default_room() -> Self {
        Self(DEFAULT_ROOM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks whether this names the permanent default room.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_ROOM
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat room: ordered member list, append-only message history, and the
/// accumulated idle time the lifecycle sweeper uses to decide eviction.
///
/// Member order is insertion order; set semantics (a user appears at most
/// once) are enforced here rather than trusted from callers.
#[derive(Debug, Clone, Default)]
pub struct Room {
    members: Vec<UserName>,
    messages: Vec<Message>,
    idle: Duration,
}

impl Room {
    /// Creates an empty room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default room, pre-seeded with the `everyone` sentinel.
    pub fn default_room() -> Self {
        Self {
            members: vec![UserName::everyone()],
            messages: Vec::new(),
            idle: Duration::ZERO,
        }
    }

    pub fn members(&self) -> &[UserName] {
        &self.members
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn is_member(&self, user: &UserName) -> bool {
        self.members.contains(user)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Adds a member. Returns `false` without modifying the list if the
    /// user is already present.
    pub fn add_member(&mut self, user: UserName) -> bool {
        if self.is_member(&user) {
            return false;
        }
        self.members.push(user);
        true
    }

    /// Removes a member. Returns `false` if the user was not present.
    pub fn remove_member(&mut self, user: &UserName) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != user);
        self.members.len() < before
    }

    /// Appends a message to the history.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Accumulated time this room has sat empty.
    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// Adds `elapsed` to the idle clock and returns the new total.
    pub fn accrue_idle(&mut self, elapsed: Duration) -> Duration {
        self.idle += elapsed;
        self.idle
    }

    /// Resets the idle clock; called whenever the room has members.
    pub fn reset_idle(&mut self) {
        self.idle = Duration::ZERO;
    }
}
