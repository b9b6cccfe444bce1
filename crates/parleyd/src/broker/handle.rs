//! Client interface for interacting with the BrokerActor.
//!
//! The `BrokerHandle` provides a cheap-to-clone interface for sending
//! commands to the broker actor. Channel failures (the actor has shut
//! down) surface as `ChatError::Unavailable`.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `ChatError::Unavailable`

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use parley_core::{ChatError, ChatResult, RoomName, UserName};

use super::commands::BrokerCommand;

/// Handle for interacting with the broker actor.
///
/// Cheap to clone; every connection task holds one. All methods are async
/// and communicate with the actor via channels.
#[derive(Clone)]
pub struct BrokerHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<BrokerCommand>,
}

impl BrokerHandle {
    /// Create a new broker handle.
    pub fn new(sender: mpsc::Sender<BrokerCommand>) -> Self {
        Self { sender }
    }

    /// Create a room.
    ///
    /// Returns `Ok(false)` if the name is empty or already in use.
    ///
    /// # Errors
    ///
    /// - `ChatError::Unavailable` if the actor has shut down
    pub async fn create_room(&self, room: RoomName) -> ChatResult<bool> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BrokerCommand::CreateRoom {
                room,
                respond_to: tx,
            })
            .await
            .map_err(|_| ChatError::Unavailable)?;

        rx.await.map_err(|_| ChatError::Unavailable)
    }

    /// Add a user to a room.
    ///
    /// Returns `Ok(false)` if the user was already a member.
    ///
    /// # Errors
    ///
    /// - `ChatError::RoomNotFound` if the room does not exist
    /// - `ChatError::Unavailable` if the actor has shut down
    pub async fn join_room(&self, user: UserName, room: RoomName) -> ChatResult<bool> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BrokerCommand::JoinRoom {
                user,
                room,
                respond_to: tx,
            })
            .await
            .map_err(|_| ChatError::Unavailable)?;

        rx.await.map_err(|_| ChatError::Unavailable)?
    }

    /// Remove a user from a room, leaving a departure notice.
    ///
    /// # Errors
    ///
    /// - `ChatError::RoomNotFound` if the room does not exist
    /// - `ChatError::NotMember` if the user is not in the room
    /// - `ChatError::Unavailable` if the actor has shut down
    pub async fn leave_room(&self, user: UserName, room: RoomName) -> ChatResult<bool> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BrokerCommand::LeaveRoom {
                user,
                room,
                respond_to: tx,
            })
            .await
            .map_err(|_| ChatError::Unavailable)?;

        rx.await.map_err(|_| ChatError::Unavailable)?
    }

    /// Append a message to a room's history.
    ///
    /// Returns `Ok(false)` if the body is empty or the message is
    /// addressed to its own sender.
    ///
    /// # Errors
    ///
    /// - `ChatError::RoomNotFound` if the room does not exist
    /// - `ChatError::Unavailable` if the actor has shut down
    pub async fn send_message(
        &self,
        user: UserName,
        room: RoomName,
        text: String,
        recipient: Option<UserName>,
    ) -> ChatResult<bool> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BrokerCommand::SendMessage {
                user,
                room,
                text,
                recipient,
                respond_to: tx,
            })
            .await
            .map_err(|_| ChatError::Unavailable)?;

        rx.await.map_err(|_| ChatError::Unavailable)?
    }

    /// Render a room's full history as seen by `user`.
    ///
    /// # Errors
    ///
    /// - `ChatError::RoomNotFound` if the room does not exist
    /// - `ChatError::Unavailable` if the actor has shut down
    pub async fn receive_messages(
        &self,
        user: UserName,
        room: RoomName,
    ) -> ChatResult<Vec<String>> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BrokerCommand::ReceiveMessages {
                user,
                room,
                respond_to: tx,
            })
            .await
            .map_err(|_| ChatError::Unavailable)?;

        rx.await.map_err(|_| ChatError::Unavailable)?
    }

    /// List all room names.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn list_rooms(&self) -> Vec<String> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(BrokerCommand::ListRooms { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// List the members of one room.
    ///
    /// # Errors
    ///
    /// - `ChatError::RoomNotFound` if the room does not exist
    /// - `ChatError::Unavailable` if the actor has shut down
    pub async fn list_users(&self, room: RoomName) -> ChatResult<Vec<String>> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BrokerCommand::ListUsers {
                room,
                respond_to: tx,
            })
            .await
            .map_err(|_| ChatError::Unavailable)?;

        rx.await.map_err(|_| ChatError::Unavailable)?
    }

    /// Claim a display name.
    ///
    /// Returns `Ok(false)` if the name is empty or already taken.
    ///
    /// # Errors
    ///
    /// - `ChatError::Unavailable` if the actor has shut down
    pub async fn register_user(&self, user: UserName) -> ChatResult<bool> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BrokerCommand::RegisterUser {
                user,
                respond_to: tx,
            })
            .await
            .map_err(|_| ChatError::Unavailable)?;

        rx.await.map_err(|_| ChatError::Unavailable)
    }

    /// Leave a room and release the user's display name.
    ///
    /// # Errors
    ///
    /// - `ChatError::RoomNotFound` if the room does not exist
    /// - `ChatError::NotMember` if the user is not in the room
    /// - `ChatError::Unavailable` if the actor has shut down
    pub async fn disconnect(&self, user: UserName, room: RoomName) -> ChatResult<bool> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BrokerCommand::Disconnect {
                user,
                room,
                respond_to: tx,
            })
            .await
            .map_err(|_| ChatError::Unavailable)?;

        rx.await.map_err(|_| ChatError::Unavailable)?
    }

    /// Advance the idle clocks and evict rooms past the threshold.
    ///
    /// Fire-and-forget: does not wait for the sweep or return a result.
    /// Sent by the sweeper ticker; also useful in tests for driving
    /// eviction without waiting on wall-clock time.
    pub async fn sweep_idle(&self, elapsed: Duration) {
        // Ignore send errors - the actor may be shutting down
        let _ = self.sender.send(BrokerCommand::SweepIdle { elapsed }).await;
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
