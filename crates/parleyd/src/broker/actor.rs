//! Broker actor - owns all room and user state and processes commands.
//!
//! The BrokerActor is the single owner of chat state in the daemon. It
//! receives commands via an mpsc channel and processes them sequentially,
//! so check-then-act sequences (duplicate room names, membership checks,
//! name claims) are atomic without locks.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel send failures are ignored (the client dropped its receiver)

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use parley_core::{ChatError, ChatResult, Message, Room, RoomName, UserName};

use super::commands::BrokerCommand;

/// The broker actor - owns rooms and registered display names.
///
/// # Ownership
///
/// - `rooms`: room name → membership and message history
/// - `users`: registered display names, first come first served
///
/// The default room exists from startup and is never evicted.
pub struct BrokerActor {
    /// Command receiver
    receiver: mpsc::Receiver<BrokerCommand>,

    /// Room storage keyed by name
    rooms: HashMap<RoomName, Room>,

    /// Registered display names
    users: Vec<UserName>,

    /// Idle time a room must exceed before the sweeper evicts it
    idle_threshold: Duration,
}

impl BrokerActor {
    /// Creates a new broker actor with the default room pre-seeded.
    pub fn new(receiver: mpsc::Receiver<BrokerCommand>, idle_threshold: Duration) -> Self {
        let mut rooms = HashMap::new();
        rooms.insert(RoomName::default_room(), Room::default_room());

        Self {
            receiver,
            rooms,
            users: Vec::new(),
            idle_threshold,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    /// This is the main entry point - call this in a spawned task.
    pub async fn run(mut self) {
        info!("Broker actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(
            rooms = self.rooms.len(),
            users = self.users.len(),
            "Broker actor stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: BrokerCommand) {
        match cmd {
            BrokerCommand::CreateRoom { room, respond_to } => {
                let result = self.handle_create_room(room);
                // Ignore send error - client may have dropped the receiver
                let _ = respond_to.send(result);
            }
            BrokerCommand::JoinRoom {
                user,
                room,
                respond_to,
            } => {
                let result = self.handle_join_room(user, room);
                let _ = respond_to.send(result);
            }
            BrokerCommand::LeaveRoom {
                user,
                room,
                respond_to,
            } => {
                let result = self.handle_leave_room(user, room);
                let _ = respond_to.send(result);
            }
            BrokerCommand::SendMessage {
                user,
                room,
                text,
                recipient,
                respond_to,
            } => {
                let result = self.handle_send_message(user, room, text, recipient);
                let _ = respond_to.send(result);
            }
            BrokerCommand::ReceiveMessages {
                user,
                room,
                respond_to,
            } => {
                let result = self.handle_receive_messages(&user, &room);
                let _ = respond_to.send(result);
            }
            BrokerCommand::ListRooms { respond_to } => {
                let _ = respond_to.send(self.handle_list_rooms());
            }
            BrokerCommand::ListUsers { room, respond_to } => {
                let result = self.handle_list_users(&room);
                let _ = respond_to.send(result);
            }
            BrokerCommand::RegisterUser { user, respond_to } => {
                let result = self.handle_register_user(user);
                let _ = respond_to.send(result);
            }
            BrokerCommand::Disconnect {
                user,
                room,
                respond_to,
            } => {
                let result = self.handle_disconnect(user, room);
                let _ = respond_to.send(result);
            }
            BrokerCommand::SweepIdle { elapsed } => {
                self.handle_sweep_idle(elapsed);
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Handles room creation.
    ///
    /// Empty names and duplicates are rejected with `false` rather than an
    /// error; the request is well-formed, the name just isn't usable.
    fn handle_create_room(&mut self, room: RoomName) -> bool {
        if room.is_empty() {
            debug!("Rejecting room creation with empty name");
            return false;
        }

        if self.rooms.contains_key(&room) {
            debug!(room = %room, "Room already exists, rejecting creation");
            return false;
        }

        self.rooms.insert(room.clone(), Room::new());

        info!(
            room = %room,
            total_rooms = self.rooms.len(),
            "Room created"
        );
        true
    }

    /// Handles a user joining a room.
    ///
    /// Joining appends a system notice visible to every member and resets
    /// the room's idle clock. Rejoining a room the user is already in
    /// returns `Ok(false)` without a notice.
    fn handle_join_room(&mut self, user: UserName, room: RoomName) -> ChatResult<bool> {
        let entry = self
            .rooms
            .get_mut(&room)
            .ok_or_else(|| ChatError::room_not_found(&room))?;

        if !entry.add_member(user.clone()) {
            debug!(user = %user, room = %room, "User already in room, join is a no-op");
            return Ok(false);
        }

        entry.push_message(Message::system_notice(format!("{user} joined.")));
        entry.reset_idle();

        info!(
            user = %user,
            room = %room,
            members = entry.member_count(),
            "User joined room"
        );
        Ok(true)
    }

    /// Handles a user leaving a room.
    ///
    /// Membership is checked before the departure notice is appended, so a
    /// non-member cannot leave a trail in a room it was never in.
    fn handle_leave_room(&mut self, user: UserName, room: RoomName) -> ChatResult<bool> {
        let entry = self
            .rooms
            .get_mut(&room)
            .ok_or_else(|| ChatError::room_not_found(&room))?;

        if !entry.is_member(&user) {
            return Err(ChatError::not_member(&user, &room));
        }

        entry.push_message(Message::system_notice(format!("{user} left.")));
        entry.remove_member(&user);

        info!(
            user = %user,
            room = %room,
            members = entry.member_count(),
            "User left room"
        );
        Ok(true)
    }

    /// Handles appending a message to a room.
    ///
    /// A missing recipient or the everyone sentinel produces a broadcast;
    /// any other recipient produces a unicast addressed to that member.
    /// Empty bodies and messages addressed to the sender are rejected
    /// with `Ok(false)`.
    ///
    /// The sender's membership is deliberately not checked: the caller's
    /// current room is client-supplied on every operation and trusted.
    fn handle_send_message(
        &mut self,
        user: UserName,
        room: RoomName,
        text: String,
        recipient: Option<UserName>,
    ) -> ChatResult<bool> {
        // Empty bodies are rejected before the room lookup, so an empty
        // send to an unknown room is a rejection, not a fault
        if text.is_empty() {
            debug!(user = %user, room = %room, "Rejecting empty message body");
            return Ok(false);
        }

        let entry = self
            .rooms
            .get_mut(&room)
            .ok_or_else(|| ChatError::room_not_found(&room))?;

        if recipient.as_ref() == Some(&user) {
            debug!(user = %user, room = %room, "Rejecting message addressed to its sender");
            return Ok(false);
        }

        let message = match recipient {
            Some(ref to) if !to.is_everyone() => {
                Message::unicast(user.clone(), to.clone(), text)
            }
            _ => Message::broadcast(user.clone(), text),
        };

        entry.push_message(message);

        debug!(
            user = %user,
            room = %room,
            recipient = ?recipient,
            history_len = entry.messages().len(),
            "Message appended"
        );
        Ok(true)
    }

    /// Handles rendering a room's history for one member.
    ///
    /// Always replays the full history; there is no read cursor. Unicasts
    /// addressed to other members are filtered out. Membership is not a
    /// precondition; the client-supplied room is trusted.
    fn handle_receive_messages(&self, user: &UserName, room: &RoomName) -> ChatResult<Vec<String>> {
        let entry = self
            .rooms
            .get(room)
            .ok_or_else(|| ChatError::room_not_found(room))?;

        Ok(entry
            .messages()
            .iter()
            .filter_map(|m| m.render_for(user))
            .collect())
    }

    /// Handles listing all room names, sorted for deterministic output.
    fn handle_list_rooms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.keys().map(|r| r.as_str().to_string()).collect();
        names.sort();
        names
    }

    /// Handles listing the members of one room.
    fn handle_list_users(&self, room: &RoomName) -> ChatResult<Vec<String>> {
        let entry = self
            .rooms
            .get(room)
            .ok_or_else(|| ChatError::room_not_found(room))?;

        Ok(entry
            .members()
            .iter()
            .map(|u| u.as_str().to_string())
            .collect())
    }

    /// Handles claiming a display name.
    ///
    /// Names are first come, first served. Empty names are rejected.
    /// Newly registered users are placed in the default room's member
    /// list without a join notice.
    fn handle_register_user(&mut self, user: UserName) -> bool {
        if user.is_empty() {
            debug!("Rejecting registration of empty display name");
            return false;
        }

        if self.users.contains(&user) {
            debug!(user = %user, "Display name already taken");
            return false;
        }

        self.users.push(user.clone());

        if let Some(default) = self.rooms.get_mut(&RoomName::default_room()) {
            default.add_member(user.clone());
        }

        info!(
            user = %user,
            total_users = self.users.len(),
            "Display name registered"
        );
        true
    }

    /// Handles disconnecting a user.
    ///
    /// Removes the user from the named room and drops the display name
    /// registration, silently; only `leave_room` emits a departure
    /// notice. Memberships in other rooms are left in place; those
    /// rooms keep a name nobody can re-register until they too are left
    /// or evicted.
    fn handle_disconnect(&mut self, user: UserName, room: RoomName) -> ChatResult<bool> {
        let entry = self
            .rooms
            .get_mut(&room)
            .ok_or_else(|| ChatError::room_not_found(&room))?;

        if !entry.is_member(&user) {
            return Err(ChatError::not_member(&user, &room));
        }

        entry.remove_member(&user);
        self.users.retain(|u| u != &user);

        info!(
            user = %user,
            room = %room,
            remaining_users = self.users.len(),
            "User disconnected"
        );
        Ok(true)
    }

    /// Handles one sweeper tick.
    ///
    /// Rooms with members get their idle clock reset; empty rooms accrue
    /// `elapsed` and are evicted once strictly past the threshold. The
    /// default room is exempt. Eviction drops the room's history.
    fn handle_sweep_idle(&mut self, elapsed: Duration) {
        let threshold = self.idle_threshold;

        let to_evict: Vec<RoomName> = self
            .rooms
            .iter_mut()
            .filter_map(|(name, room)| {
                if name.is_default() {
                    return None;
                }
                if room.member_count() > 0 {
                    room.reset_idle();
                    return None;
                }
                if room.accrue_idle(elapsed) > threshold {
                    Some(name.clone())
                } else {
                    None
                }
            })
            .collect();

        if to_evict.is_empty() {
            debug!("No idle rooms to evict");
            return;
        }

        for name in to_evict {
            if let Some(room) = self.rooms.remove(&name) {
                info!(
                    room = %name,
                    dropped_messages = room.messages().len(),
                    remaining_rooms = self.rooms.len(),
                    "Idle room evicted"
                );
            }
        }
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the number of rooms currently held.
    #[cfg(test)]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Returns the number of registered display names.
    #[cfg(test)]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
