//! Chat message records and delivery rendering.

use crate::user::UserName;
use chrono::{DateTime, Utc};

/// Delivery scope of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Visible to every member of the room.
    Broadcast,
    /// Visible only to its addressee (or to everyone when addressed to
    /// the `everyone` sentinel).
    Unicast,
}

/// A single chat message. Immutable once appended to a room's history;
/// history is never compacted, so repeated polls replay a growing prefix.
#[derive(Debug, Clone)]
pub struct Message {
    text: String,
    timestamp: DateTime<Utc>,
    sender: UserName,
    kind: MessageKind,
    addressee: Option<UserName>,
}

impl Message {
    /// Creates a broadcast message from `sender`.
    pub fn broadcast(sender: UserName, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
            sender,
            kind: MessageKind::Broadcast,
            addressee: None,
        }
    }

    /// Creates a unicast message addressed to a single recipient.
    pub fn unicast(sender: UserName, addressee: UserName, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
            sender,
            kind: MessageKind::Unicast,
            addressee: Some(addressee),
        }
    }

    /// Creates a join/leave notice generated by the broker itself.
    ///
    /// System notices carry an empty sender name and broadcast scope.
    pub fn system_notice(text: impl Into<String>) -> Self {
        Self::broadcast(UserName::default(), text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn sender(&self) -> &UserName {
        &self.sender
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn addressee(&self) -> Option<&UserName> {
        self.addressee.as_ref()
    }

    /// Whether `user` sees this message when polling the room.
    ///
    /// Broadcasts are visible to all members; unicasts only to their
    /// addressee, with `everyone` widening delivery to the whole room.
    #[must_use]
    pub fn is_visible_to(&self, user: &UserName) -> bool {
        match self.kind {
            MessageKind::Broadcast => true,
            MessageKind::Unicast => match &self.addressee {
                Some(addressee) => addressee.is_everyone() || addressee == user,
                None => false,
            },
        }
    }

    /// Renders the message for delivery to `user`, or `None` if it is not
    /// visible to them.
    ///
    /// Format: `[<ctime timestamp>]<sender>: <text>`, with a ` for you`
    /// marker when the message is addressed to `user` specifically.
    pub fn render_for(&self, user: &UserName) -> Option<String> {
        if !self.is_visible_to(user) {
            return None;
        }

        // ctime-style timestamp, e.g. "Sun Jun 20 23:21:05 1993"
        let ts = self.timestamp.format("%a %b %e %H:%M:%S %Y");
        let direct = self.addressee.as_ref().is_some_and(|a| a == user);

        if direct {
            Some(format!("[{ts}]{} for you: {}", self.sender, self.text))
        } else {
            Some(format!("[{ts}]{}: {}", self.sender, self.text))
        }
    }
}
