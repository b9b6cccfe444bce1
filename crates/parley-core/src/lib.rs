//! Parley Core - Shared domain types for the chat substrate
//!
//! This crate provides the room, user, and message types shared between
//! the messenger broker daemon (parleyd) and the binder (binderd).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod message;
pub mod room;
pub mod user;

// Re-exports for convenience
pub use error::{ChatError, ChatResult};
pub use message::{Message, MessageKind};
pub use room::{Room, RoomName, DEFAULT_ROOM};
pub use user::{UserName, EVERYONE};
