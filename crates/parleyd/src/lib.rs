//! Parley Daemon - Chat room broker
//!
//! The daemon owns all room and user state, processes chat operations via
//! an actor, and serves line-framed JSON requests over TCP.
//!
//! # Architecture
//!
//! - `broker`: actor that owns rooms and registered users
//! - `server`: TCP listener and per-connection request loop
//! - `announce`: registration with the binder at startup
//!
//! # Panic-Free Policy
//!
//! Library code in this crate avoids `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()` and `todo!()`. Fallible operations use `?`, pattern
//! matching, or `unwrap_or` variants. Tests are exempt.

pub mod announce;
pub mod broker;
pub mod server;

pub use broker::{spawn_broker, BrokerConfig, BrokerHandle};
pub use server::BrokerServer;
