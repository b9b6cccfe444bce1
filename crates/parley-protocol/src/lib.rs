//! Parley Protocol - Wire protocol for daemon communication
//!
//! This crate provides the request and reply types exchanged between chat
//! clients and the messenger broker, and between services and the binder.
//! Framing is one JSON object per line; the serde tag of each operation is
//! the RPC method name on the wire.

pub mod codes;
pub mod message;
pub mod version;

pub use message::{BinderOp, BinderReply, BinderRequest, BrokerOp, BrokerReply, BrokerRequest};
pub use version::ProtocolVersion;
