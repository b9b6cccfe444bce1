//! Parley Binder - Service name registry
//!
//! The binder maps logical service names to network endpoints so chat
//! clients can find the messenger without a hardcoded address. It speaks
//! the same line-framed JSON protocol as the messenger daemon.
//!
//! # Panic-Free Policy
//!
//! Library code in this crate avoids `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()` and `todo!()`. Tests are exempt.

pub mod directory;
pub mod server;

pub use directory::{BinderError, Directory, ServiceEndpoint};
pub use server::{BinderServer, DEFAULT_BINDER_ADDR};
