//! # weir-proto
//!
//! Already-decoded WAMP message types for the weir routing core.
//!
//! This crate holds the in-memory representation of the WAMP basic profile
//! messages, URI validation, and router-scope ID generation. It does *not*
//! implement any wire serialization format — transports hand the router
//! fully decoded [`Message`] values and receive them back the same way.

pub mod ids;
pub mod message;
pub mod uri;

pub use message::{Message, MessageKind};
pub use uri::{InvalidUri, MatchPolicy};
