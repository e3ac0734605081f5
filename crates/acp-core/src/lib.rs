//! Core types for the agent/client protocol codec.
//!
//! This crate provides the fundamental building blocks shared by the
//! protocol layer:
//!
//! - [`Error`] and [`ErrorCode`]: the wire-serializable protocol error model
//! - [`ProtocolVersion`]: the negotiated protocol revision
//! - Logging facade re-exports and log targets
//!
//! # Design Principles
//!
//! - Errors are wire objects first: every [`Error`] can be serialized into a
//!   JSON-RPC error member without translation
//! - No panics on malformed wire input; everything surfaces as a
//!   [`Result`](crate::Result)
//! - All types are `Send + Sync` and cheap to clone

#![forbid(unsafe_code)]

mod error;
pub mod logging;
mod version;

pub use error::{Error, ErrorCode, Result};
pub use version::ProtocolVersion;
