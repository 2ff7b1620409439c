//! Core types for follow: session records, Markdown rendering and the
//! shared error type.
//!
//! This crate does no I/O. It is shared by the store client, the HTTP
//! gateway and the command-line binary.
//!
//! # Main types
//!
//! - [`SessionRecord`] — One conversational session as sent by a client.
//! - [`Message`] / [`Role`] — A single chat turn and its author.
//! - [`render`] — Deterministic Markdown rendering of a session.
//! - [`parse_transcript`] — Reads a rendered document back into a record.
//! - [`FollowError`] — Unified error enum for all follow crates.

/// Error types.
pub mod error;
/// Chat turns and roles.
pub mod message;
/// Markdown rendering.
pub mod render;
/// Session records and document naming.
pub mod session;
/// Transcript parsing.
pub mod transcript;

pub use error::{FollowError, FollowResult};
pub use message::{Message, Role};
pub use render::render;
pub use session::{document_name, Feedback, SessionRecord, DEFAULT_SESSION_NAME};
pub use transcript::parse_transcript;
