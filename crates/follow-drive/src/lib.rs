//! Remote storage for follow: the [`DocumentStore`] capability, its Google
//! Drive and in-memory implementations, and the [`StoreClient`] that turns
//! session records into Markdown files inside one folder.

pub mod auth;
pub mod client;
pub mod config;
pub mod drive;
pub mod memory;
pub mod store;

pub use auth::{AccessToken, CredentialMode};
pub use client::{ClientState, StoreClient};
pub use config::DriveConfig;
pub use drive::DriveStore;
pub use memory::MemoryStore;
pub use store::{DocumentStore, RemoteFile, RemoteFolder};
