//! skydock-state — entity store for Skydock.
//!
//! Persists [`App`](skydock_core::App) and
//! [`Deployment`](skydock_core::Deployment) records and keeps three
//! structures mutually consistent: a unique-name index over apps, a per-app
//! append-only deployment history, and the global FIFO queue of deployments
//! awaiting processing.
//!
//! The [`Store`] trait is the substitution point; this crate ships the
//! in-memory [`MemoryStore`]. Durability across restarts is deliberately not
//! provided.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::Store;
