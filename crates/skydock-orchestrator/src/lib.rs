//! skydock-orchestrator — the deployment orchestration service.
//!
//! [`AppService`] composes validation, the entity store, and a runtime
//! provider into the app lifecycle operations and the deployment state
//! machine:
//!
//! ```text
//! Queued ──▶ Building ──▶ Running
//!                   └───▶ Failed
//! ```
//!
//! Queued is the only initial state; Running and Failed are terminal. The
//! service processes one deployment per call and never retries — a failure
//! is recorded durably on the deployment and surfaced once.

pub mod error;
pub mod service;

pub use error::{ServiceError, ServiceResult};
pub use service::AppService;
