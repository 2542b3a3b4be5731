//! skydock-runtime — runtime providers for Skydock.
//!
//! A runtime turns an [`App`](skydock_core::App) into a running workload and
//! reports the URL it is reachable at, if any. Two providers ship here:
//!
//! - [`StubRuntime`] — deterministic URLs, no external dependency; for tests
//!   and local development.
//! - [`DockerRuntime`] — deploys against the local Docker engine and wires
//!   Traefik routing labels for exposed apps.

pub mod docker;
pub mod error;
pub mod stub;

use async_trait::async_trait;

use skydock_core::App;

pub use docker::{DockerRuntime, DockerRuntimeConfig, EdgeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use stub::StubRuntime;

/// The capability a runtime provider implements.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Deploy the app's image and return its URL when exposed.
    ///
    /// `Ok(None)` means the workload is running without external exposure.
    async fn deploy(&self, app: &App) -> RuntimeResult<Option<String>>;
}
