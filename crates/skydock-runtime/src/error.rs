//! Error types for runtime providers.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors a runtime provider can surface from a deploy.
///
/// The orchestration service records these verbatim on the failing
/// deployment, so messages are written to stand alone.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("empty image reference")]
    EmptyImage,

    #[error("edge routing not configured: missing {0}")]
    MissingEdgeConfig(&'static str),

    #[error("invalid port {0}")]
    InvalidPort(u16),

    #[error("port required or image must expose exactly one port")]
    AmbiguousPort,

    #[error("unparsable exposed port spec {0:?}")]
    BadPortSpec(String),

    #[error("docker connect: {0}")]
    Connect(#[source] bollard::errors::Error),

    #[error("image pull: {0}")]
    Pull(#[source] bollard::errors::Error),

    #[error("image inspect: {0}")]
    Inspect(#[source] bollard::errors::Error),

    #[error("container remove: {0}")]
    Remove(#[source] bollard::errors::Error),

    #[error("container create: {0}")]
    Create(#[source] bollard::errors::Error),

    #[error("container start: {0}")]
    Start(#[source] bollard::errors::Error),

    #[error("deploy timed out after {0}s")]
    DeadlineExceeded(u64),
}
