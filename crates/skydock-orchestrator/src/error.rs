//! Error taxonomy exposed to transport-layer collaborators.

use thiserror::Error;

use skydock_runtime::RuntimeError;
use skydock_state::StoreError;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Tagged outcomes of the orchestration service.
///
/// Transport layers map these onto their own status codes; nothing here
/// implies a retry.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed caller input: bad name, image, or port, or an empty ID.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// App name already taken.
    #[error("app name already in use")]
    Conflict,

    /// Referenced app or deployment does not exist.
    #[error("not found")]
    NotFound,

    /// Processing was attempted without a configured runtime provider.
    #[error("no runtime configured")]
    NoRuntime,

    /// The queue holds no deployment to process. Expected steady state,
    /// not a failure.
    #[error("no queued deployments")]
    NoWork,

    /// The runtime provider rejected or failed the deploy. The same message
    /// is recorded on the failed deployment.
    #[error("runtime deploy failed: {0}")]
    Runtime(#[source] RuntimeError),

    /// Unexpected store error, propagated unchanged.
    #[error(transparent)]
    Store(StoreError),
}
