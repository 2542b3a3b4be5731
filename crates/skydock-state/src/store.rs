//! The `Store` contract implemented by persistence backends.

use async_trait::async_trait;

use skydock_core::{App, Deployment};

use crate::error::StoreResult;

/// Persistence operations for apps and deployments.
///
/// Implementations must keep the name index, per-app history, and the FIFO
/// queue consistent with each other, and must return clones rather than
/// references into their own structures.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new app. Fails with `Conflict` when the name is taken.
    async fn create_app(&self, app: App) -> StoreResult<()>;

    /// Fetch an app by its ID.
    async fn get_app_by_id(&self, id: &str) -> StoreResult<App>;

    /// Fetch an app by its unique name.
    async fn get_app_by_name(&self, name: &str) -> StoreResult<App>;

    /// Return a snapshot of all apps. Order is unspecified.
    async fn list_apps(&self) -> StoreResult<Vec<App>>;

    /// Persist a new deployment. Fails with `NotFound` when the referenced
    /// app does not exist. Queued deployments are also enqueued for
    /// processing.
    async fn create_deployment(&self, dep: Deployment) -> StoreResult<()>;

    /// Fetch a deployment by its ID.
    async fn get_deployment_by_id(&self, id: &str) -> StoreResult<Deployment>;

    /// Return an app's deployments in creation order. An app with no
    /// deployments — including an unknown app — yields an empty Vec.
    async fn list_deployments_by_app(&self, app_id: &str) -> StoreResult<Vec<Deployment>>;

    /// Remove and return the next queued deployment in FIFO order. Fails
    /// with `NotFound` when the queue holds no eligible entry.
    async fn take_next_queued_deployment(&self) -> StoreResult<Deployment>;

    /// Overwrite an existing deployment record. Fails with `NotFound` when
    /// the ID is unknown.
    async fn update_deployment(&self, dep: Deployment) -> StoreResult<()>;
}
