//! In-memory store backing the orchestration core.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, warn};

use skydock_core::{App, Deployment, DeploymentStatus};

use crate::error::{StoreError, StoreResult};
use crate::store::Store;

/// All indexes live behind one lock so every operation observes a
/// consistent view of apps, deployments, history, and the queue.
#[derive(Debug, Default)]
struct Inner {
    apps_by_id: HashMap<String, App>,
    /// Unique-name index: app name to app ID.
    app_ids_by_name: HashMap<String, String>,
    /// Source of truth for deployments. History and queue hold IDs only, so
    /// an update never has to touch them.
    deployments_by_id: HashMap<String, Deployment>,
    /// Per-app deployment IDs in creation order.
    deployment_ids_by_app: HashMap<String, Vec<String>>,
    /// FIFO backlog of queued deployment IDs.
    queued_deployment_ids: VecDeque<String>,
}

/// In-memory [`Store`] implementation.
///
/// One reader-writer lock guards all indexes: reads run concurrently,
/// writes are exclusive, and no operation calls out of the crate while
/// holding the lock. Data does not survive the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::internal("lock poisoned"))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::internal("lock poisoned"))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_app(&self, app: App) -> StoreResult<()> {
        let mut inner = self.write()?;

        if inner.app_ids_by_name.contains_key(&app.name) {
            return Err(StoreError::Conflict(format!(
                "app name {} already in use",
                app.name
            )));
        }

        debug!(app_id = %app.id, name = %app.name, "app stored");
        inner.app_ids_by_name.insert(app.name.clone(), app.id.clone());
        inner.apps_by_id.insert(app.id.clone(), app);
        Ok(())
    }

    async fn get_app_by_id(&self, id: &str) -> StoreResult<App> {
        let inner = self.read()?;
        inner
            .apps_by_id
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("app {id}")))
    }

    async fn get_app_by_name(&self, name: &str) -> StoreResult<App> {
        let inner = self.read()?;
        inner
            .app_ids_by_name
            .get(name)
            .and_then(|id| inner.apps_by_id.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("app named {name}")))
    }

    async fn list_apps(&self) -> StoreResult<Vec<App>> {
        let inner = self.read()?;
        Ok(inner.apps_by_id.values().cloned().collect())
    }

    async fn create_deployment(&self, dep: Deployment) -> StoreResult<()> {
        let mut inner = self.write()?;

        // A deployment must reference a stored app.
        if !inner.apps_by_id.contains_key(&dep.app_id) {
            return Err(StoreError::NotFound(format!("app {}", dep.app_id)));
        }

        debug!(deployment_id = %dep.id, app_id = %dep.app_id, status = ?dep.status, "deployment stored");

        inner
            .deployment_ids_by_app
            .entry(dep.app_id.clone())
            .or_default()
            .push(dep.id.clone());

        if dep.status == DeploymentStatus::Queued {
            inner.queued_deployment_ids.push_back(dep.id.clone());
        }

        inner.deployments_by_id.insert(dep.id.clone(), dep);
        Ok(())
    }

    async fn get_deployment_by_id(&self, id: &str) -> StoreResult<Deployment> {
        let inner = self.read()?;
        inner
            .deployments_by_id
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("deployment {id}")))
    }

    async fn list_deployments_by_app(&self, app_id: &str) -> StoreResult<Vec<Deployment>> {
        let inner = self.read()?;

        let Some(ids) = inner.deployment_ids_by_app.get(app_id) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match inner.deployments_by_id.get(id) {
                Some(dep) => out.push(dep.clone()),
                // Stale history entry. Skip it rather than failing the
                // whole listing.
                None => warn!(deployment_id = %id, app_id = %app_id, "stale history entry skipped"),
            }
        }
        Ok(out)
    }

    async fn take_next_queued_deployment(&self) -> StoreResult<Deployment> {
        let mut inner = self.write()?;

        while let Some(next_id) = inner.queued_deployment_ids.pop_front() {
            let Some(dep) = inner.deployments_by_id.get(&next_id) else {
                warn!(deployment_id = %next_id, "stale queue entry skipped");
                continue;
            };

            // Skip entries that were updated past Queued while still in
            // the queue.
            if dep.status != DeploymentStatus::Queued {
                continue;
            }

            return Ok(dep.clone());
        }

        Err(StoreError::NotFound("no queued deployments".to_string()))
    }

    async fn update_deployment(&self, dep: Deployment) -> StoreResult<()> {
        let mut inner = self.write()?;

        if !inner.deployments_by_id.contains_key(&dep.id) {
            return Err(StoreError::NotFound(format!("deployment {}", dep.id)));
        }

        debug!(deployment_id = %dep.id, status = ?dep.status, "deployment updated");
        inner.deployments_by_id.insert(dep.id.clone(), dep);
        Ok(())
    }
}
