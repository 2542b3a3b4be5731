//! App lifecycle operations and deployment processing.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use skydock_core::{App, Deployment, DeploymentStatus, NewAppParams};
use skydock_runtime::Runtime;
use skydock_state::{Store, StoreError};

use crate::error::{ServiceError, ServiceResult};

/// Coordinates app and deployment operations over an injected store and an
/// optional runtime provider.
///
/// Without a runtime the service can still create apps and queue
/// deployments; processing them requires one.
pub struct AppService {
    store: Arc<dyn Store>,
    runtime: Option<Arc<dyn Runtime>>,
}

impl AppService {
    /// Service without a runtime provider. `process_next_deployment` will
    /// refuse to run.
    pub fn new(store: Arc<dyn Store>) -> Self {
        AppService {
            store,
            runtime: None,
        }
    }

    /// Service with a runtime provider attached.
    pub fn with_runtime(store: Arc<dyn Store>, runtime: Arc<dyn Runtime>) -> Self {
        AppService {
            store,
            runtime: Some(runtime),
        }
    }

    /// Validate and persist a new app.
    pub async fn create_app(&self, params: NewAppParams) -> ServiceResult<App> {
        // The domain constructor is the single validation gate.
        let app = App::new(params).map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        match self.store.create_app(app.clone()).await {
            Ok(()) => {
                info!(app_id = %app.id, name = %app.name, "app created");
                Ok(app)
            }
            Err(StoreError::Conflict(_)) => Err(ServiceError::Conflict),
            Err(other) => Err(ServiceError::Store(other)),
        }
    }

    /// Snapshot of all apps.
    pub async fn list_apps(&self) -> ServiceResult<Vec<App>> {
        self.store.list_apps().await.map_err(translate_store_err)
    }

    /// Fetch one app by ID.
    pub async fn get_app(&self, id: &str) -> ServiceResult<App> {
        if id.is_empty() {
            return Err(ServiceError::InvalidInput("app id is required".to_string()));
        }
        self.store.get_app_by_id(id).await.map_err(translate_store_err)
    }

    /// Queue a new deployment for an app.
    pub async fn deploy_app(&self, app_id: &str) -> ServiceResult<Deployment> {
        if app_id.is_empty() {
            return Err(ServiceError::InvalidInput("app id is required".to_string()));
        }

        // Confirm the app exists before writing a deployment record. The
        // store enforces this too, so a racing delete still maps cleanly.
        self.store
            .get_app_by_id(app_id)
            .await
            .map_err(translate_store_err)?;

        let dep = Deployment::new(app_id);
        match self.store.create_deployment(dep.clone()).await {
            Ok(()) => {
                info!(deployment_id = %dep.id, app_id = %app_id, "deployment queued");
                Ok(dep)
            }
            Err(StoreError::NotFound(_)) => Err(ServiceError::NotFound),
            Err(other) => Err(ServiceError::Store(other)),
        }
    }

    /// An app's deployment history in creation order.
    pub async fn list_deployments(&self, app_id: &str) -> ServiceResult<Vec<Deployment>> {
        if app_id.is_empty() {
            return Err(ServiceError::InvalidInput("app id is required".to_string()));
        }

        // Distinguish a missing app from an app with zero deployments.
        self.store
            .get_app_by_id(app_id)
            .await
            .map_err(translate_store_err)?;

        self.store
            .list_deployments_by_app(app_id)
            .await
            .map_err(translate_store_err)
    }

    /// Take the next queued deployment and drive it to a terminal state.
    ///
    /// Exactly one deployment is processed per call; draining N queued
    /// items takes N calls.
    pub async fn process_next_deployment(&self) -> ServiceResult<Deployment> {
        let Some(runtime) = &self.runtime else {
            return Err(ServiceError::NoRuntime);
        };

        let mut dep = match self.store.take_next_queued_deployment().await {
            Ok(dep) => dep,
            Err(StoreError::NotFound(_)) => return Err(ServiceError::NoWork),
            Err(other) => return Err(ServiceError::Store(other)),
        };

        // Persist Building before touching the runtime so an observer
        // polling mid-flight sees an honest intermediate state.
        dep.status = DeploymentStatus::Building;
        dep.updated_at = Utc::now();
        self.store
            .update_deployment(dep.clone())
            .await
            .map_err(ServiceError::Store)?;

        let app = match self.store.get_app_by_id(&dep.app_id).await {
            Ok(app) => app,
            Err(err) => {
                self.record_failure(&mut dep, err.to_string()).await;
                return Err(translate_store_err(err));
            }
        };

        match runtime.deploy(&app).await {
            Ok(url) => {
                dep.status = DeploymentStatus::Running;
                dep.url = url;
                dep.error = None;
                dep.updated_at = Utc::now();
                self.store
                    .update_deployment(dep.clone())
                    .await
                    .map_err(ServiceError::Store)?;
                info!(deployment_id = %dep.id, app = %app.name, url = ?dep.url, "deployment running");
                Ok(dep)
            }
            Err(err) => {
                self.record_failure(&mut dep, err.to_string()).await;
                Err(ServiceError::Runtime(err))
            }
        }
    }

    /// Leave the deployment in a durable Failed state carrying the error
    /// message. Best effort: the original error is what the caller gets.
    async fn record_failure(&self, dep: &mut Deployment, message: String) {
        warn!(deployment_id = %dep.id, error = %message, "deployment failed");
        dep.status = DeploymentStatus::Failed;
        dep.error = Some(message);
        dep.updated_at = Utc::now();
        if let Err(update_err) = self.store.update_deployment(dep.clone()).await {
            warn!(deployment_id = %dep.id, %update_err, "failed to record deployment failure");
        }
    }
}

fn translate_store_err(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound(_) => ServiceError::NotFound,
        StoreError::Conflict(_) => ServiceError::Conflict,
        other => ServiceError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use skydock_core::AppStatus;
    use skydock_runtime::{RuntimeError, RuntimeResult, StubRuntime};
    use skydock_state::{MemoryStore, StoreResult};

    fn hello_params() -> NewAppParams {
        NewAppParams {
            name: "hello".to_string(),
            image: "nginx:latest".to_string(),
            port: Some(8080),
            ..Default::default()
        }
    }

    /// Runtime that counts invocations and answers like the stub.
    struct RecordingRuntime {
        base_domain: String,
        calls: AtomicUsize,
    }

    impl RecordingRuntime {
        fn new(base_domain: &str) -> Self {
            RecordingRuntime {
                base_domain: base_domain.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Runtime for RecordingRuntime {
        async fn deploy(&self, app: &App) -> RuntimeResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !app.expose {
                return Ok(None);
            }
            Ok(Some(format!("https://{}.{}", app.name, self.base_domain)))
        }
    }

    /// Runtime that always fails.
    struct FailingRuntime;

    #[async_trait]
    impl Runtime for FailingRuntime {
        async fn deploy(&self, _app: &App) -> RuntimeResult<Option<String>> {
            Err(RuntimeError::AmbiguousPort)
        }
    }

    /// Store wrapper with injectable failures, delegating everything else.
    struct FlakyStore {
        inner: Arc<MemoryStore>,
        get_app_err: Mutex<Option<StoreError>>,
        create_dep_err: Mutex<Option<StoreError>>,
    }

    impl FlakyStore {
        fn wrapping(inner: Arc<MemoryStore>) -> Self {
            FlakyStore {
                inner,
                get_app_err: Mutex::new(None),
                create_dep_err: Mutex::new(None),
            }
        }

        fn fail_get_app(&self, err: StoreError) {
            *self.get_app_err.lock().unwrap() = Some(err);
        }

        fn fail_create_deployment(&self, err: StoreError) {
            *self.create_dep_err.lock().unwrap() = Some(err);
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn create_app(&self, app: App) -> StoreResult<()> {
            self.inner.create_app(app).await
        }

        async fn get_app_by_id(&self, id: &str) -> StoreResult<App> {
            if let Some(err) = self.get_app_err.lock().unwrap().take() {
                return Err(err);
            }
            self.inner.get_app_by_id(id).await
        }

        async fn get_app_by_name(&self, name: &str) -> StoreResult<App> {
            self.inner.get_app_by_name(name).await
        }

        async fn list_apps(&self) -> StoreResult<Vec<App>> {
            self.inner.list_apps().await
        }

        async fn create_deployment(&self, dep: Deployment) -> StoreResult<()> {
            if let Some(err) = self.create_dep_err.lock().unwrap().take() {
                return Err(err);
            }
            self.inner.create_deployment(dep).await
        }

        async fn get_deployment_by_id(&self, id: &str) -> StoreResult<Deployment> {
            self.inner.get_deployment_by_id(id).await
        }

        async fn list_deployments_by_app(&self, app_id: &str) -> StoreResult<Vec<Deployment>> {
            self.inner.list_deployments_by_app(app_id).await
        }

        async fn take_next_queued_deployment(&self) -> StoreResult<Deployment> {
            self.inner.take_next_queued_deployment().await
        }

        async fn update_deployment(&self, dep: Deployment) -> StoreResult<()> {
            self.inner.update_deployment(dep).await
        }
    }

    // ── create_app ─────────────────────────────────────────────────

    #[tokio::test]
    async fn create_app_persists() {
        let store = Arc::new(MemoryStore::new());
        let svc = AppService::new(store.clone());

        let app = svc.create_app(hello_params()).await.unwrap();
        assert!(!app.id.is_empty());
        assert_eq!(app.status, AppStatus::Created);

        let stored = store.get_app_by_id(&app.id).await.unwrap();
        assert_eq!(stored, app);
    }

    #[tokio::test]
    async fn create_app_rejects_bad_name() {
        let svc = AppService::new(Arc::new(MemoryStore::new()));
        let err = svc
            .create_app(NewAppParams {
                name: "Not_Valid".to_string(),
                image: "nginx".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)), "got {err}");
    }

    #[tokio::test]
    async fn create_app_duplicate_name_conflicts() {
        let svc = AppService::new(Arc::new(MemoryStore::new()));
        svc.create_app(hello_params()).await.unwrap();

        let err = svc.create_app(hello_params()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict), "got {err}");
    }

    // ── deploy_app ─────────────────────────────────────────────────

    #[tokio::test]
    async fn deploy_app_requires_id() {
        let svc = AppService::new(Arc::new(MemoryStore::new()));
        let err = svc.deploy_app("").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)), "got {err}");
    }

    #[tokio::test]
    async fn deploy_app_unknown_app_is_not_found() {
        let svc = AppService::new(Arc::new(MemoryStore::new()));
        let err = svc.deploy_app("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound), "got {err}");
    }

    #[tokio::test]
    async fn deploy_app_queues_deployment() {
        let store = Arc::new(MemoryStore::new());
        let svc = AppService::new(store.clone());
        let app = svc.create_app(hello_params()).await.unwrap();

        let dep = svc.deploy_app(&app.id).await.unwrap();
        assert_eq!(dep.app_id, app.id);
        assert_eq!(dep.status, DeploymentStatus::Queued);
        assert!(dep.url.is_none());
        assert!(dep.error.is_none());

        let history = svc.list_deployments(&app.id).await.unwrap();
        assert_eq!(history, vec![dep]);
    }

    #[tokio::test]
    async fn deploy_app_store_not_found_maps() {
        let inner = Arc::new(MemoryStore::new());
        let flaky = Arc::new(FlakyStore::wrapping(inner.clone()));
        let svc = AppService::new(flaky.clone());
        let app = svc.create_app(hello_params()).await.unwrap();

        // App disappears between the existence check and the insert.
        flaky.fail_create_deployment(StoreError::NotFound("app gone".to_string()));
        let err = svc.deploy_app(&app.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound), "got {err}");
    }

    #[tokio::test]
    async fn deploy_app_unexpected_store_error_bubbles() {
        let inner = Arc::new(MemoryStore::new());
        let flaky = Arc::new(FlakyStore::wrapping(inner.clone()));
        let svc = AppService::new(flaky.clone());
        let app = svc.create_app(hello_params()).await.unwrap();

        flaky.fail_create_deployment(StoreError::internal("boom"));
        let err = svc.deploy_app(&app.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)), "got {err}");
    }

    // ── process_next_deployment ────────────────────────────────────

    #[tokio::test]
    async fn process_without_runtime_leaves_store_untouched() {
        let store = Arc::new(MemoryStore::new());
        let svc = AppService::new(store.clone());
        let app = svc.create_app(hello_params()).await.unwrap();
        let dep = svc.deploy_app(&app.id).await.unwrap();

        let err = svc.process_next_deployment().await.unwrap_err();
        assert!(matches!(err, ServiceError::NoRuntime), "got {err}");

        // The queued deployment is still there for a runtime-equipped
        // service to pick up.
        let with_runtime =
            AppService::with_runtime(store.clone(), Arc::new(StubRuntime::new("example.com")));
        let processed = with_runtime.process_next_deployment().await.unwrap();
        assert_eq!(processed.id, dep.id);
        assert_eq!(processed.status, DeploymentStatus::Running);
    }

    #[tokio::test]
    async fn process_with_empty_queue_is_no_work() {
        let svc = AppService::with_runtime(
            Arc::new(MemoryStore::new()),
            Arc::new(StubRuntime::new("example.com")),
        );
        let err = svc.process_next_deployment().await.unwrap_err();
        assert!(matches!(err, ServiceError::NoWork), "got {err}");
    }

    #[tokio::test]
    async fn process_success_records_url() {
        let store = Arc::new(MemoryStore::new());
        let runtime = Arc::new(RecordingRuntime::new("example.com"));
        let svc = AppService::with_runtime(store.clone(), runtime.clone());

        let app = svc.create_app(hello_params()).await.unwrap();
        let queued = svc.deploy_app(&app.id).await.unwrap();

        let dep = svc.process_next_deployment().await.unwrap();
        assert_eq!(dep.id, queued.id);
        assert_eq!(dep.status, DeploymentStatus::Running);
        assert_eq!(dep.url.as_deref(), Some("https://hello.example.com"));
        assert!(dep.error.is_none());
        assert_eq!(runtime.calls(), 1);

        let persisted = store.get_deployment_by_id(&dep.id).await.unwrap();
        assert_eq!(persisted, dep);
    }

    #[tokio::test]
    async fn process_unexposed_app_runs_without_url() {
        let store = Arc::new(MemoryStore::new());
        let runtime = Arc::new(RecordingRuntime::new("example.com"));
        let svc = AppService::with_runtime(store.clone(), runtime.clone());

        let app = svc
            .create_app(NewAppParams {
                name: "worker".to_string(),
                image: "worker:1".to_string(),
                expose: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        svc.deploy_app(&app.id).await.unwrap();

        let dep = svc.process_next_deployment().await.unwrap();
        assert_eq!(dep.status, DeploymentStatus::Running);
        assert!(dep.url.is_none());
        assert_eq!(runtime.calls(), 1);
    }

    #[tokio::test]
    async fn process_runtime_failure_persists_failed_state() {
        let store = Arc::new(MemoryStore::new());
        let svc = AppService::with_runtime(store.clone(), Arc::new(FailingRuntime));

        let app = svc.create_app(hello_params()).await.unwrap();
        let queued = svc.deploy_app(&app.id).await.unwrap();

        let err = svc.process_next_deployment().await.unwrap_err();
        assert!(matches!(err, ServiceError::Runtime(_)), "got {err}");

        let persisted = store.get_deployment_by_id(&queued.id).await.unwrap();
        assert_eq!(persisted.status, DeploymentStatus::Failed);
        assert_eq!(
            persisted.error.as_deref(),
            Some("port required or image must expose exactly one port")
        );
        assert!(persisted.url.is_none());
    }

    #[tokio::test]
    async fn process_app_load_failure_persists_failed_state() {
        let inner = Arc::new(MemoryStore::new());
        let flaky = Arc::new(FlakyStore::wrapping(inner.clone()));
        let svc = AppService::with_runtime(flaky.clone(), Arc::new(StubRuntime::new("example.com")));

        let app = svc.create_app(hello_params()).await.unwrap();
        let queued = svc.deploy_app(&app.id).await.unwrap();

        flaky.fail_get_app(StoreError::internal("backend unreachable"));
        let err = svc.process_next_deployment().await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)), "got {err}");

        let persisted = inner.get_deployment_by_id(&queued.id).await.unwrap();
        assert_eq!(persisted.status, DeploymentStatus::Failed);
        assert!(
            persisted
                .error
                .as_deref()
                .is_some_and(|e| e.contains("backend unreachable")),
            "error not captured: {:?}",
            persisted.error
        );
    }

    #[tokio::test]
    async fn process_drains_one_per_call() {
        let store = Arc::new(MemoryStore::new());
        let runtime = Arc::new(RecordingRuntime::new("example.com"));
        let svc = AppService::with_runtime(store.clone(), runtime.clone());

        let app = svc.create_app(hello_params()).await.unwrap();
        let d1 = svc.deploy_app(&app.id).await.unwrap();
        let d2 = svc.deploy_app(&app.id).await.unwrap();

        assert_eq!(svc.process_next_deployment().await.unwrap().id, d1.id);
        assert_eq!(svc.process_next_deployment().await.unwrap().id, d2.id);
        assert!(matches!(
            svc.process_next_deployment().await.unwrap_err(),
            ServiceError::NoWork
        ));
        assert_eq!(runtime.calls(), 2);
    }

    // ── listing and lookup ─────────────────────────────────────────

    #[tokio::test]
    async fn list_deployments_requires_id() {
        let svc = AppService::new(Arc::new(MemoryStore::new()));
        let err = svc.list_deployments("").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)), "got {err}");
    }

    #[tokio::test]
    async fn list_deployments_unknown_app_is_not_found() {
        let svc = AppService::new(Arc::new(MemoryStore::new()));
        let err = svc.list_deployments("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound), "got {err}");
    }

    #[tokio::test]
    async fn list_deployments_empty_history_is_ok() {
        let svc = AppService::new(Arc::new(MemoryStore::new()));
        let app = svc.create_app(hello_params()).await.unwrap();

        let history = svc.list_deployments(&app.id).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn get_app_guards_and_translates() {
        let svc = AppService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            svc.get_app("").await.unwrap_err(),
            ServiceError::InvalidInput(_)
        ));
        assert!(matches!(
            svc.get_app("missing").await.unwrap_err(),
            ServiceError::NotFound
        ));

        let app = svc.create_app(hello_params()).await.unwrap();
        assert_eq!(svc.get_app(&app.id).await.unwrap(), app);
        assert_eq!(svc.list_apps().await.unwrap().len(), 1);
    }
}
