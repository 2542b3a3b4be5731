//! Domain entities: apps and their deployments.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{ValidationError, validate_app_name, validate_image_ref, validate_port};

/// Lifecycle state of an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStatus {
    Created,
    Building,
    Running,
    Failed,
    Paused,
}

/// Lifecycle state of a single deployment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Queued,
    Building,
    Deploying,
    Running,
    Failed,
}

/// A named, deployable unit: an image reference plus optional network
/// configuration. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub name: String,
    pub image: String,
    pub port: Option<u16>,
    pub expose: bool,
    pub env: HashMap<String, String>,
    pub status: AppStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for constructing an [`App`]. Validation happens in [`App::new`].
#[derive(Debug, Clone, Default)]
pub struct NewAppParams {
    pub name: String,
    pub image: String,
    pub port: Option<u16>,
    /// `None` defaults to exposed.
    pub expose: Option<bool>,
    pub env: HashMap<String, String>,
}

impl App {
    /// Validate the params and build an app with a fresh ID and UTC
    /// timestamps. The only status this core ever assigns at creation is
    /// [`AppStatus::Created`].
    pub fn new(params: NewAppParams) -> Result<Self, ValidationError> {
        validate_app_name(&params.name)?;
        validate_image_ref(&params.image)?;
        validate_port(params.port)?;

        let now = Utc::now();
        Ok(App {
            id: Uuid::new_v4().to_string(),
            name: params.name.trim().to_string(),
            image: params.image.trim().to_string(),
            port: params.port,
            expose: params.expose.unwrap_or(true),
            env: params.env,
            status: AppStatus::Created,
            created_at: now,
            updated_at: now,
        })
    }
}

/// One attempt to run an app's image through to a terminal status.
///
/// `url` is set only on successful exposed deploys; `error` only when the
/// deployment failed. The owning app never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub app_id: String,
    pub status: DeploymentStatus,
    pub url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Build a queued deployment for an app with a fresh ID and timestamps.
    pub fn new(app_id: &str) -> Self {
        let now = Utc::now();
        Deployment {
            id: Uuid::new_v4().to_string(),
            app_id: app_id.to_string(),
            status: DeploymentStatus::Queued,
            url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
