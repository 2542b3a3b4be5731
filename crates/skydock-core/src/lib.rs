//! skydock-core — shared domain model for Skydock.
//!
//! Defines the two entities the platform orchestrates — [`App`] and
//! [`Deployment`] — together with the validation rules enforced at
//! construction time and the `skydock.toml` configuration parser.
//!
//! # Architecture
//!
//! Entities are plain values. The store owns the canonical copies and every
//! other component works on clones, so nothing outside the store can mutate
//! a persisted record. `App::new` is the single gate through which app input
//! enters the system; it never produces an invalid app.

pub mod config;
pub mod domain;
pub mod validate;

pub use config::SkydockConfig;
pub use domain::{App, AppStatus, Deployment, DeploymentStatus, NewAppParams};
pub use validate::{ValidationError, validate_app_name, validate_image_ref, validate_port};
