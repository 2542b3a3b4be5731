//! Input validation for app creation.
//!
//! Pure predicates with no side effects. These are the only checks applied
//! to user-supplied app input; the domain constructor calls all of them.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Lowercase-alphanumeric segments joined by single hyphens.
static APP_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("app name pattern"));

/// Errors produced by input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid app name")]
    InvalidName,

    #[error("invalid image reference")]
    InvalidImage,

    #[error("invalid port")]
    InvalidPort,
}

/// Validate an app name.
///
/// The trimmed name must be one or more lowercase-alphanumeric segments
/// joined by single hyphens: no leading, trailing, or doubled hyphens, no
/// uppercase, no underscores, and not empty.
pub fn validate_app_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() || !APP_NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidName);
    }
    Ok(())
}

/// Validate an image reference.
///
/// Only requires a non-empty trimmed value; full reference parsing is left
/// to the container engine.
pub fn validate_image_ref(image: &str) -> Result<(), ValidationError> {
    if image.trim().is_empty() {
        return Err(ValidationError::InvalidImage);
    }
    Ok(())
}

/// Validate an optional port.
///
/// `None` is fine. The `u16` type already caps the range at 65535, so only
/// zero is rejected.
pub fn validate_port(port: Option<u16>) -> Result<(), ValidationError> {
    match port {
        Some(0) => Err(ValidationError::InvalidPort),
        _ => Ok(()),
    }
}
