//! Deterministic stub runtime for tests and local development.

use async_trait::async_trait;

use skydock_core::App;

use crate::error::RuntimeResult;
use crate::Runtime;

/// Runtime that "deploys" by computing the URL an exposed app would get,
/// without touching any container engine.
#[derive(Debug, Clone)]
pub struct StubRuntime {
    base_domain: String,
    scheme: String,
}

impl StubRuntime {
    /// Create a stub serving HTTPS URLs under the given base domain.
    pub fn new(base_domain: impl Into<String>) -> Self {
        StubRuntime {
            base_domain: base_domain.into().trim().to_string(),
            scheme: "https".to_string(),
        }
    }

    /// Override the URL scheme (e.g. "http" for plain local setups).
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }
}

#[async_trait]
impl Runtime for StubRuntime {
    async fn deploy(&self, app: &App) -> RuntimeResult<Option<String>> {
        if !app.expose {
            return Ok(None);
        }
        Ok(Some(format!(
            "{}://{}.{}",
            self.scheme, app.name, self.base_domain
        )))
    }
}
