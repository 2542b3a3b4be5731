//! Docker runtime for deploying apps on the local container engine.
//!
//! A deploy pulls the image, resolves the port to route to, replaces any
//! previous container for the app, and creates and starts the new one. For
//! exposed apps the container is attached to the edge-router network and
//! carries the Traefik labels synthesized in [`labels`].

pub mod labels;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, RestartPolicy, RestartPolicyNameEnum};
use bollard::Docker;
use futures_util::TryStreamExt;
use tracing::{debug, info};

use skydock_core::{config::EdgeSection, App};

use crate::error::{RuntimeError, RuntimeResult};
use crate::Runtime;

/// Label identifying containers managed by Skydock.
const MANAGED_LABEL: &str = "skydock.app";

/// Entrypoint used when the edge config leaves the scheme unset.
const DEFAULT_ENTRYPOINT: &str = "web";

/// Edge-router (Traefik) settings for exposed apps.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Root domain for app hostnames; apps become `<name>.<base_domain>`.
    pub base_domain: String,
    /// Docker network the edge router reaches containers on.
    pub network: String,
    /// Router entrypoint name ("web" for http, "websecure" for https).
    pub scheme: String,
    /// Terminate TLS at the edge.
    pub enable_tls: bool,
    /// Certificate resolver name, used only when TLS is enabled.
    pub cert_resolver: Option<String>,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        EdgeConfig {
            base_domain: "localtest.me".to_string(),
            network: "traefik".to_string(),
            scheme: DEFAULT_ENTRYPOINT.to_string(),
            enable_tls: false,
            cert_resolver: None,
        }
    }
}

impl From<EdgeSection> for EdgeConfig {
    fn from(section: EdgeSection) -> Self {
        EdgeConfig {
            base_domain: section.base_domain,
            network: section.network,
            scheme: section.scheme.unwrap_or_else(|| DEFAULT_ENTRYPOINT.to_string()),
            enable_tls: section.enable_tls.unwrap_or(false),
            cert_resolver: section.cert_resolver,
        }
    }
}

/// Construction options for [`DockerRuntime`].
#[derive(Debug, Clone)]
pub struct DockerRuntimeConfig {
    /// Prefix for managed container names.
    pub name_prefix: String,
    /// Upper bound on a single deploy, pull included.
    pub deploy_timeout: Duration,
    pub edge: EdgeConfig,
}

impl Default for DockerRuntimeConfig {
    fn default() -> Self {
        DockerRuntimeConfig {
            name_prefix: "skydock-".to_string(),
            deploy_timeout: Duration::from_secs(120),
            edge: EdgeConfig::default(),
        }
    }
}

/// Runtime provider backed by the local Docker engine.
pub struct DockerRuntime {
    docker: Docker,
    name_prefix: String,
    deploy_timeout: Duration,
    edge: EdgeConfig,
}

impl DockerRuntime {
    /// Connect to the local Docker engine with the given options.
    pub fn connect(config: DockerRuntimeConfig) -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(RuntimeError::Connect)?;
        Ok(DockerRuntime {
            docker,
            name_prefix: config.name_prefix,
            deploy_timeout: config.deploy_timeout,
            edge: config.edge,
        })
    }

    /// Edge config with the entrypoint scheme defaulted when unset.
    fn effective_edge(&self) -> EdgeConfig {
        let mut edge = self.edge.clone();
        if edge.scheme.trim().is_empty() {
            edge.scheme = DEFAULT_ENTRYPOINT.to_string();
        }
        edge
    }

    async fn deploy_inner(&self, app: &App) -> RuntimeResult<Option<String>> {
        if app.image.trim().is_empty() {
            return Err(RuntimeError::EmptyImage);
        }

        let edge = self.effective_edge();
        if app.expose {
            if edge.base_domain.trim().is_empty() {
                return Err(RuntimeError::MissingEdgeConfig("base domain"));
            }
            if edge.network.trim().is_empty() {
                return Err(RuntimeError::MissingEdgeConfig("routing network"));
            }
        }

        self.pull(&app.image).await?;

        let port = self.resolve_port(app).await?;

        // Redeploys replace the previous container for this app.
        let name = format!("{}{}", self.name_prefix, app.name);
        self.remove_if_exists(&name).await?;

        let mut container_labels = HashMap::from([(MANAGED_LABEL.to_string(), app.name.clone())]);
        if app.expose {
            let port = port.ok_or(RuntimeError::AmbiguousPort)?;
            container_labels.extend(labels::labels_for_app(&app.name, port, &edge));
        }

        let exposed_ports = port.map(|p| {
            HashMap::from([(format!("{p}/tcp"), HashMap::new())])
        });

        let host_config = HostConfig {
            publish_all_ports: Some(false),
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                maximum_retry_count: None,
            }),
            network_mode: app.expose.then(|| edge.network.clone()),
            ..Default::default()
        };

        let config = Config {
            image: Some(app.image.clone()),
            labels: Some(container_labels),
            env: env_to_list(&app.env),
            exposed_ports,
            host_config: Some(host_config),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(RuntimeError::Create)?;

        self.docker
            .start_container(&name, None::<StartContainerOptions<String>>)
            .await
            .map_err(RuntimeError::Start)?;

        info!(app = %app.name, container_id = %created.id, ?port, exposed = app.expose, "container started");

        if !app.expose {
            return Ok(None);
        }
        let scheme = if edge.enable_tls { "https" } else { "http" };
        Ok(Some(format!("{scheme}://{}.{}", app.name, edge.base_domain)))
    }

    /// Pull an image, draining the progress stream so the pull is complete
    /// before anything depends on it.
    async fn pull(&self, image: &str) -> RuntimeResult<()> {
        debug!(%image, "pulling image");
        let options = CreateImageOptions::<String> {
            from_image: image.to_string(),
            ..Default::default()
        };
        let mut progress = self.docker.create_image(Some(options), None, None);
        while progress
            .try_next()
            .await
            .map_err(RuntimeError::Pull)?
            .is_some()
        {}
        Ok(())
    }

    /// Remove a container by name, treating "not found" as success.
    async fn remove_if_exists(&self, name: &str) -> RuntimeResult<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.docker.remove_container(name, Some(options)).await {
            Ok(()) => {
                debug!(container = %name, "previous container removed");
                Ok(())
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(()),
            Err(err) => Err(RuntimeError::Remove(err)),
        }
    }

    /// Choose the container port: the app's own port wins; otherwise an
    /// exposed app must have an image that declares exactly one port.
    async fn resolve_port(&self, app: &App) -> RuntimeResult<Option<u16>> {
        if let Some(port) = app.port {
            if port == 0 {
                return Err(RuntimeError::InvalidPort(port));
            }
            return Ok(Some(port));
        }
        if !app.expose {
            return Ok(None);
        }
        self.port_from_image(&app.image).await.map(Some)
    }

    async fn port_from_image(&self, image: &str) -> RuntimeResult<u16> {
        let inspect = self
            .docker
            .inspect_image(image)
            .await
            .map_err(RuntimeError::Inspect)?;

        let mut declared: Vec<String> = inspect
            .config
            .and_then(|c| c.exposed_ports)
            .map(|ports| ports.into_keys().collect())
            .unwrap_or_default();
        declared.sort();

        if declared.len() != 1 {
            return Err(RuntimeError::AmbiguousPort);
        }
        parse_exposed_port(&declared[0])
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    async fn deploy(&self, app: &App) -> RuntimeResult<Option<String>> {
        match tokio::time::timeout(self.deploy_timeout, self.deploy_inner(app)).await {
            Ok(result) => result,
            Err(_) => Err(RuntimeError::DeadlineExceeded(self.deploy_timeout.as_secs())),
        }
    }
}

/// Parse a port number out of an image's exposed-port spec ("8080/tcp").
fn parse_exposed_port(spec: &str) -> RuntimeResult<u16> {
    let trimmed = spec.trim();
    let number = trimmed.split('/').next().unwrap_or_default();
    let port: u16 = number
        .parse()
        .map_err(|_| RuntimeError::BadPortSpec(spec.to_string()))?;
    if port == 0 {
        return Err(RuntimeError::InvalidPort(port));
    }
    Ok(port)
}

/// Render an env map as "KEY=VALUE" pairs, sorted by key so container
/// configs are deterministic.
fn env_to_list(env: &HashMap<String, String>) -> Option<Vec<String>> {
    if env.is_empty() {
        return None;
    }
    let mut keys: Vec<&String> = env.keys().collect();
    keys.sort();
    Some(keys.into_iter().map(|k| format!("{k}={}", env[k])).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exposed_port_variants() {
        assert_eq!(parse_exposed_port("8080/tcp").unwrap(), 8080);
        assert_eq!(parse_exposed_port("80").unwrap(), 80);
        assert_eq!(parse_exposed_port("  443/tcp  ").unwrap(), 443);

        assert!(matches!(
            parse_exposed_port(""),
            Err(RuntimeError::BadPortSpec(_))
        ));
        assert!(matches!(
            parse_exposed_port("http/tcp"),
            Err(RuntimeError::BadPortSpec(_))
        ));
        assert!(matches!(
            parse_exposed_port("0/tcp"),
            Err(RuntimeError::InvalidPort(0))
        ));
    }

    #[test]
    fn env_list_is_sorted_by_key() {
        let env = HashMap::from([
            ("ZED".to_string(), "3".to_string()),
            ("ALPHA".to_string(), "1".to_string()),
            ("MID".to_string(), "2".to_string()),
        ]);
        assert_eq!(
            env_to_list(&env).unwrap(),
            vec!["ALPHA=1", "MID=2", "ZED=3"]
        );
    }

    #[test]
    fn empty_env_omitted() {
        assert!(env_to_list(&HashMap::new()).is_none());
    }

    #[test]
    fn edge_section_defaults() {
        let edge: EdgeConfig = EdgeSection {
            base_domain: "example.com".to_string(),
            network: "traefik".to_string(),
            scheme: None,
            enable_tls: None,
            cert_resolver: None,
        }
        .into();
        assert_eq!(edge.scheme, "web");
        assert!(!edge.enable_tls);
    }
}
