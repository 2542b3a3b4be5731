//! skydock — local smoke-deploy tool.
//!
//! Wires a fresh in-memory store, a runtime provider, and the orchestration
//! service together to push one app through the whole pipeline: create,
//! queue, process. Useful for checking an edge/docker setup without any
//! API server in front.
//!
//! # Usage
//!
//! ```text
//! skydock deploy --name hello --image nginx:latest --port 8080
//! skydock deploy --name hello --image nginx:latest --runtime docker --config skydock.toml
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use skydock_core::{NewAppParams, SkydockConfig};
use skydock_orchestrator::AppService;
use skydock_runtime::{DockerRuntime, DockerRuntimeConfig, EdgeConfig, Runtime, StubRuntime};
use skydock_state::MemoryStore;

#[derive(Parser)]
#[command(name = "skydock", about = "Skydock smoke-deploy tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RuntimeKind {
    /// Deterministic stub, no container engine needed.
    Stub,
    /// Local Docker engine with Traefik labels.
    Docker,
}

#[derive(Subcommand)]
enum Command {
    /// Create an app, queue a deployment, and process it once.
    Deploy {
        /// App name (lowercase-alphanumeric segments joined by hyphens).
        #[arg(long)]
        name: String,

        /// Image reference to deploy.
        #[arg(long)]
        image: String,

        /// Container port to route to.
        #[arg(long)]
        port: Option<u16>,

        /// Skip edge routing; the workload runs without a URL.
        #[arg(long)]
        no_expose: bool,

        /// Environment variables, KEY=VALUE, repeatable.
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Runtime provider to deploy with.
        #[arg(long, value_enum, default_value = "stub")]
        runtime: RuntimeKind,

        /// Optional skydock.toml with edge/docker settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,skydock=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Deploy {
            name,
            image,
            port,
            no_expose,
            env,
            runtime,
            config,
        } => deploy_once(name, image, port, no_expose, env, runtime, config).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn deploy_once(
    name: String,
    image: String,
    port: Option<u16>,
    no_expose: bool,
    env: Vec<String>,
    runtime_kind: RuntimeKind,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = match &config_path {
        Some(path) => SkydockConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SkydockConfig::default(),
    };

    let edge: EdgeConfig = config.edge.clone().map(Into::into).unwrap_or_default();

    let runtime: Arc<dyn Runtime> = match runtime_kind {
        RuntimeKind::Stub => Arc::new(StubRuntime::new(edge.base_domain.clone())),
        RuntimeKind::Docker => {
            let docker_section = config.docker.unwrap_or(skydock_core::config::DockerSection {
                name_prefix: None,
                deploy_timeout_secs: None,
            });
            let defaults = DockerRuntimeConfig::default();
            let runtime_config = DockerRuntimeConfig {
                name_prefix: docker_section.name_prefix.unwrap_or(defaults.name_prefix),
                deploy_timeout: docker_section
                    .deploy_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.deploy_timeout),
                edge,
            };
            Arc::new(DockerRuntime::connect(runtime_config)?)
        }
    };

    let store = Arc::new(MemoryStore::new());
    let service = AppService::with_runtime(store, runtime);

    let app = service
        .create_app(NewAppParams {
            name,
            image,
            port,
            expose: Some(!no_expose),
            env: parse_env(&env)?,
        })
        .await?;
    info!(app_id = %app.id, name = %app.name, "app created");

    let queued = service.deploy_app(&app.id).await?;
    info!(deployment_id = %queued.id, "deployment queued");

    let dep = service.process_next_deployment().await?;
    match &dep.url {
        Some(url) => println!("{} running at {url}", app.name),
        None => println!("{} running (not exposed)", app.name),
    }
    Ok(())
}

fn parse_env(pairs: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut env = HashMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid env entry {pair:?}, expected KEY=VALUE");
        };
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}
