//! Traefik v2 label synthesis for exposed app containers.
//!
//! Traefik reads these labels off the container and turns them into a
//! router (request matching plus entrypoints) and a service (the upstream
//! port to forward to). Naming conventions:
//!
//! - host    = `<name>.<base_domain>`   ("hello.example.com")
//! - router  = `app-<name>`             ("app-hello")
//! - service = `svc-<name>`             ("svc-hello")
//!
//! `traefik.docker.network` matters when a container sits on several
//! networks: it tells Traefik which one to dial the container on.

use std::collections::HashMap;

use super::EdgeConfig;

/// Build the label set routing one app container. Pure function of the app
/// name, the internal container port, and the edge config; emits no keys
/// beyond the ones documented here.
pub fn labels_for_app(name: &str, port: u16, edge: &EdgeConfig) -> HashMap<String, String> {
    let host = format!("{name}.{}", edge.base_domain);
    let router = format!("app-{name}");
    let service = format!("svc-{name}");

    let mut labels = HashMap::from([
        ("traefik.enable".to_string(), "true".to_string()),
        (
            "traefik.docker.network".to_string(),
            edge.network.clone(),
        ),
        (
            format!("traefik.http.routers.{router}.rule"),
            format!("Host(`{host}`)"),
        ),
        (
            format!("traefik.http.routers.{router}.entrypoints"),
            edge.scheme.clone(),
        ),
        (
            format!("traefik.http.services.{service}.loadbalancer.server.port"),
            port.to_string(),
        ),
    ]);

    if edge.enable_tls {
        labels.insert(format!("traefik.http.routers.{router}.tls"), "true".to_string());
        if let Some(resolver) = &edge.cert_resolver {
            labels.insert(
                format!("traefik.http.routers.{router}.tls.certresolver"),
                resolver.clone(),
            );
        }
    }

    labels
}
