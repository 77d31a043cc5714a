//! Exposure directives: Ingress, OpenShift Route and Gateway API routes.
//!
//! Each directive names a backend Service (and optionally one of its ports)
//! that must be reachable from outside its namespace. Directives are recorded
//! in an [`ExposureTable`] and stamped onto the matching service ports once
//! every object has been read.

use crate::analyzer::netpol::context::manifests::{GatewayRoute, Route};
use crate::analyzer::netpol::types::effective_namespace;
use k8s_openapi::api::networking::v1::{Ingress, IngressBackend, ServiceBackendPort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::{BTreeMap, BTreeSet};

/// Annotation on a directive limiting exposure to a comma-separated list of namespaces.
pub const ALLOWED_NAMESPACES_ANNOTATION: &str = "netpol-synth.io/allowed-namespaces";

/// Who may reach an exposed port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposureScope {
    Cluster,
    Namespaces(BTreeSet<String>),
}

impl ExposureScope {
    /// Scope requested by a directive's annotations; cluster-wide by default.
    pub fn from_annotations(annotations: Option<&BTreeMap<String, String>>) -> Self {
        let namespaces: BTreeSet<String> = annotations
            .and_then(|a| a.get(ALLOWED_NAMESPACES_ANNOTATION))
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|ns| !ns.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if namespaces.is_empty() {
            Self::Cluster
        } else {
            Self::Namespaces(namespaces)
        }
    }
}

/// One directive's request against a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureEntry {
    /// The port referenced, by number or name; every port when `None`.
    pub port: Option<IntOrString>,
    pub scope: ExposureScope,
}

/// Exposure requests keyed by namespace, then service name.
#[derive(Debug, Clone, Default)]
pub struct ExposureTable {
    entries: BTreeMap<String, BTreeMap<String, Vec<ExposureEntry>>>,
}

impl ExposureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expose(
        &mut self,
        namespace: &str,
        service: &str,
        port: Option<IntOrString>,
        scope: ExposureScope,
    ) {
        let entry = ExposureEntry { port, scope };
        let entries = self
            .entries
            .entry(effective_namespace(namespace).to_string())
            .or_default()
            .entry(service.to_string())
            .or_default();
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    pub fn lookup(&self, namespace: &str, service: &str) -> &[ExposureEntry] {
        self.entries
            .get(effective_namespace(namespace))
            .and_then(|services| services.get(service))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (namespace, service) pairs with at least one request.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }
}

fn backend_port(port: &ServiceBackendPort) -> Option<IntOrString> {
    match (port.number, port.name.as_deref()) {
        (Some(number), _) if number != 0 => Some(IntOrString::Int(number)),
        (_, Some(name)) if !name.is_empty() => Some(IntOrString::String(name.to_string())),
        _ => None,
    }
}

fn record_ingress_backend(
    table: &mut ExposureTable,
    namespace: &str,
    backend: &IngressBackend,
    scope: &ExposureScope,
) {
    if let Some(service) = &backend.service {
        let port = service.port.as_ref().and_then(backend_port);
        table.expose(namespace, &service.name, port, scope.clone());
    }
}

/// Record every Service backend of an Ingress.
pub fn record_ingress(table: &mut ExposureTable, ingress: &Ingress) {
    let namespace = ingress.metadata.namespace.as_deref().unwrap_or_default();
    let scope = ExposureScope::from_annotations(ingress.metadata.annotations.as_ref());
    let Some(spec) = &ingress.spec else {
        return;
    };

    if let Some(backend) = &spec.default_backend {
        record_ingress_backend(table, namespace, backend, &scope);
    }
    for rule in spec.rules.iter().flatten() {
        for path in rule.http.iter().flat_map(|http| &http.paths) {
            record_ingress_backend(table, namespace, &path.backend, &scope);
        }
    }
}

/// Record the Service targets of an OpenShift Route.
pub fn record_route(table: &mut ExposureTable, route: &Route) {
    let namespace = route.metadata.namespace.as_deref().unwrap_or_default();
    let scope = ExposureScope::from_annotations(route.metadata.annotations.as_ref());
    let port = route.spec.port.as_ref().map(|p| p.target_port.clone());

    for target in std::iter::once(&route.spec.to).chain(&route.spec.alternate_backends) {
        if target.is_service() && !target.name.is_empty() {
            table.expose(namespace, &target.name, port.clone(), scope.clone());
        }
    }
}

/// Record the Service backends of an HTTPRoute or GRPCRoute.
pub fn record_gateway_route(table: &mut ExposureTable, route: &GatewayRoute) {
    let namespace = route.metadata.namespace.as_deref().unwrap_or_default();
    let scope = ExposureScope::from_annotations(route.metadata.annotations.as_ref());

    for backend in route.spec.rules.iter().flat_map(|rule| &rule.backend_refs) {
        if !backend.is_service() {
            continue;
        }
        let backend_namespace = backend.namespace.as_deref().unwrap_or(namespace);
        let port = backend.port.map(IntOrString::Int);
        table.expose(backend_namespace, &backend.name, port, scope.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingress(yaml: &str) -> Ingress {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_record_ingress_backends() {
        let ing = ingress(
            r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
  namespace: shop
spec:
  defaultBackend:
    service:
      name: fallback
      port:
        number: 8080
  rules:
  - host: shop.example.com
    http:
      paths:
      - path: /
        pathType: Prefix
        backend:
          service:
            name: frontend
            port:
              name: http
"#,
        );
        let mut table = ExposureTable::new();
        record_ingress(&mut table, &ing);

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.lookup("shop", "fallback"),
            &[ExposureEntry {
                port: Some(IntOrString::Int(8080)),
                scope: ExposureScope::Cluster
            }]
        );
        assert_eq!(
            table.lookup("shop", "frontend")[0].port,
            Some(IntOrString::String("http".into()))
        );
        assert!(table.lookup("other", "frontend").is_empty());
    }

    #[test]
    fn test_allowed_namespaces_annotation() {
        let ing = ingress(
            r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
  annotations:
    netpol-synth.io/allowed-namespaces: "ingress-nginx, monitoring"
spec:
  defaultBackend:
    service:
      name: frontend
"#,
        );
        let mut table = ExposureTable::new();
        record_ingress(&mut table, &ing);

        let entries = table.lookup("default", "frontend");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].port, None);
        assert_eq!(
            entries[0].scope,
            ExposureScope::Namespaces(
                ["ingress-nginx", "monitoring"]
                    .into_iter()
                    .map(String::from)
                    .collect()
            )
        );
    }

    #[test]
    fn test_record_route() {
        let route: Route = serde_yaml::from_str(
            r#"
metadata:
  name: web
  namespace: shop
spec:
  to:
    kind: Service
    name: frontend
  alternateBackends:
  - name: frontend-canary
  port:
    targetPort: 8080
"#,
        )
        .unwrap();
        let mut table = ExposureTable::new();
        record_route(&mut table, &route);

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.lookup("shop", "frontend-canary")[0].port,
            Some(IntOrString::Int(8080))
        );
    }

    #[test]
    fn test_record_gateway_route_cross_namespace() {
        let route: GatewayRoute = serde_yaml::from_str(
            r#"
metadata:
  name: web
  namespace: gateway
spec:
  rules:
  - backendRefs:
    - name: frontend
      namespace: shop
      port: 80
    - name: bucket
      group: storage.example.com
      kind: Bucket
"#,
        )
        .unwrap();
        let mut table = ExposureTable::new();
        record_gateway_route(&mut table, &route);

        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("shop", "frontend")[0].port, Some(IntOrString::Int(80)));
    }

    #[test]
    fn test_duplicate_requests_are_merged() {
        let mut table = ExposureTable::new();
        table.expose("", "web", None, ExposureScope::Cluster);
        table.expose("default", "web", None, ExposureScope::Cluster);
        assert_eq!(table.lookup("", "web").len(), 1);
    }
}
