//! Core data types for connectivity discovery.
//!
//! - `Workload` - a pod-scheduling object (Deployment, Pod, CronJob, ...)
//! - `Service` - a Service with its declared ports and exposure
//! - `ConfigMapData` - a ConfigMap used as a lookup table
//! - `Connection` - a directed (source, target, link) fact

use crate::analyzer::netpol::context::ObjectMetadata;
use crate::analyzer::netpol::labels::{self, Map};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Namespace assumed for objects that do not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Resolve an empty namespace to [`DEFAULT_NAMESPACE`].
pub fn effective_namespace(namespace: &str) -> &str {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE
    } else {
        namespace
    }
}

/// Compare two namespaces, treating an undeclared namespace as `default`.
pub fn same_namespace(a: &str, b: &str) -> bool {
    effective_namespace(a) == effective_namespace(b)
}

/// Kinds of objects that schedule pods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    Pod,
    ReplicaSet,
    ReplicationController,
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::ReplicaSet => "ReplicaSet",
            Self::ReplicationController => "ReplicationController",
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a workload. Ordered by name first so sorted output reads by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkloadId {
    pub name: String,
    pub namespace: String,
    pub kind: WorkloadKind,
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// A reference to a single key of a ConfigMap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMapKeyRef {
    /// Full name, `namespace/name`.
    pub config_map: String,
    pub key: String,
}

/// A pod-scheduling object and the network facts found in its pod template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub kind: WorkloadKind,
    /// Labels of the pods this workload schedules.
    #[serde(default)]
    pub labels: Map,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Values that look like network addresses, in discovery order.
    #[serde(default)]
    pub network_addresses: Vec<String>,
    /// Whole ConfigMaps imported through `envFrom`, as `namespace/name`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_map_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_map_key_refs: Vec<ConfigMapKeyRef>,
    /// Service ports this workload addresses explicitly. Only set on the
    /// copies held by [`Connection::source`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_ports: Vec<ServicePort>,
    /// Where the workload was declared, for error locations.
    #[serde(skip)]
    pub origin: Option<ObjectMetadata>,
}

impl Workload {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, kind: WorkloadKind) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind,
            labels: Map::new(),
            service_account: None,
            image: None,
            network_addresses: Vec::new(),
            config_map_refs: Vec::new(),
            config_map_key_refs: Vec::new(),
            used_ports: Vec::new(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: ObjectMetadata) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn id(&self) -> WorkloadId {
        WorkloadId {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            kind: self.kind,
        }
    }

    pub fn same_identity(&self, other: &Workload) -> bool {
        self.name == other.name && self.namespace == other.namespace && self.kind == other.kind
    }

    /// `namespace/name` (or `name` when no namespace is declared).
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    /// Full ConfigMap name for a reference made from this workload.
    pub fn config_map_full_name(&self, config_map: &str) -> String {
        format!("{}/{}", effective_namespace(&self.namespace), config_map)
    }
}

/// How far a single service port is reachable beyond its selected pods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortExposure {
    /// Reachable from every namespace.
    #[serde(default)]
    pub to_cluster: bool,
    /// Reachable from these namespaces only.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub to_namespaces: BTreeSet<String>,
}

/// A port declared on a Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub port: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<IntOrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "is_default_exposure")]
    pub exposure: PortExposure,
}

fn is_default_exposure(exposure: &PortExposure) -> bool {
    *exposure == PortExposure::default()
}

impl ServicePort {
    pub fn new(port: i32) -> Self {
        Self {
            name: None,
            port,
            target_port: None,
            protocol: None,
            exposure: PortExposure::default(),
        }
    }

    pub fn with_target_port(mut self, target_port: IntOrString) -> Self {
        self.target_port = Some(target_port);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// The pod port traffic lands on; the service port when unset or zero.
    pub fn effective_target_port(&self) -> IntOrString {
        match &self.target_port {
            Some(IntOrString::Int(0)) | None => IntOrString::Int(self.port),
            Some(IntOrString::String(s)) if s.is_empty() => IntOrString::Int(self.port),
            Some(target) => target.clone(),
        }
    }

    /// Protocol, defaulting to TCP.
    pub fn protocol(&self) -> &str {
        self.protocol.as_deref().filter(|p| !p.is_empty()).unwrap_or("TCP")
    }

    /// Whether a port reference (number or name) designates this port.
    ///
    /// Numbers match the service port or a numeric target port; names match
    /// the port name or a named target port.
    pub fn matches_ref(&self, port_ref: &IntOrString) -> bool {
        match port_ref {
            IntOrString::Int(n) => {
                self.port == *n || matches!(&self.target_port, Some(IntOrString::Int(t)) if t == n)
            }
            IntOrString::String(s) => {
                self.name.as_deref() == Some(s.as_str())
                    || matches!(&self.target_port, Some(IntOrString::String(t)) if t == s)
                    || s.parse::<i32>().map(|n| self.port == n).unwrap_or(false)
            }
        }
    }
}

/// A Service and how widely it is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default)]
    pub selector: Map,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    /// Backed by a LoadBalancer or NodePort.
    #[serde(default)]
    pub exposed_externally: bool,
}

impl Service {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            selector: Map::new(),
            ports: Vec::new(),
            exposed_externally: false,
        }
    }

    /// Whether this service fronts the workload. A service without a
    /// selector fronts nothing.
    pub fn selects(&self, workload: &Workload) -> bool {
        !self.selector.is_empty()
            && same_namespace(&self.namespace, &workload.namespace)
            && labels::contains(&workload.labels, &self.selector)
    }

    /// DNS names under which a workload in `source_namespace` can reach this service.
    pub fn addressable_forms(&self, source_namespace: &str) -> Vec<String> {
        let mut forms = Vec::with_capacity(4);
        if same_namespace(&self.namespace, source_namespace) {
            forms.push(self.name.clone());
        }
        if !self.namespace.is_empty() {
            forms.push(format!("{}.{}", self.name, self.namespace));
            forms.push(format!("{}.{}.svc", self.name, self.namespace));
            forms.push(format!("{}.{}.svc.cluster.local", self.name, self.namespace));
        }
        forms
    }

    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }
}

/// A ConfigMap's data, keyed by `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMapData {
    pub full_name: String,
    pub data: Map,
}

/// A directed connection: `source` reaches `target` through `link`.
///
/// No source means the target is reached from an unknown, possibly external, origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: Option<Workload>,
    pub target: Workload,
    pub link: Service,
}

impl Connection {
    pub fn new(source: Option<Workload>, target: Workload, link: Service) -> Self {
        Self {
            source,
            target,
            link,
        }
    }

    /// Ports this connection uses: the source's explicit ports, else every
    /// port on the link.
    pub fn ports(&self) -> &[ServicePort] {
        match &self.source {
            Some(source) if !source.used_ports.is_empty() => &source.used_ports,
            _ => &self.link.ports,
        }
    }
}
