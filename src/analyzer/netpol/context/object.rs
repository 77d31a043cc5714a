//! Kubernetes object wrappers for connectivity discovery.

use crate::analyzer::netpol::context::manifests::{
    ControllerManifest, CronJobManifest, GatewayRoute, PodManifest, Route,
};
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::api::networking::v1 as networking;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Where a parsed object came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// The file path where this object was defined.
    pub file_path: PathBuf,
    /// Line number in the source file (1-indexed).
    pub line_number: Option<usize>,
    /// Index of the YAML document within the file (0-indexed).
    pub doc_index: Option<usize>,
}

impl ObjectMetadata {
    /// Create new metadata for an object from a file.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            line_number: None,
            doc_index: None,
        }
    }

    /// Set the line number.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }

    /// Set the document index.
    pub fn with_doc_index(mut self, index: usize) -> Self {
        self.doc_index = Some(index);
        self
    }
}

/// A parsed Kubernetes object.
#[derive(Debug, Clone)]
pub struct Object {
    /// Metadata about where this object came from.
    pub metadata: ObjectMetadata,
    /// The Kubernetes object data.
    pub k8s_object: K8sObject,
}

impl Object {
    pub fn new(metadata: ObjectMetadata, k8s_object: K8sObject) -> Self {
        Self {
            metadata,
            k8s_object,
        }
    }

    pub fn kind(&self) -> &str {
        self.k8s_object.kind()
    }

    pub fn name(&self) -> &str {
        self.k8s_object.name()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.k8s_object.namespace()
    }
}

/// The closed set of kinds connectivity discovery understands.
#[derive(Debug, Clone)]
pub enum K8sObject {
    // Workloads
    Pod(Box<PodManifest>),
    ReplicaSet(Box<ControllerManifest>),
    ReplicationController(Box<ControllerManifest>),
    Deployment(Box<ControllerManifest>),
    StatefulSet(Box<ControllerManifest>),
    DaemonSet(Box<ControllerManifest>),
    Job(Box<ControllerManifest>),
    CronJob(Box<CronJobManifest>),

    // Services & config
    Service(Box<core::Service>),
    ConfigMap(Box<core::ConfigMap>),

    // Exposure directives
    Ingress(Box<networking::Ingress>),
    Route(Box<Route>),
    HttpRoute(Box<GatewayRoute>),
    GrpcRoute(Box<GatewayRoute>),

    // Everything else
    Unknown(Box<UnknownObject>),
}

/// An object of a kind that plays no part in connectivity.
#[derive(Debug, Clone, Default)]
pub struct UnknownObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
}

fn convert<T: DeserializeOwned>(value: serde_yaml::Value) -> Result<Box<T>, serde_yaml::Error> {
    serde_yaml::from_value(value).map(Box::new)
}

impl K8sObject {
    /// Convert a decoded document into a typed object, dispatching on `kind`.
    ///
    /// Unknown kinds never fail; recognized kinds fail when the document
    /// does not have the shape of that kind.
    pub fn from_value(
        api_version: &str,
        kind: &str,
        value: serde_yaml::Value,
    ) -> Result<Self, serde_yaml::Error> {
        let object = match kind {
            "Pod" => Self::Pod(convert(value)?),
            "ReplicaSet" => Self::ReplicaSet(convert(value)?),
            "ReplicationController" => Self::ReplicationController(convert(value)?),
            "Deployment" => Self::Deployment(convert(value)?),
            "StatefulSet" => Self::StatefulSet(convert(value)?),
            "DaemonSet" => Self::DaemonSet(convert(value)?),
            "Job" => Self::Job(convert(value)?),
            "CronJob" => Self::CronJob(convert(value)?),
            "Service" => Self::Service(convert(value)?),
            "ConfigMap" => Self::ConfigMap(convert(value)?),
            "Ingress" => Self::Ingress(convert(value)?),
            "Route" => Self::Route(convert(value)?),
            "HTTPRoute" => Self::HttpRoute(convert(value)?),
            "GRPCRoute" => Self::GrpcRoute(convert(value)?),
            _ => {
                let metadata = match value.get("metadata") {
                    Some(meta) => serde_yaml::from_value(meta.clone()).unwrap_or_default(),
                    None => ObjectMeta::default(),
                };
                Self::Unknown(Box::new(UnknownObject {
                    api_version: api_version.to_string(),
                    kind: kind.to_string(),
                    metadata,
                }))
            }
        };
        Ok(object)
    }

    /// Get the object kind as written in manifests.
    pub fn kind(&self) -> &str {
        match self {
            Self::Pod(_) => "Pod",
            Self::ReplicaSet(_) => "ReplicaSet",
            Self::ReplicationController(_) => "ReplicationController",
            Self::Deployment(_) => "Deployment",
            Self::StatefulSet(_) => "StatefulSet",
            Self::DaemonSet(_) => "DaemonSet",
            Self::Job(_) => "Job",
            Self::CronJob(_) => "CronJob",
            Self::Service(_) => "Service",
            Self::ConfigMap(_) => "ConfigMap",
            Self::Ingress(_) => "Ingress",
            Self::Route(_) => "Route",
            Self::HttpRoute(_) => "HTTPRoute",
            Self::GrpcRoute(_) => "GRPCRoute",
            Self::Unknown(u) => &u.kind,
        }
    }

    /// Standard object metadata.
    pub fn object_meta(&self) -> &ObjectMeta {
        match self {
            Self::Pod(d) => &d.metadata,
            Self::ReplicaSet(d)
            | Self::ReplicationController(d)
            | Self::Deployment(d)
            | Self::StatefulSet(d)
            | Self::DaemonSet(d)
            | Self::Job(d) => &d.metadata,
            Self::CronJob(d) => &d.metadata,
            Self::Service(d) => &d.metadata,
            Self::ConfigMap(d) => &d.metadata,
            Self::Ingress(d) => &d.metadata,
            Self::Route(d) => &d.metadata,
            Self::HttpRoute(d) | Self::GrpcRoute(d) => &d.metadata,
            Self::Unknown(d) => &d.metadata,
        }
    }

    /// Get the object name.
    pub fn name(&self) -> &str {
        self.object_meta().name.as_deref().unwrap_or_default()
    }

    /// Get the object namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.object_meta().namespace.as_deref()
    }
}
