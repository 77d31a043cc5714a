//! Simplified manifest shapes for the kinds that are not taken from
//! `k8s-openapi` directly.
//!
//! Workloads only need their pod template, so they are decoded into the
//! handful of fields connectivity discovery reads. Routes (OpenShift and
//! Gateway API) are not part of the core API and are modeled here as well.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

// ============================================================================
// Workloads
// ============================================================================

/// Deployment, StatefulSet, DaemonSet, ReplicaSet, ReplicationController and Job:
/// every kind whose pods come from `spec.template`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerManifest {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ControllerSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerSpec {
    #[serde(default)]
    pub template: Option<PodTemplate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CronJobManifest {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: CronJobSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobSpec {
    #[serde(default)]
    pub job_template: Option<JobTemplate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobTemplate {
    #[serde(default)]
    pub spec: Option<ControllerSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodManifest {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: Option<PodSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodTemplate {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: Option<PodSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub service_account_name: Option<String>,
    /// Deprecated alias of `serviceAccountName`.
    #[serde(default)]
    pub service_account: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub init_containers: Vec<Container>,
}

impl PodSpec {
    /// Regular containers followed by init containers.
    pub fn all_containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter().chain(self.init_containers.iter())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub env_from: Vec<EnvFromSource>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub value_from: Option<EnvVarSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    #[serde(default)]
    pub config_map_key_ref: Option<ConfigMapKeySelector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigMapKeySelector {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvFromSource {
    #[serde(default)]
    pub config_map_ref: Option<ConfigMapEnvSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigMapEnvSource {
    pub name: String,
}

// ============================================================================
// Routes
// ============================================================================

/// OpenShift `route.openshift.io/v1` Route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: RouteSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub to: RouteTargetReference,
    #[serde(default)]
    pub alternate_backends: Vec<RouteTargetReference>,
    #[serde(default)]
    pub port: Option<RoutePort>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTargetReference {
    /// `Service` when omitted.
    #[serde(default)]
    pub kind: Option<String>,
    pub name: String,
}

impl RouteTargetReference {
    pub fn is_service(&self) -> bool {
        matches!(self.kind.as_deref(), None | Some("") | Some("Service"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    pub target_port: IntOrString,
}

/// Gateway API HTTPRoute or GRPCRoute; both carry `rules[].backendRefs[]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayRoute {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: GatewayRouteSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayRouteSpec {
    #[serde(default)]
    pub rules: Vec<GatewayRouteRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRouteRule {
    #[serde(default)]
    pub backend_refs: Vec<BackendRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendRef {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub port: Option<i32>,
}

impl BackendRef {
    /// Core-group Service backends only; other backends are not Services.
    pub fn is_service(&self) -> bool {
        matches!(self.group.as_deref(), None | Some(""))
            && matches!(self.kind.as_deref(), None | Some("Service"))
    }
}
