//! Kubernetes NetworkPolicy output types.
//!
//! Serialized in the `networking.k8s.io/v1` shape. Selectors, metadata and
//! ports reuse the `k8s-openapi` apimachinery types.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NETWORK_POLICY_API_VERSION: &str = "networking.k8s.io/v1";
pub const NETWORK_POLICY_KIND: &str = "NetworkPolicy";
pub const NETWORK_POLICY_LIST_KIND: &str = "NetworkPolicyList";
pub const LIST_API_VERSION: &str = "v1";

/// Label every namespace carries with its own name.
pub const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";

pub const POLICY_TYPE_INGRESS: &str = "Ingress";
pub const POLICY_TYPE_EGRESS: &str = "Egress";

/// A Kubernetes NetworkPolicy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: NetworkPolicySpec,
}

impl NetworkPolicy {
    /// A policy named `name` in `namespace` (omitted when empty).
    pub fn new(name: impl Into<String>, namespace: &str, spec: NetworkPolicySpec) -> Self {
        Self {
            api_version: NETWORK_POLICY_API_VERSION.to_string(),
            kind: NETWORK_POLICY_KIND.to_string(),
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
                ..Default::default()
            },
            spec,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicySpec {
    pub pod_selector: LabelSelector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<NetworkPolicyIngressRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<NetworkPolicyEgressRule>,
    #[serde(default)]
    pub policy_types: Vec<String>,
}

impl NetworkPolicySpec {
    /// A spec restricting both directions for the selected pods.
    pub fn new(pod_selector: LabelSelector) -> Self {
        Self {
            pod_selector,
            ingress: Vec::new(),
            egress: Vec::new(),
            policy_types: vec![POLICY_TYPE_INGRESS.to_string(), POLICY_TYPE_EGRESS.to_string()],
        }
    }
}

/// Traffic allowed into the selected pods. An empty `from` allows any source.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyIngressRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from: Vec<NetworkPolicyPeer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<NetworkPolicyPort>,
}

/// Traffic allowed out of the selected pods. An empty `to` allows any destination.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyEgressRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<NetworkPolicyPeer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<NetworkPolicyPort>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyPeer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
}

impl NetworkPolicyPeer {
    /// Pods in every namespace.
    pub fn all_namespaces() -> Self {
        Self {
            pod_selector: None,
            namespace_selector: Some(LabelSelector::default()),
        }
    }

    /// Pods in the named namespace.
    pub fn namespace(name: &str) -> Self {
        Self {
            pod_selector: None,
            namespace_selector: Some(match_labels([(NAMESPACE_NAME_LABEL, name)])),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyPort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<IntOrString>,
}

/// A list wrapper so several policies serialize as one document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyList {
    pub api_version: String,
    pub kind: String,
    pub items: Vec<NetworkPolicy>,
}

impl NetworkPolicyList {
    pub fn new(items: Vec<NetworkPolicy>) -> Self {
        Self {
            api_version: LIST_API_VERSION.to_string(),
            kind: NETWORK_POLICY_LIST_KIND.to_string(),
            items,
        }
    }
}

/// A selector matching exactly the given labels; matches everything when empty.
pub fn match_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> LabelSelector
where
    K: Into<String>,
    V: Into<String>,
{
    let labels: BTreeMap<String, String> = labels
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    LabelSelector {
        match_labels: (!labels.is_empty()).then_some(labels),
        ..Default::default()
    }
}
