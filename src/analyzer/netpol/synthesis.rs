//! NetworkPolicy synthesis from discovered connections.
//!
//! Connections are folded into one aggregate per workload: the target side
//! gains ingress rules, the source side gains egress rules. Each aggregate
//! becomes a `<name>-netpol` policy selecting the workload's pods; a
//! default-deny policy is added for every namespace holding a workload.

use crate::analyzer::netpol::labels::Map;
use crate::analyzer::netpol::policy::{
    NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyIngressRule, NetworkPolicyPeer,
    NetworkPolicyPort, NetworkPolicySpec, NAMESPACE_NAME_LABEL, match_labels,
};
use crate::analyzer::netpol::types::{
    Connection, ServicePort, Workload, WorkloadId, effective_namespace, same_namespace,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::{BTreeMap, BTreeSet};

/// Name of the default-deny policy for a namespace.
pub fn default_deny_policy_name(namespace: &str) -> String {
    if namespace.is_empty() {
        "default-deny-in-namespace".to_string()
    } else {
        format!("default-deny-in-namespace-{}", namespace)
    }
}

/// Name of the policy generated for a workload.
pub fn workload_policy_name(workload_name: &str) -> String {
    format!("{}-netpol", workload_name)
}

/// Ingress and egress rules gathered for one workload.
#[derive(Debug, Clone)]
struct WorkloadConnectivity {
    namespace: String,
    labels: Map,
    ingress: Vec<NetworkPolicyIngressRule>,
    egress: Vec<NetworkPolicyEgressRule>,
}

impl WorkloadConnectivity {
    fn new(workload: &Workload) -> Self {
        Self {
            namespace: workload.namespace.clone(),
            labels: workload.labels.clone(),
            ingress: Vec::new(),
            egress: Vec::new(),
        }
    }

    fn add_ingress(&mut self, mut rule: NetworkPolicyIngressRule) {
        canonicalize(&mut rule.from, &mut rule.ports);
        if !self.ingress.contains(&rule) {
            self.ingress.push(rule);
        }
    }

    fn add_egress(&mut self, mut rule: NetworkPolicyEgressRule) {
        canonicalize(&mut rule.to, &mut rule.ports);
        if !self.egress.contains(&rule) {
            self.egress.push(rule);
        }
    }

    /// Order rules independently of the order connections were seen in.
    fn sort_rules(&mut self) {
        self.ingress.sort_by_cached_key(|rule| rule_key(&rule.from, &rule.ports));
        self.egress.sort_by_cached_key(|rule| rule_key(&rule.to, &rule.ports));
    }
}

type SelectorKey = Option<Option<Map>>;
type PeerKey = (SelectorKey, SelectorKey);
type PortKey = (Option<String>, Option<(bool, i32, String)>);

fn peer_key(peer: &NetworkPolicyPeer) -> PeerKey {
    (
        peer.namespace_selector.as_ref().map(|s| s.match_labels.clone()),
        peer.pod_selector.as_ref().map(|s| s.match_labels.clone()),
    )
}

fn port_key(port: &NetworkPolicyPort) -> PortKey {
    let number = port.port.as_ref().map(|p| match p {
        IntOrString::Int(n) => (false, *n, String::new()),
        IntOrString::String(name) => (true, 0, name.clone()),
    });
    (port.protocol.clone(), number)
}

fn rule_key(peers: &[NetworkPolicyPeer], ports: &[NetworkPolicyPort]) -> (Vec<PeerKey>, Vec<PortKey>) {
    (
        peers.iter().map(peer_key).collect(),
        ports.iter().map(port_key).collect(),
    )
}

/// Sort and dedup peers and ports so equal sets compare equal.
fn canonicalize(peers: &mut Vec<NetworkPolicyPeer>, ports: &mut Vec<NetworkPolicyPort>) {
    peers.sort_by_cached_key(peer_key);
    peers.dedup();
    ports.sort_by_cached_key(port_key);
    ports.dedup();
}

fn pod_selector(labels: &Map) -> LabelSelector {
    match_labels(labels.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

/// Peer selecting `workload`'s pods, as seen from a policy in `policy_namespace`.
fn workload_peer(workload: &Workload, policy_namespace: &str) -> NetworkPolicyPeer {
    let namespace_selector = if workload.namespace.is_empty()
        || same_namespace(&workload.namespace, policy_namespace)
    {
        None
    } else {
        Some(match_labels([(NAMESPACE_NAME_LABEL, workload.namespace.as_str())]))
    };
    NetworkPolicyPeer {
        pod_selector: Some(pod_selector(&workload.labels)),
        namespace_selector,
    }
}

fn policy_ports<'a>(ports: impl IntoIterator<Item = &'a ServicePort>) -> Vec<NetworkPolicyPort> {
    let mut result: Vec<NetworkPolicyPort> = Vec::new();
    for port in ports {
        let policy_port = NetworkPolicyPort {
            protocol: Some(port.protocol().to_string()),
            port: Some(port.effective_target_port()),
        };
        if !result.contains(&policy_port) {
            result.push(policy_port);
        }
    }
    result
}

/// Ingress rules the target of `connection` needs.
fn ingress_rules(connection: &Connection) -> Vec<NetworkPolicyIngressRule> {
    let ports = connection.ports();

    if connection.link.exposed_externally {
        return vec![NetworkPolicyIngressRule {
            from: Vec::new(),
            ports: policy_ports(ports),
        }];
    }

    let source_peer = connection
        .source
        .as_ref()
        .map(|source| workload_peer(source, &connection.target.namespace));

    let mut cluster_ports = Vec::new();
    let mut namespace_ports: BTreeMap<&BTreeSet<String>, Vec<&ServicePort>> = BTreeMap::new();
    let mut private_ports = Vec::new();
    for port in ports {
        if port.exposure.to_cluster {
            cluster_ports.push(port);
        } else if !port.exposure.to_namespaces.is_empty() {
            namespace_ports
                .entry(&port.exposure.to_namespaces)
                .or_default()
                .push(port);
        } else {
            private_ports.push(port);
        }
    }

    let mut rules = Vec::new();
    if !cluster_ports.is_empty() {
        rules.push(NetworkPolicyIngressRule {
            from: vec![NetworkPolicyPeer::all_namespaces()],
            ports: policy_ports(cluster_ports),
        });
    }
    for (namespaces, ports) in namespace_ports {
        let mut from: Vec<NetworkPolicyPeer> = namespaces
            .iter()
            .map(|ns| NetworkPolicyPeer::namespace(ns))
            .collect();
        from.extend(source_peer.clone());
        rules.push(NetworkPolicyIngressRule {
            from,
            ports: policy_ports(ports),
        });
    }
    if !private_ports.is_empty()
        && let Some(peer) = source_peer
    {
        rules.push(NetworkPolicyIngressRule {
            from: vec![peer],
            ports: policy_ports(private_ports),
        });
    }

    rules
}

/// Egress rule allowing DNS lookups anywhere in the cluster.
pub fn dns_egress_rule(dns_port: &IntOrString) -> NetworkPolicyEgressRule {
    NetworkPolicyEgressRule {
        to: vec![NetworkPolicyPeer::all_namespaces()],
        ports: vec![NetworkPolicyPort {
            protocol: Some("UDP".to_string()),
            port: Some(dns_port.clone()),
        }],
    }
}

/// One default-deny policy per namespace holding a workload, sorted by namespace.
///
/// An undeclared namespace and `default` share one policy, named after the
/// undeclared form when both occur.
pub fn default_deny_policies(workloads: &[Workload]) -> Vec<NetworkPolicy> {
    let mut namespaces: BTreeMap<&str, &str> = BTreeMap::new();
    for workload in workloads {
        let declared = workload.namespace.as_str();
        namespaces
            .entry(effective_namespace(declared))
            .and_modify(|ns| *ns = (*ns).min(declared))
            .or_insert(declared);
    }
    namespaces
        .into_values()
        .map(|ns| {
            NetworkPolicy::new(
                default_deny_policy_name(ns),
                ns,
                NetworkPolicySpec::new(LabelSelector::default()),
            )
        })
        .collect()
}

/// Turn connections into NetworkPolicies.
///
/// Workload policies come first, sorted by workload name, then the
/// default-deny policies sorted by namespace. Every workload with at least
/// one egress rule is also allowed DNS on `dns_port`. The result depends
/// only on the inputs.
pub fn synthesize_policies(
    workloads: &[Workload],
    connections: &[Connection],
    dns_port: &IntOrString,
) -> Vec<NetworkPolicy> {
    let mut aggregates: BTreeMap<WorkloadId, WorkloadConnectivity> = BTreeMap::new();

    for connection in connections {
        let target = aggregates
            .entry(connection.target.id())
            .or_insert_with(|| WorkloadConnectivity::new(&connection.target));
        for rule in ingress_rules(connection) {
            target.add_ingress(rule);
        }

        if let Some(source) = &connection.source {
            let rule = NetworkPolicyEgressRule {
                to: vec![workload_peer(&connection.target, &source.namespace)],
                ports: policy_ports(connection.ports()),
            };
            aggregates
                .entry(source.id())
                .or_insert_with(|| WorkloadConnectivity::new(source))
                .add_egress(rule);
        }
    }

    let mut policies: Vec<NetworkPolicy> = aggregates
        .into_iter()
        .map(|(id, mut connectivity)| {
            connectivity.sort_rules();
            if !connectivity.egress.is_empty() {
                connectivity.add_egress(dns_egress_rule(dns_port));
            }
            let mut spec = NetworkPolicySpec::new(pod_selector(&connectivity.labels));
            spec.ingress = connectivity.ingress;
            spec.egress = connectivity.egress;
            NetworkPolicy::new(workload_policy_name(&id.name), &connectivity.namespace, spec)
        })
        .collect();

    policies.extend(default_deny_policies(workloads));
    policies
}
