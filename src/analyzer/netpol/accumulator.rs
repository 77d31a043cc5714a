//! Collects the objects connectivity discovery cares about.
//!
//! Objects are added one at a time, in any order:
//! - workloads are reduced to their labels and the addresses found in their pod template
//! - Services keep their selector, ports and external exposure
//! - ConfigMaps become lookup tables
//! - Ingress, Route and Gateway routes become exposure requests
//!
//! Cross-object references are resolved afterwards by [`ResourceAccumulator::resolve`].

use crate::analyzer::netpol::address::network_address;
use crate::analyzer::netpol::config::Logger;
use crate::analyzer::netpol::context::manifests::{ControllerSpec, PodSpec, PodTemplate};
use crate::analyzer::netpol::context::{K8sObject, Object};
use crate::analyzer::netpol::errors::{FileProcessingError, UNKNOWN_DOC_INDEX};
use crate::analyzer::netpol::exposure::{self, ExposureTable};
use crate::analyzer::netpol::labels;
use crate::analyzer::netpol::resolver;
use crate::analyzer::netpol::types::{
    ConfigMapData, ConfigMapKeyRef, Service, ServicePort, Workload, WorkloadKind,
    effective_namespace,
};
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Service types reachable from outside the cluster.
const EXTERNAL_SERVICE_TYPES: &[&str] = &["LoadBalancer", "NodePort"];

/// Workloads, Services, ConfigMaps and exposure requests read so far.
#[derive(Debug, Default)]
pub struct ResourceAccumulator {
    workloads: Vec<Workload>,
    services: Vec<Service>,
    config_maps: Vec<ConfigMapData>,
    exposure: ExposureTable,
}

impl ResourceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workloads(&self) -> &[Workload] {
        &self.workloads
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn config_maps(&self) -> &[ConfigMapData] {
        &self.config_maps
    }

    pub fn exposure(&self) -> &ExposureTable {
        &self.exposure
    }

    /// True when neither workloads nor services were found.
    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty() && self.services.is_empty()
    }

    /// Add one object. Kinds that play no part in connectivity are skipped.
    pub fn add_object(&mut self, object: &Object, logger: &dyn Logger) -> Result<(), FileProcessingError> {
        let located = |err: FileProcessingError| {
            err.with_file(&object.metadata.file_path).with_location(
                object.metadata.line_number.unwrap_or_default(),
                object
                    .metadata
                    .doc_index
                    .map(|i| i as i32)
                    .unwrap_or(UNKNOWN_DOC_INDEX),
            )
        };

        match &object.k8s_object {
            K8sObject::Pod(pod) => {
                let workload = workload_from_pod_spec(
                    &pod.metadata,
                    &pod.metadata,
                    pod.spec.as_ref(),
                    WorkloadKind::Pod,
                )
                .map_err(located)?;
                self.push_workload(workload.with_origin(object.metadata.clone()), logger);
            }
            K8sObject::ReplicaSet(c)
            | K8sObject::ReplicationController(c)
            | K8sObject::Deployment(c)
            | K8sObject::StatefulSet(c)
            | K8sObject::DaemonSet(c)
            | K8sObject::Job(c) => {
                let kind = workload_kind(&object.k8s_object).unwrap_or(WorkloadKind::Deployment);
                let workload = workload_from_controller(&c.metadata, &c.spec, kind).map_err(located)?;
                self.push_workload(workload.with_origin(object.metadata.clone()), logger);
            }
            K8sObject::CronJob(cron) => {
                let spec = cron
                    .spec
                    .job_template
                    .as_ref()
                    .and_then(|t| t.spec.as_ref())
                    .ok_or_else(|| {
                        located(FileProcessingError::failed_scanning_resource(
                            "CronJob",
                            "missing spec.jobTemplate.spec",
                        ))
                    })?;
                let workload = workload_from_controller(&cron.metadata, spec, WorkloadKind::CronJob)
                    .map_err(located)?;
                self.push_workload(workload.with_origin(object.metadata.clone()), logger);
            }
            K8sObject::Service(svc) => {
                let service = service_from_k8s(svc).map_err(located)?;
                logger.debug(&format!("found service {}", service.qualified_name()));
                self.services.push(service);
            }
            K8sObject::ConfigMap(cm) => {
                let config_map = config_map_from_k8s(cm).map_err(located)?;
                logger.debug(&format!("found configmap {}", config_map.full_name));
                self.config_maps.push(config_map);
            }
            K8sObject::Ingress(ingress) => exposure::record_ingress(&mut self.exposure, ingress),
            K8sObject::Route(route) => exposure::record_route(&mut self.exposure, route),
            K8sObject::HttpRoute(route) | K8sObject::GrpcRoute(route) => {
                exposure::record_gateway_route(&mut self.exposure, route)
            }
            K8sObject::Unknown(unknown) => {
                logger.debug(&format!(
                    "skipping {} {}: not relevant for connectivity",
                    unknown.kind,
                    object.name()
                ));
            }
        }

        Ok(())
    }

    /// Resolve ConfigMap references and stamp exposure onto service ports.
    ///
    /// Call once, after every object has been added.
    pub fn resolve(&mut self) -> Vec<FileProcessingError> {
        let errors = resolver::inline_config_map_refs(&mut self.workloads, &self.config_maps);
        resolver::apply_exposure(&mut self.services, &self.exposure);
        errors
    }

    /// Hand over the collected workloads and services.
    pub fn into_parts(self) -> (Vec<Workload>, Vec<Service>) {
        (self.workloads, self.services)
    }

    fn push_workload(&mut self, workload: Workload, logger: &dyn Logger) {
        logger.debug(&format!(
            "found {} {} [{}] with {} address(es)",
            workload.kind,
            workload.qualified_name(),
            labels::to_selector_string(&workload.labels),
            workload.network_addresses.len()
        ));
        self.workloads.push(workload);
    }
}

fn workload_kind(object: &K8sObject) -> Option<WorkloadKind> {
    Some(match object {
        K8sObject::Pod(_) => WorkloadKind::Pod,
        K8sObject::ReplicaSet(_) => WorkloadKind::ReplicaSet,
        K8sObject::ReplicationController(_) => WorkloadKind::ReplicationController,
        K8sObject::Deployment(_) => WorkloadKind::Deployment,
        K8sObject::StatefulSet(_) => WorkloadKind::StatefulSet,
        K8sObject::DaemonSet(_) => WorkloadKind::DaemonSet,
        K8sObject::Job(_) => WorkloadKind::Job,
        K8sObject::CronJob(_) => WorkloadKind::CronJob,
        _ => return None,
    })
}

fn object_name(metadata: &ObjectMeta, kind: &str) -> Result<String, FileProcessingError> {
    match metadata.name.as_deref() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(FileProcessingError::failed_scanning_resource(
            kind,
            "missing metadata.name",
        )),
    }
}

fn workload_from_controller(
    metadata: &ObjectMeta,
    spec: &ControllerSpec,
    kind: WorkloadKind,
) -> Result<Workload, FileProcessingError> {
    let template: &PodTemplate = spec.template.as_ref().ok_or_else(|| {
        FileProcessingError::failed_scanning_resource(kind.as_str(), "missing pod template")
    })?;
    workload_from_pod_spec(metadata, &template.metadata, template.spec.as_ref(), kind)
}

/// Build a workload from the owning object's metadata and its pod template.
fn workload_from_pod_spec(
    metadata: &ObjectMeta,
    pod_metadata: &ObjectMeta,
    spec: Option<&PodSpec>,
    kind: WorkloadKind,
) -> Result<Workload, FileProcessingError> {
    let name = object_name(metadata, kind.as_str())?;
    let namespace = metadata.namespace.clone().unwrap_or_default();
    let mut workload = Workload::new(name, namespace, kind);
    workload.labels = pod_metadata.labels.clone().unwrap_or_default();

    let Some(spec) = spec else {
        return Ok(workload);
    };

    workload.service_account = spec
        .service_account_name
        .clone()
        .or_else(|| spec.service_account.clone())
        .filter(|sa| !sa.is_empty());
    workload.image = spec.containers.first().and_then(|c| c.image.clone());

    for container in spec.all_containers() {
        for env in &container.env {
            if let Some(value) = &env.value {
                add_address(&mut workload, value);
            }
            if let Some(selector) = env
                .value_from
                .as_ref()
                .and_then(|from| from.config_map_key_ref.as_ref())
            {
                let key_ref = ConfigMapKeyRef {
                    config_map: workload.config_map_full_name(&selector.name),
                    key: selector.key.clone(),
                };
                if !workload.config_map_key_refs.contains(&key_ref) {
                    workload.config_map_key_refs.push(key_ref);
                }
            }
        }

        for source in &container.env_from {
            if let Some(cm_ref) = &source.config_map_ref {
                let full_name = workload.config_map_full_name(&cm_ref.name);
                if !workload.config_map_refs.contains(&full_name) {
                    workload.config_map_refs.push(full_name);
                }
            }
        }

        for arg in container.command.iter().chain(&container.args) {
            add_address(&mut workload, arg);
        }
    }

    Ok(workload)
}

fn add_address(workload: &mut Workload, value: &str) {
    if let Some(address) = network_address(value)
        && !workload.network_addresses.contains(&address)
    {
        workload.network_addresses.push(address);
    }
}

fn service_from_k8s(svc: &core::Service) -> Result<Service, FileProcessingError> {
    let name = object_name(&svc.metadata, "Service")?;
    let namespace = svc.metadata.namespace.clone().unwrap_or_default();
    let mut service = Service::new(name, namespace);

    let Some(spec) = &svc.spec else {
        return Ok(service);
    };

    service.selector = spec.selector.clone().unwrap_or_default();
    service.exposed_externally = spec
        .type_
        .as_deref()
        .is_some_and(|t| EXTERNAL_SERVICE_TYPES.contains(&t));
    service.ports = spec
        .ports
        .iter()
        .flatten()
        .map(|p| ServicePort {
            name: p.name.clone().filter(|n| !n.is_empty()),
            port: p.port,
            target_port: p.target_port.clone(),
            protocol: p.protocol.clone(),
            exposure: Default::default(),
        })
        .collect();

    Ok(service)
}

fn config_map_from_k8s(cm: &core::ConfigMap) -> Result<ConfigMapData, FileProcessingError> {
    let name = object_name(&cm.metadata, "ConfigMap")?;
    let namespace = cm.metadata.namespace.as_deref().unwrap_or_default();
    Ok(ConfigMapData {
        full_name: format!("{}/{}", effective_namespace(namespace), name),
        data: cm.data.clone().unwrap_or_default(),
    })
}
