//! Cross-object resolution performed after every object has been read.
//!
//! Objects may appear in any order, so ConfigMap references and exposure
//! directives are resolved only once the whole input is known.

use crate::analyzer::netpol::address::network_address;
use crate::analyzer::netpol::errors::FileProcessingError;
use crate::analyzer::netpol::exposure::{ExposureScope, ExposureTable};
use crate::analyzer::netpol::types::{ConfigMapData, Service, Workload};
use std::collections::BTreeMap;

/// ConfigMaps indexed by full name.
pub struct ConfigMapIndex<'a> {
    by_name: BTreeMap<&'a str, &'a ConfigMapData>,
}

impl<'a> ConfigMapIndex<'a> {
    pub fn new(config_maps: &'a [ConfigMapData]) -> Self {
        Self {
            by_name: config_maps
                .iter()
                .map(|cm| (cm.full_name.as_str(), cm))
                .collect(),
        }
    }

    /// Find a ConfigMap referenced by `workload`.
    pub fn config_map(
        &self,
        full_name: &str,
        workload: &Workload,
    ) -> Result<&'a ConfigMapData, FileProcessingError> {
        self.by_name
            .get(full_name)
            .copied()
            .ok_or_else(|| {
                located(
                    FileProcessingError::config_map_not_found(full_name, &workload.qualified_name()),
                    workload,
                )
            })
    }

    /// Find one value of a ConfigMap referenced by `workload`.
    pub fn value(
        &self,
        full_name: &str,
        key: &str,
        workload: &Workload,
    ) -> Result<&'a str, FileProcessingError> {
        let config_map = self.config_map(full_name, workload)?;
        config_map.data.get(key).map(String::as_str).ok_or_else(|| {
            located(
                FileProcessingError::config_map_key_not_found(
                    full_name,
                    key,
                    &workload.qualified_name(),
                ),
                workload,
            )
        })
    }
}

fn located(err: FileProcessingError, workload: &Workload) -> FileProcessingError {
    match &workload.origin {
        Some(origin) => err.with_file(&origin.file_path).with_location(
            origin.line_number.unwrap_or_default(),
            origin.doc_index.map(|i| i as i32).unwrap_or(-1),
        ),
        None => err,
    }
}

fn push_address(workload: &mut Workload, value: &str) {
    if let Some(address) = network_address(value)
        && !workload.network_addresses.contains(&address)
    {
        workload.network_addresses.push(address);
    }
}

/// Append addresses found in referenced ConfigMaps to each workload.
///
/// Whole-map references contribute every value that looks like an address;
/// key references contribute that one value. Missing maps or keys are
/// reported and skipped.
pub fn inline_config_map_refs(
    workloads: &mut [Workload],
    config_maps: &[ConfigMapData],
) -> Vec<FileProcessingError> {
    let index = ConfigMapIndex::new(config_maps);
    let mut errors = Vec::new();

    for workload in workloads.iter_mut() {
        for full_name in workload.config_map_refs.clone() {
            match index.config_map(&full_name, workload) {
                Ok(config_map) => {
                    for value in config_map.data.values() {
                        push_address(workload, value);
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        for key_ref in workload.config_map_key_refs.clone() {
            match index.value(&key_ref.config_map, &key_ref.key, workload) {
                Ok(value) => push_address(workload, value),
                Err(e) => errors.push(e),
            }
        }
    }

    errors
}

/// Stamp exposure requests onto the service ports they name.
///
/// A request without a port covers every port. A request naming a port
/// nothing matches is ignored.
pub fn apply_exposure(services: &mut [Service], table: &ExposureTable) {
    if table.is_empty() {
        return;
    }

    for service in services.iter_mut() {
        for entry in table.lookup(&service.namespace, &service.name) {
            let ports = service
                .ports
                .iter_mut()
                .filter(|p| entry.port.as_ref().is_none_or(|r| p.matches_ref(r)));
            for port in ports {
                match &entry.scope {
                    ExposureScope::Cluster => port.exposure.to_cluster = true,
                    ExposureScope::Namespaces(namespaces) => port
                        .exposure
                        .to_namespaces
                        .extend(namespaces.iter().cloned()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::netpol::errors::ErrorKind;
    use crate::analyzer::netpol::types::{ConfigMapKeyRef, ServicePort, WorkloadKind};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    fn config_map(full_name: &str, data: &[(&str, &str)]) -> ConfigMapData {
        ConfigMapData {
            full_name: full_name.to_string(),
            data: data
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_inline_whole_map_and_key() {
        let mut web = Workload::new("web", "", WorkloadKind::Deployment);
        web.network_addresses.push("cache:6379".into());
        web.config_map_refs.push("default/env".into());
        web.config_map_key_refs.push(ConfigMapKeyRef {
            config_map: "default/urls".into(),
            key: "db".into(),
        });

        let maps = vec![
            config_map("default/env", &[("A", "api:8080"), ("B", "512"), ("C", "cache:6379")]),
            config_map("default/urls", &[("db", "postgres://db:5432/app"), ("other", "x")]),
        ];

        let mut workloads = vec![web];
        let errors = inline_config_map_refs(&mut workloads, &maps);
        assert!(errors.is_empty());
        assert_eq!(
            workloads[0].network_addresses,
            vec!["cache:6379", "api:8080", "db:5432"]
        );
    }

    #[test]
    fn test_missing_map_and_key_are_advisory() {
        let mut web = Workload::new("web", "shop", WorkloadKind::Deployment);
        web.config_map_refs.push("shop/absent".into());
        web.config_map_key_refs.push(ConfigMapKeyRef {
            config_map: "shop/present".into(),
            key: "missing".into(),
        });
        let maps = vec![config_map("shop/present", &[("k", "v")])];

        let mut workloads = vec![web];
        let errors = inline_config_map_refs(&mut workloads, &maps);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0].kind(), ErrorKind::ConfigMapNotFound { .. }));
        assert!(matches!(errors[1].kind(), ErrorKind::ConfigMapKeyNotFound { .. }));
        assert!(errors.iter().all(|e| !e.is_severe() && !e.is_fatal()));
    }

    #[test]
    fn test_apply_exposure() {
        let mut svc = Service::new("web", "shop");
        svc.ports = vec![
            ServicePort::new(80).with_name("http"),
            ServicePort::new(9090).with_name("metrics"),
        ];
        let mut other = Service::new("web", "staging");
        other.ports = vec![ServicePort::new(80)];

        let mut table = ExposureTable::new();
        table.expose("shop", "web", Some(IntOrString::String("http".into())), ExposureScope::Cluster);
        table.expose(
            "shop",
            "web",
            None,
            ExposureScope::Namespaces(["monitoring".to_string()].into_iter().collect()),
        );

        let mut services = vec![svc, other];
        apply_exposure(&mut services, &table);

        assert!(services[0].ports[0].exposure.to_cluster);
        assert!(!services[0].ports[1].exposure.to_cluster);
        assert!(services[0].ports[1].exposure.to_namespaces.contains("monitoring"));
        assert!(services[0].ports[0].exposure.to_namespaces.contains("monitoring"));
        assert!(services[1].ports.iter().all(|p| p.exposure == Default::default()));
    }
}
