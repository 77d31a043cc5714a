//! Connection discovery.
//!
//! For every Service fronting a workload, look for other workloads holding an
//! address of that Service. Each such source yields a Connection. A fronted
//! workload nobody is seen to call still gets one source-less Connection, so
//! its Service's exposure can be honored.

use crate::analyzer::netpol::types::{Connection, Service, ServicePort, Workload};

/// How a source workload addresses a service.
#[derive(Debug, PartialEq, Eq)]
enum ServiceUse {
    /// Addressed without a port: every port may be used.
    AllPorts,
    /// Addressed only as `host:port`.
    Ports(Vec<ServicePort>),
}

fn service_use(source: &Workload, service: &Service) -> Option<ServiceUse> {
    let forms = service.addressable_forms(&source.namespace);
    let mut used_ports: Vec<ServicePort> = Vec::new();

    for address in &source.network_addresses {
        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (address.as_str(), None),
        };
        if !forms.iter().any(|form| form == host) {
            continue;
        }
        match port.map(str::parse::<i32>) {
            None => return Some(ServiceUse::AllPorts),
            // Out of range for any port: addresses nothing on this service.
            Some(Err(_)) => continue,
            Some(Ok(number)) => {
                for matched in service.ports.iter().filter(|p| p.port == number) {
                    if !used_ports.contains(matched) {
                        used_ports.push(matched.clone());
                    }
                }
            }
        }
    }

    (!used_ports.is_empty()).then_some(ServiceUse::Ports(used_ports))
}

/// Derive connections from workloads and the services fronting them.
///
/// Sources are copies of the calling workload; their `used_ports` holds the
/// ports named explicitly, or nothing when the service was addressed
/// without a port. A workload never connects to itself.
pub fn discover_connections(workloads: &[Workload], services: &[Service]) -> Vec<Connection> {
    let mut connections = Vec::new();

    for target in workloads {
        for service in services.iter().filter(|s| s.selects(target)) {
            let mut found_source = false;

            for source in workloads.iter().filter(|w| !w.same_identity(target)) {
                let Some(service_use) = service_use(source, service) else {
                    continue;
                };
                found_source = true;

                let mut source = source.clone();
                source.used_ports = match service_use {
                    ServiceUse::AllPorts => Vec::new(),
                    ServiceUse::Ports(ports) => ports,
                };
                log::trace!(
                    "{} -> {} via service {}",
                    source.qualified_name(),
                    target.qualified_name(),
                    service.qualified_name()
                );
                connections.push(Connection::new(Some(source), target.clone(), service.clone()));
            }

            if !found_source {
                connections.push(Connection::new(None, target.clone(), service.clone()));
            }
        }
    }

    connections
}
