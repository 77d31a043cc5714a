//! Hand-declared connections read from a text file.
//!
//! Some connections cannot be discovered from manifests (addresses built at
//! runtime, for instance). They can be listed one per line:
//!
//! ```text
//! # source, target, port[/protocol]
//! shop/web, data/db, 5432
//! *, shop/web, 8080/TCP
//! worker, cache, redis
//! ```
//!
//! Workloads are written `namespace/name` or `name` (the default namespace).
//! A `*` source stands for any origin, including outside the cluster.

use crate::analyzer::netpol::errors::FileProcessingError;
use crate::analyzer::netpol::types::{Connection, Service, ServicePort, Workload, same_namespace};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::path::Path;

const ANY_SOURCE: &str = "*";
const PROTOCOLS: &[&str] = &["TCP", "UDP", "SCTP"];

/// Connections declared in a file, plus one error per rejected line.
#[derive(Debug, Default)]
pub struct DeclaredConnections {
    pub connections: Vec<Connection>,
    pub errors: Vec<FileProcessingError>,
}

/// Read declared connections from `path`. An unreadable file is severe.
pub fn read_connections_file(path: &Path, workloads: &[Workload]) -> DeclaredConnections {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_connections(&content, path, workloads),
        Err(e) => DeclaredConnections {
            connections: Vec::new(),
            errors: vec![FileProcessingError::failed_reading_file(path, e)],
        },
    }
}

/// Parse declared connections, resolving workload names against `workloads`.
pub fn parse_connections(content: &str, path: &Path, workloads: &[Workload]) -> DeclaredConnections {
    let mut declared = DeclaredConnections::default();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line, workloads) {
            Ok(connection) => declared.connections.push(connection),
            Err(reason) => declared.errors.push(FileProcessingError::invalid_connections_entry(
                path,
                index + 1,
                format!("{:?}: {}", line, reason),
            )),
        }
    }

    declared
}

fn parse_line(line: &str, workloads: &[Workload]) -> Result<Connection, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [source, target, port] = fields.as_slice() else {
        return Err(format!("expected 3 fields, found {}", fields.len()));
    };

    let source = match *source {
        ANY_SOURCE => None,
        reference => Some(find_workload(reference, workloads)?),
    };
    let target = find_workload(target, workloads)?;
    let port = parse_port(port)?;

    let mut link = Service::new(format!("{}-declared", target.name), target.namespace.clone());
    link.selector = target.labels.clone();
    link.ports = vec![port];
    link.exposed_externally = source.is_none();

    Ok(Connection::new(source.cloned(), target.clone(), link))
}

fn find_workload<'a>(reference: &str, workloads: &'a [Workload]) -> Result<&'a Workload, String> {
    let (namespace, name) = reference.split_once('/').unwrap_or(("", reference));
    if name.is_empty() {
        return Err(format!("empty workload name in {:?}", reference));
    }
    workloads
        .iter()
        .find(|w| w.name == name && same_namespace(&w.namespace, namespace))
        .ok_or_else(|| format!("unknown workload {:?}", reference))
}

fn parse_port(value: &str) -> Result<ServicePort, String> {
    let (port, protocol) = match value.split_once('/') {
        Some((port, protocol)) => (port.trim(), Some(protocol.trim().to_ascii_uppercase())),
        None => (value, None),
    };
    if port.is_empty() {
        return Err("missing port".to_string());
    }

    let mut service_port = match port.parse::<i32>() {
        Ok(number) if (1..=65535).contains(&number) => ServicePort::new(number),
        Ok(number) => return Err(format!("port {} out of range", number)),
        Err(_) => ServicePort::new(0).with_target_port(IntOrString::String(port.to_string())),
    };
    if let Some(protocol) = protocol {
        if !PROTOCOLS.contains(&protocol.as_str()) {
            return Err(format!("unsupported protocol {:?}", protocol));
        }
        service_port = service_port.with_protocol(protocol);
    }

    Ok(service_port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::netpol::errors::ErrorKind;
    use crate::analyzer::netpol::types::WorkloadKind;

    fn workloads() -> Vec<Workload> {
        ["web", "db", "worker"]
            .iter()
            .map(|name| {
                let mut w = Workload::new(*name, "", WorkloadKind::Deployment);
                w.labels.insert("app".into(), name.to_string());
                w
            })
            .collect()
    }

    #[test]
    fn test_parse_connections() {
        let content = "# declared by hand\n\nweb, db, 5432\n*, web, 8080/udp\nworker, default/db, postgres\n";
        let declared = parse_connections(content, Path::new("conns.txt"), &workloads());
        assert!(declared.errors.is_empty(), "{:?}", declared.errors);
        assert_eq!(declared.connections.len(), 3);

        let first = &declared.connections[0];
        assert_eq!(first.source.as_ref().unwrap().name, "web");
        assert_eq!(first.target.name, "db");
        assert!(first.link.selects(&first.target));
        assert_eq!(first.ports()[0].effective_target_port(), IntOrString::Int(5432));

        let second = &declared.connections[1];
        assert!(second.source.is_none());
        assert!(second.link.exposed_externally);
        assert_eq!(second.ports()[0].protocol(), "UDP");

        let third = &declared.connections[2];
        assert_eq!(
            third.ports()[0].effective_target_port(),
            IntOrString::String("postgres".into())
        );
    }

    #[test]
    fn test_invalid_lines_are_reported() {
        let content = "web, db\nghost, db, 80\nweb, db, 99999\nweb, db, 80/ICMP\nweb, db, 80\n";
        let declared = parse_connections(content, Path::new("conns.txt"), &workloads());
        assert_eq!(declared.connections.len(), 1);
        assert_eq!(declared.errors.len(), 4);
        let lines: Vec<_> = declared.errors.iter().map(|e| e.line_number()).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
        assert!(declared.errors.iter().all(|e| {
            matches!(e.kind(), ErrorKind::InvalidConnectionsEntry(_)) && !e.is_severe()
        }));
    }

    #[test]
    fn test_missing_file() {
        let declared = read_connections_file(Path::new("/no/such/conns.txt"), &workloads());
        assert_eq!(declared.errors.len(), 1);
        assert!(declared.errors[0].is_severe());
    }
}
