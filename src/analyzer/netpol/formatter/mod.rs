//! Output formatters for policies and connections.

pub mod json;
pub mod plain;
pub mod yaml;

use crate::analyzer::netpol::policy::NetworkPolicy;
use crate::analyzer::netpol::types::{Connection, ServicePort};
use crate::error::Result;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Multi-document YAML, ready for `kubectl apply`.
    #[default]
    Yaml,
    /// JSON.
    Json,
    /// Human readable summary.
    Text,
}

impl OutputFormat {
    /// Parse from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "text" | "plain" | "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// A connection flattened for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    /// `namespace/name` of the caller; `None` for an unknown origin.
    pub source: Option<String>,
    pub target: String,
    pub service: String,
    /// `port/protocol` entries.
    pub ports: Vec<String>,
}

impl From<&Connection> for ConnectionRecord {
    fn from(connection: &Connection) -> Self {
        Self {
            source: connection.source.as_ref().map(|s| s.qualified_name()),
            target: connection.target.qualified_name(),
            service: connection.link.qualified_name(),
            ports: connection.ports().iter().map(port_label).collect(),
        }
    }
}

/// `80/TCP`, or the target port name for a port declared by name only.
pub fn port_label(port: &ServicePort) -> String {
    let number = if port.port != 0 {
        port.port.to_string()
    } else {
        match port.effective_target_port() {
            IntOrString::Int(n) => n.to_string(),
            IntOrString::String(name) => name,
        }
    };
    format!("{}/{}", number, port.protocol())
}

/// Format policies to a string.
pub fn format_policies(policies: &[NetworkPolicy], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => yaml::format_policies(policies),
        OutputFormat::Json => json::format_policies(policies),
        OutputFormat::Text => Ok(plain::format_policies(policies)),
    }
}

/// Format connections to a string.
pub fn format_connections(connections: &[Connection], format: OutputFormat) -> Result<String> {
    let records: Vec<ConnectionRecord> = connections.iter().map(ConnectionRecord::from).collect();
    match format {
        OutputFormat::Yaml => yaml::format_connections(&records),
        OutputFormat::Json => json::format_connections(&records),
        OutputFormat::Text => Ok(plain::format_connections(&records)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::netpol::types::{Service, Workload, WorkloadKind};

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("YAML"), Some(OutputFormat::Yaml));
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("plain"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("sarif"), None);
    }

    #[test]
    fn test_connection_record() {
        let mut link = Service::new("db", "data");
        link.ports = vec![ServicePort::new(5432), ServicePort::new(53).with_protocol("UDP")];
        let conn = Connection::new(
            Some(Workload::new("web", "shop", WorkloadKind::Deployment)),
            Workload::new("db", "data", WorkloadKind::StatefulSet),
            link,
        );
        let record = ConnectionRecord::from(&conn);
        assert_eq!(record.source.as_deref(), Some("shop/web"));
        assert_eq!(record.target, "data/db");
        assert_eq!(record.service, "data/db");
        assert_eq!(record.ports, vec!["5432/TCP", "53/UDP"]);
    }

    #[test]
    fn test_named_port_label() {
        let port = ServicePort::new(0).with_target_port(IntOrString::String("http".into()));
        assert_eq!(port_label(&port), "http/TCP");
    }
}
