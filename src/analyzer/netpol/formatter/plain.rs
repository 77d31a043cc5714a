//! Plain text formatter.

use crate::analyzer::netpol::formatter::ConnectionRecord;
use crate::analyzer::netpol::policy::NetworkPolicy;

/// Placeholder shown for connections from an unknown origin.
const ANY_SOURCE: &str = "<any>";

/// One line per connection: `source => target [service] ports`.
pub fn format_connections(records: &[ConnectionRecord]) -> String {
    let mut output = String::new();

    for record in records {
        output.push_str(&format!(
            "{} => {} [{}] {}\n",
            record.source.as_deref().unwrap_or(ANY_SOURCE),
            record.target,
            record.service,
            record.ports.join(","),
        ));
    }

    if records.is_empty() {
        output.push_str("No connections found.\n");
    } else {
        output.push_str(&format!("\nFound {} connection(s).\n", records.len()));
    }

    output
}

/// One line per policy with its rule counts.
pub fn format_policies(policies: &[NetworkPolicy]) -> String {
    let mut output = String::new();

    for policy in policies {
        let name = match policy.namespace() {
            Some(ns) => format!("{}/{}", ns, policy.name()),
            None => policy.name().to_string(),
        };
        output.push_str(&format!(
            "{}: {} ingress rule(s), {} egress rule(s)\n",
            name,
            policy.spec.ingress.len(),
            policy.spec.egress.len(),
        ));
    }

    output.push_str(&format!("\nGenerated {} policies.\n", policies.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_connections() {
        let records = vec![
            ConnectionRecord {
                source: Some("shop/web".into()),
                target: "data/db".into(),
                service: "data/db".into(),
                ports: vec!["5432/TCP".into()],
            },
            ConnectionRecord {
                source: None,
                target: "shop/web".into(),
                service: "shop/web".into(),
                ports: vec!["80/TCP".into(), "443/TCP".into()],
            },
        ];
        let output = format_connections(&records);
        assert!(output.contains("shop/web => data/db [data/db] 5432/TCP\n"));
        assert!(output.contains("<any> => shop/web [shop/web] 80/TCP,443/TCP\n"));
        assert!(output.contains("Found 2 connection(s)."));
    }

    #[test]
    fn test_no_connections() {
        assert_eq!(format_connections(&[]), "No connections found.\n");
    }
}
