//! YAML formatter.

use crate::analyzer::netpol::formatter::ConnectionRecord;
use crate::analyzer::netpol::policy::NetworkPolicy;
use crate::error::Result;

/// One YAML document per policy, separated by `---`.
pub fn format_policies(policies: &[NetworkPolicy]) -> Result<String> {
    let mut output = String::new();
    for (i, policy) in policies.iter().enumerate() {
        if i > 0 {
            output.push_str("---\n");
        }
        output.push_str(&serde_yaml::to_string(policy)?);
    }
    Ok(output)
}

pub fn format_connections(records: &[ConnectionRecord]) -> Result<String> {
    Ok(serde_yaml::to_string(records)?)
}
