//! JSON formatter.

use crate::analyzer::netpol::formatter::ConnectionRecord;
use crate::analyzer::netpol::policy::{NetworkPolicy, NetworkPolicyList};
use crate::error::Result;

/// Policies as a single `NetworkPolicyList` document.
pub fn format_policies(policies: &[NetworkPolicy]) -> Result<String> {
    let list = NetworkPolicyList::new(policies.to_vec());
    let mut output = serde_json::to_string_pretty(&list)?;
    output.push('\n');
    Ok(output)
}

/// Connections as a JSON array.
pub fn format_connections(records: &[ConnectionRecord]) -> Result<String> {
    let mut output = serde_json::to_string_pretty(records)?;
    output.push('\n');
    Ok(output)
}
