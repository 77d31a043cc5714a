//! Label selector containment.

use std::collections::BTreeMap;

pub type Map = BTreeMap<String, String>;

/// Returns true when every `selector` entry is present, with the same value,
/// in `labels`. The label set may hold additional entries.
pub fn contains(labels: &Map, selector: &Map) -> bool {
    for (k, v) in selector.iter() {
        if labels.get(k) != Some(v) {
            return false;
        }
    }

    true
}

/// Render a label set as `k=v,k2=v2` for log and text output.
pub fn to_selector_string(labels: &Map) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
