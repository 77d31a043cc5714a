use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

/// Analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Stop at the first severe error
    pub fail_fast: bool,
    /// Port (number or name) allowed for DNS egress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_port: Option<IntOrString>,
    /// Hand-declared connections to add to the discovered ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections_file: Option<PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `yaml`, `json` or `text`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}
