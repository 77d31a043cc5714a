//! Handlers for the `policies` and `connections` commands.

use crate::analyzer::netpol::config::{DEFAULT_DNS_PORT, parse_port};
use crate::analyzer::netpol::formatter::{self, OutputFormat};
use crate::analyzer::netpol::{Analyzer, AnalyzerOptions, FileProcessingError};
use crate::cli::{self, InputArgs};
use crate::config::types::Config;
use crate::error::{ConfigError, Result};
use colored::Colorize;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for a run, merged from the command line and the config file.
#[derive(Debug, Clone)]
pub struct NetpolOptions {
    /// Directories or files holding manifests
    pub paths: Vec<PathBuf>,
    /// Output file; stdout when unset
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub fail_fast: bool,
    pub dns_port: IntOrString,
    pub connections_file: Option<PathBuf>,
}

impl Default for NetpolOptions {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            output: None,
            format: OutputFormat::default(),
            fail_fast: false,
            dns_port: IntOrString::Int(DEFAULT_DNS_PORT),
            connections_file: None,
        }
    }
}

impl NetpolOptions {
    /// Command-line values win over config file values.
    pub fn resolve(input: &InputArgs, dns_port: Option<&str>, config: &Config) -> Result<Self> {
        let format = match (input.format, config.output.format.as_deref()) {
            (Some(format), _) => format.into(),
            (None, Some(name)) => OutputFormat::parse(name)
                .ok_or_else(|| ConfigError::InvalidFormat(name.to_string()))?,
            (None, None) => OutputFormat::default(),
        };

        Ok(Self {
            paths: input.paths.clone(),
            output: input.output.clone(),
            format,
            fail_fast: input.fail_fast || config.analysis.fail_fast,
            dns_port: dns_port
                .map(parse_port)
                .or_else(|| config.analysis.dns_port.clone())
                .unwrap_or(IntOrString::Int(DEFAULT_DNS_PORT)),
            connections_file: input
                .connections_file
                .clone()
                .or_else(|| config.analysis.connections_file.clone()),
        })
    }

    fn analyzer(&self) -> Analyzer {
        let mut options = AnalyzerOptions::new()
            .with_fail_fast(self.fail_fast)
            .with_dns_port(self.dns_port.clone());
        if let Some(path) = &self.connections_file {
            options = options.with_connections_file(path);
        }
        Analyzer::new(options)
    }
}

impl From<cli::OutputFormat> for OutputFormat {
    fn from(format: cli::OutputFormat) -> Self {
        match format {
            cli::OutputFormat::Yaml => Self::Yaml,
            cli::OutputFormat::Json => Self::Json,
            cli::OutputFormat::Text => Self::Text,
        }
    }
}

/// Generate NetworkPolicies and write them out.
pub fn handle_policies(options: &NetpolOptions) -> Result<()> {
    let mut analyzer = options.analyzer();
    let result = analyzer.policies_from_folder_paths(options.paths.as_slice());
    report_errors(analyzer.errors());

    let policies = result?;
    let content = formatter::format_policies(&policies, options.format)?;
    write_output(&content, options.output.as_deref())
}

/// Discover connections and write them out.
pub fn handle_connections(options: &NetpolOptions) -> Result<()> {
    let mut analyzer = options.analyzer();
    let result = analyzer.connections_from_folder_paths(options.paths.as_slice());
    report_errors(analyzer.errors());

    let connections = result?;
    let content = formatter::format_connections(&connections, options.format)?;
    write_output(&content, options.output.as_deref())
}

/// Summarize severe errors on stderr; each one was already logged.
fn report_errors(errors: &[FileProcessingError]) {
    let severe = errors.iter().filter(|e| e.is_severe() && !e.is_fatal()).count();
    if severe > 0 {
        eprintln!(
            "{} {} severe error(s) while reading manifests; output may be incomplete",
            "warning:".yellow().bold(),
            severe
        );
    }
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
