//! Options for a connectivity analysis run.
//!
//! - Directory walker (defaults to a recursive `walkdir` walk)
//! - Logger (defaults to the `log` facade)
//! - Fail-fast mode
//! - DNS port allowed on every egress policy
//! - Optional supplemental connections file

use crate::analyzer::netpol::parser::{ManifestWalker, WalkDirWalker};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::fmt;
use std::path::PathBuf;

/// Port allowed for DNS lookups when none is configured.
pub const DEFAULT_DNS_PORT: i32 = 53;

/// Target for analysis progress messages.
pub trait Logger: Send + Sync {
    fn debug(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Forwards to the `log` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn debug(&self, msg: &str) {
        log::debug!("{}", msg);
    }

    fn info(&self, msg: &str) {
        log::info!("{}", msg);
    }

    fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }
}

/// Parse a port given as a number or a port name.
pub fn parse_port(value: &str) -> IntOrString {
    let value = value.trim();
    match value.parse::<i32>() {
        Ok(n) => IntOrString::Int(n),
        Err(_) => IntOrString::String(value.to_string()),
    }
}

/// Configuration for an [`Analyzer`](crate::analyzer::netpol::Analyzer).
pub struct AnalyzerOptions {
    pub walker: Box<dyn ManifestWalker>,
    pub logger: Box<dyn Logger>,
    /// Stop at the first severe error.
    pub fail_fast: bool,
    pub dns_port: IntOrString,
    /// Connections declared by hand, added to the discovered ones.
    pub connections_file: Option<PathBuf>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            walker: Box::new(WalkDirWalker),
            logger: Box::new(DefaultLogger),
            fail_fast: false,
            dns_port: IntOrString::Int(DEFAULT_DNS_PORT),
            connections_file: None,
        }
    }
}

impl fmt::Debug for AnalyzerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerOptions")
            .field("fail_fast", &self.fail_fast)
            .field("dns_port", &self.dns_port)
            .field("connections_file", &self.connections_file)
            .finish_non_exhaustive()
    }
}

impl AnalyzerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_walker(mut self, walker: impl ManifestWalker + 'static) -> Self {
        self.walker = Box::new(walker);
        self
    }

    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_dns_port(mut self, port: IntOrString) -> Self {
        self.dns_port = port;
        self
    }

    pub fn with_connections_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.connections_file = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AnalyzerOptions::default();
        assert!(!options.fail_fast);
        assert_eq!(options.dns_port, IntOrString::Int(53));
        assert!(options.connections_file.is_none());
    }

    #[test]
    fn test_builder() {
        let options = AnalyzerOptions::new()
            .with_fail_fast(true)
            .with_dns_port(parse_port("5353"))
            .with_connections_file("extra.csv");
        assert!(options.fail_fast);
        assert_eq!(options.dns_port, IntOrString::Int(5353));
        assert_eq!(options.connections_file, Some(PathBuf::from("extra.csv")));
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("53"), IntOrString::Int(53));
        assert_eq!(parse_port(" dns "), IntOrString::String("dns".into()));
    }
}
