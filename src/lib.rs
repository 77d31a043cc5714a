//! # netpol-synth
//!
//! Generates Kubernetes NetworkPolicies from the manifests of an application.
//!
//! Workloads are matched to the Services that front them; any other workload
//! holding one of that Service's DNS names (in an env value, a container
//! argument or a referenced ConfigMap) is taken to connect to it. Each
//! workload then gets a policy allowing exactly its discovered traffic, and
//! each namespace a default-deny policy.
//!
//! ## Example
//!
//! ```rust,no_run
//! use netpol_synth::analyzer::netpol::{Analyzer, AnalyzerOptions, OutputFormat, formatter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut analyzer = Analyzer::new(AnalyzerOptions::default());
//! let policies = analyzer.policies_from_folder_paths(&["./k8s"])?;
//! println!("{}", formatter::format_policies(&policies, OutputFormat::Yaml)?);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;

pub use analyzer::netpol::{Analyzer, AnalyzerOptions, FileProcessingError, NetworkPolicy};
pub use error::{NetpolError, Result};

use cli::{Cli, Commands};
use handlers::NetpolOptions;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run_command(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Policies { input, dns_port } => {
            let options = NetpolOptions::resolve(&input, dns_port.as_deref(), &config)?;
            handlers::handle_policies(&options)
        }
        Commands::Connections { input } => {
            let options = NetpolOptions::resolve(&input, None, &config)?;
            handlers::handle_connections(&options)
        }
    }
}
