use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netpol-synth")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Synthesize Kubernetes NetworkPolicies from manifests")]
#[command(
    long_about = "Reads Kubernetes manifests, discovers which workloads talk to which through Services, and generates NetworkPolicies that allow exactly that traffic plus a default-deny policy per namespace."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate NetworkPolicies for the manifests under the given paths
    Policies {
        #[command(flatten)]
        input: InputArgs,

        /// Port (number or name) allowed for DNS egress
        #[arg(long, value_name = "PORT")]
        dns_port: Option<String>,
    },

    /// List the connections discovered in the manifests under the given paths
    Connections {
        #[command(flatten)]
        input: InputArgs,
    },
}

/// Arguments shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Directories or files holding Kubernetes manifests
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Stop at the first severe error
    #[arg(long)]
    pub fail_fast: bool,

    /// Hand-declared connections (`source,target,port[/protocol]` per line)
    #[arg(long, value_name = "FILE")]
    pub connections_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
    Text,
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_policies() {
        let cli = Cli::try_parse_from([
            "netpol-synth",
            "-vv",
            "policies",
            "k8s/",
            "more/",
            "--format",
            "json",
            "--dns-port",
            "5353",
            "--fail-fast",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Policies { input, dns_port } => {
                assert_eq!(input.paths.len(), 2);
                assert_eq!(input.format, Some(OutputFormat::Json));
                assert!(input.fail_fast);
                assert_eq!(dns_port.as_deref(), Some("5353"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_paths_are_required() {
        assert!(Cli::try_parse_from(["netpol-synth", "connections"]).is_err());
    }
}
