//! # Network Policy Synthesis
//!
//! Reads Kubernetes manifests, infers which workloads talk to which through
//! Services, and produces NetworkPolicies allowing exactly that traffic.
//!
//! ## Pipeline
//!
//! 1. Manifest files are located under the input paths and parsed
//!    document by document ([`parser`]).
//! 2. Workloads, Services, ConfigMaps and exposure directives are
//!    collected ([`accumulator`]) and cross-references resolved ([`resolver`]).
//! 3. Values that look like Service addresses become connections ([`connections`]).
//! 4. Connections are folded into per-workload policies plus a default-deny
//!    policy per namespace ([`synthesis`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use netpol_synth::analyzer::netpol::{Analyzer, AnalyzerOptions};
//!
//! let mut analyzer = Analyzer::new(AnalyzerOptions::default());
//! let policies = analyzer.policies_from_folder_paths(&["k8s/"])?;
//! for err in analyzer.errors() {
//!     eprintln!("{}", err);
//! }
//! ```

pub mod accumulator;
pub mod address;
pub mod analyze;
pub mod config;
pub mod connections;
pub mod context;
pub mod errors;
pub mod exposure;
pub mod formatter;
pub mod labels;
pub mod parser;
pub mod policy;
pub mod resolver;
pub mod supplemental;
pub mod synthesis;
pub mod types;

pub use analyze::{Analyzer, Discovery};
pub use config::{AnalyzerOptions, DefaultLogger, Logger};
pub use connections::discover_connections;
pub use errors::{ErrorKind, FileProcessingError};
pub use formatter::OutputFormat;
pub use policy::{NetworkPolicy, NetworkPolicyList};
pub use synthesis::synthesize_policies;
pub use types::{Connection, Service, ServicePort, Workload, WorkloadKind};
