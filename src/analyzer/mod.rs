//! # Analyzer Module
//!
//! Kubernetes manifest analysis. [`netpol`] discovers workload connectivity
//! and synthesizes NetworkPolicies for it.

pub mod netpol;
