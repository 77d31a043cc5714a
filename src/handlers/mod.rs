// Handler modules
pub mod netpol;

// Re-export all handler functions
pub use netpol::{NetpolOptions, handle_connections, handle_policies};
