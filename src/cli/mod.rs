//! CLI interface
//!
//! The `argot` binary loads a registry definition from a YAML file and either
//! parses trailing arguments against it or prints the help it generates.

pub mod app;

// Re-export main types
pub use app::*;
