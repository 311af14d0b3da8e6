//! Argument specifications
//!
//! This module holds the declarative side of Argot: argument specs, the
//! registry that collects them, and YAML definitions that build registries.

pub mod load;
pub mod registry;
pub mod types;

// Re-export main types
pub use load::{registry_from_yaml, sealed_from_yaml, RegistryDef};
pub use registry::Registry;
pub use types::*;
