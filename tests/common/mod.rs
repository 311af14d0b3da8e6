//! Common test utilities
#![allow(dead_code)]

use argot::spec::sealed_from_yaml;
use argot::Registry;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Build a sealed registry from a YAML definition
pub fn registry(yaml: &str) -> Registry {
    sealed_from_yaml(yaml).unwrap()
}

/// Owned argument list
pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Create a temporary directory with a definition file
pub fn create_definition(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tool.yml");
    fs::write(&path, content).unwrap();
    (temp_dir, path)
}
