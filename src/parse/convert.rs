//! Type conversion
//!
//! Conversion is a table lookup from a type tag to a conversion function.
//! Built-in tags live in a fixed table; additional tags are registered by
//! name on a registry and resolved from the innermost registry outwards.

use crate::spec::{TypeTag, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A conversion function for a registered type
pub type ConvertFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

type BuiltinFn = fn(&str) -> Result<Value, String>;

const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("integer", convert_integer),
    ("float", convert_float),
    ("boolean", convert_boolean),
    ("string", convert_string),
    ("path", convert_path),
];

/// Why a token could not be converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    pub token: String,
    pub type_name: String,
    pub reason: String,
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot convert '{}' to {}: {}",
            self.token, self.type_name, self.reason
        )
    }
}

/// Custom conversions registered on one registry
#[derive(Clone, Default)]
pub struct ConverterTable {
    custom: HashMap<String, ConvertFn>,
}

impl ConverterTable {
    pub fn register(&mut self, name: impl Into<String>, convert: ConvertFn) {
        self.custom.insert(name.into(), convert);
    }

    pub fn get(&self, name: &str) -> Option<&ConvertFn> {
        self.custom.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }
}

impl fmt::Debug for ConverterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("ConverterTable").field("custom", &names).finish()
    }
}

/// The converter tables visible from one registry, outermost first
#[derive(Clone, Default)]
pub struct TypeScope<'a> {
    tables: Vec<&'a ConverterTable>,
}

impl<'a> TypeScope<'a> {
    pub fn new(tables: Vec<&'a ConverterTable>) -> Self {
        TypeScope { tables }
    }

    /// Scope extended with a nested registry's table
    pub fn nested(&self, table: &'a ConverterTable) -> Self {
        let mut tables = self.tables.clone();
        tables.push(table);
        TypeScope { tables }
    }

    /// Find a custom conversion, innermost registration first
    pub fn lookup(&self, name: &str) -> Option<&'a ConvertFn> {
        self.tables.iter().rev().find_map(|t| t.get(name))
    }

    /// Whether a tag can be converted in this scope
    pub fn resolves(&self, tag: &TypeTag) -> bool {
        match tag {
            TypeTag::Custom(name) => self.lookup(name).is_some(),
            _ => true,
        }
    }

    /// Convert one raw token to a typed value
    pub fn convert(&self, tag: &TypeTag, raw: &str) -> Result<Value, ConversionFailure> {
        let failure = |reason: String| ConversionFailure {
            token: raw.to_string(),
            type_name: tag.name().to_string(),
            reason,
        };

        match tag {
            TypeTag::Choice(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(Value::Str(raw.to_string()))
                } else {
                    Err(failure(format!("expected one of: {}", choices.join(", "))))
                }
            }
            TypeTag::Custom(name) => match self.lookup(name) {
                Some(convert) => convert(raw).map_err(failure),
                None => Err(failure("no converter registered".to_string())),
            },
            builtin => {
                let convert = BUILTINS
                    .iter()
                    .find(|(name, _)| *name == builtin.name())
                    .map(|(_, f)| *f)
                    .ok_or_else(|| failure("no converter registered".to_string()))?;
                convert(raw).map_err(failure)
            }
        }
    }
}

fn convert_integer(raw: &str) -> Result<Value, String> {
    raw.trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|e| e.to_string())
}

fn convert_float(raw: &str) -> Result<Value, String> {
    raw.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|e| e.to_string())
}

fn convert_boolean(raw: &str) -> Result<Value, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Value::Bool(true)),
        "false" | "0" | "no" => Ok(Value::Bool(false)),
        _ => Err("expected one of: true, false, 1, 0, yes, no".to_string()),
    }
}

fn convert_string(raw: &str) -> Result<Value, String> {
    Ok(Value::Str(raw.to_string()))
}

fn convert_path(raw: &str) -> Result<Value, String> {
    if raw.is_empty() {
        return Err("path must not be empty".to_string());
    }
    Ok(Value::Path(PathBuf::from(raw)))
}
