//! Parsed results
//!
//! A [`ParsedResult`] holds the values bound for one registry, the declared
//! defaults of that registry and, if a subcommand was selected, the result of
//! that subcommand.

use crate::spec::{FromValue, Value};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Values bound by a successful parse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResult {
    pub(crate) values: BTreeMap<String, Value>,
    pub(crate) defaults: BTreeMap<String, Value>,
    pub(crate) present: BTreeSet<String>,
    pub(crate) operands: Vec<String>,
    pub(crate) request: Option<Request>,
    pub(crate) subcommand: Option<Subcommand>,
}

/// Help or version asked for in place of regular arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Request {
    /// `-h`, `--help` or `help`, optionally followed by an argument name
    Help { topic: Option<String> },
    /// `-v`, `--version` or `version`
    Version,
}

/// The selected subcommand and its result
#[derive(Debug, Clone, PartialEq)]
pub struct Subcommand {
    pub name: String,
    pub result: Box<ParsedResult>,
}

impl ParsedResult {
    /// Typed value for `key`, falling back to the declared default
    pub fn get<T: FromValue>(&self, key: &str) -> Option<T> {
        self.value(key).and_then(T::from_value)
    }

    /// Value for `key`, falling back to the declared default
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key).or_else(|| self.defaults.get(key))
    }

    /// Value for `key` only if it was bound from the input
    pub fn explicit(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether the argument appeared in the input
    pub fn is_present(&self, key: &str) -> bool {
        self.present.contains(key)
    }

    /// Positional tokens kept because no positional spec accepted them
    pub fn operands(&self) -> &[String] {
        &self.operands
    }

    pub fn subcommand(&self) -> Option<(&str, &ParsedResult)> {
        self.subcommand
            .as_ref()
            .map(|s| (s.name.as_str(), s.result.as_ref()))
    }

    /// Names of the selected subcommands, outermost first
    pub fn subcommand_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self;
        while let Some((name, next)) = current.subcommand() {
            chain.push(name);
            current = next;
        }
        chain
    }

    /// Help or version request made in the innermost selected subcommand
    ///
    /// When set, required arguments were not checked.
    pub fn request(&self) -> Option<&Request> {
        self.leaf().request.as_ref()
    }

    /// Result of the innermost selected subcommand, or this result
    pub fn leaf(&self) -> &ParsedResult {
        match self.subcommand() {
            Some((_, sub)) => sub.leaf(),
            None => self,
        }
    }

    /// Defaults overlaid with bound values
    pub fn resolved(&self) -> BTreeMap<String, Value> {
        let mut resolved = self.defaults.clone();
        resolved.extend(self.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        resolved
    }

    fn write_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        map.serialize_entry("values", &self.resolved())?;
        if !self.operands.is_empty() {
            map.serialize_entry("operands", &self.operands)?;
        }
        if let Some(request) = &self.request {
            map.serialize_entry("request", request)?;
        }
        if let Some(sub) = &self.subcommand {
            map.serialize_entry("subcommand", sub)?;
        }
        Ok(())
    }
}

impl Serialize for ParsedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.write_entries(&mut map)?;
        map.end()
    }
}

impl Serialize for Subcommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        self.result.write_entries(&mut map)?;
        map.end()
    }
}
