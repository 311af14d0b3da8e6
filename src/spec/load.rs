//! Registry definitions
//!
//! A registry tree can be described in YAML and built into a [`Registry`].
//! Loading works on strings only; reading the file is up to the caller.
//!
//! ```yaml
//! about: Build tool
//! options:
//!   - names: [--jobs, -j]
//!     type: integer
//!     default: 1
//! subcommands:
//!   - name: build
//!     positionals:
//!       - name: target
//!         required: true
//! ```

use crate::error::{ConfigError, ConfigResult, Result};
use crate::parse::Validator;
use crate::spec::registry::Registry;
use crate::spec::types::{Arity, ArgumentSpec, Repeat, TypeTag};
use serde::Deserialize;

/// A registry and its subcommands
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryDef {
    /// Program name shown in version output and usage lines
    #[serde(default)]
    pub program: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    /// Description shown in help
    #[serde(default)]
    pub about: Option<String>,

    /// Allow unambiguous prefixes of long options
    #[serde(default = "default_true")]
    pub abbreviations: bool,

    #[serde(default)]
    pub subcommand_required: bool,

    /// Keep unmatched positional tokens instead of rejecting them
    #[serde(default)]
    pub collect_operands: bool,

    /// Answer a leading `help` or `--version` and the like
    #[serde(default = "default_true")]
    pub help_requests: bool,

    #[serde(default)]
    pub options: Vec<ArgumentDef>,

    #[serde(default)]
    pub positionals: Vec<ArgumentDef>,

    #[serde(default)]
    pub subcommands: Vec<SubcommandDef>,
}

/// A named subcommand
#[derive(Debug, Clone, Deserialize)]
pub struct SubcommandDef {
    pub name: String,

    #[serde(flatten)]
    pub registry: RegistryDef,
}

/// An option (`names`) or positional (`name`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArgumentDef {
    /// One name or a list of aliases
    #[serde(default, alias = "name", deserialize_with = "deserialize_names")]
    pub names: Vec<String>,

    /// A count or one of `?`, `*`, `+`, `...`
    #[serde(default, deserialize_with = "deserialize_arity")]
    pub arity: Option<Arity>,

    #[serde(rename = "type", default)]
    pub value_type: Option<String>,

    #[serde(default)]
    pub choices: Vec<String>,

    /// A scalar or a list of scalars
    #[serde(default, deserialize_with = "deserialize_raw_values")]
    pub default: Option<Vec<String>>,

    /// Value used when a `?` option is given without one
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub implicit: Option<String>,

    #[serde(default)]
    pub required: bool,

    /// Mutual-exclusion group
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub repeat: Repeat,

    #[serde(default)]
    pub global: bool,

    #[serde(default)]
    pub delimiter: Option<char>,

    #[serde(default)]
    pub help: Option<String>,

    #[serde(default)]
    pub long_help: Option<String>,

    #[serde(default)]
    pub value_name: Option<String>,

    /// Hidden from generated help
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub validators: Vec<ValidatorDef>,

    /// Related arguments listed in this argument's help
    #[serde(default)]
    pub relevant: Vec<RelevantDef>,
}

/// An argument listed in another argument's help
#[derive(Debug, Clone, Deserialize)]
pub struct RelevantDef {
    pub name: String,

    #[serde(default)]
    pub required: bool,
}

/// Built-in validators; every field that is set adds one
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidatorDef {
    #[serde(default)]
    pub min: Option<f64>,

    #[serde(default)]
    pub max: Option<f64>,

    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub non_empty: bool,

    /// Replaces the default failure message
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

impl RegistryDef {
    /// Build an unsealed registry
    pub fn build(&self) -> ConfigResult<Registry> {
        let mut registry = Registry::new();
        self.build_into(&mut registry)?;
        Ok(registry)
    }

    fn build_into(&self, registry: &mut Registry) -> ConfigResult<()> {
        if let Some(program) = &self.program {
            registry.set_name(program.clone())?;
        }
        if let Some(version) = &self.version {
            registry.set_version(version.clone())?;
        }
        if let Some(about) = &self.about {
            registry.set_about(about.clone())?;
        }
        registry
            .set_abbreviations(self.abbreviations)?
            .set_subcommand_required(self.subcommand_required)?
            .set_collect_operands(self.collect_operands)?
            .set_help_requests(self.help_requests)?;

        for option in &self.options {
            registry.add_option(option.option_spec()?)?;
        }
        for positional in &self.positionals {
            registry.add_positional(positional.positional_spec()?)?;
        }

        for sub in &self.subcommands {
            let child = registry.add_subcommand(sub.name.clone())?;
            sub.registry
                .build_into(child)
                .map_err(|e| ConfigError::InSubcommand {
                    name: sub.name.clone(),
                    source: Box::new(e),
                })?;
        }

        Ok(())
    }
}

impl ArgumentDef {
    fn is_boolean(&self) -> bool {
        matches!(self.value_type.as_deref(), Some("bool" | "boolean"))
    }

    fn option_spec(&self) -> ConfigResult<ArgumentSpec> {
        // Boolean options are flags unless an arity says otherwise
        let arity = self.arity.unwrap_or(if self.is_boolean() {
            Arity::Fixed(0)
        } else {
            Arity::Fixed(1)
        });
        let spec = ArgumentSpec::option(self.names.clone()).with_arity(arity);
        self.apply(spec, arity)
    }

    fn positional_spec(&self) -> ConfigResult<ArgumentSpec> {
        let name = match self.names.as_slice() {
            [] => return Err(ConfigError::MissingName),
            [name] => name.clone(),
            names => {
                return Err(ConfigError::Invalid(format!(
                    "Positional takes exactly one name, got: {}",
                    names.join(", ")
                )))
            }
        };
        let arity = self.arity.unwrap_or(Arity::Fixed(1));
        let spec = ArgumentSpec::positional(name).with_arity(arity);
        self.apply(spec, arity)
    }

    fn value_type(&self, arity: Arity) -> TypeTag {
        match &self.value_type {
            Some(name) => TypeTag::from_name(name, self.choices.clone()),
            None if !self.choices.is_empty() => TypeTag::Choice(self.choices.clone()),
            None if arity == Arity::Fixed(0) => TypeTag::Boolean,
            None => TypeTag::String,
        }
    }

    fn apply(&self, mut spec: ArgumentSpec, arity: Arity) -> ConfigResult<ArgumentSpec> {
        spec = spec
            .with_type(self.value_type(arity))
            .required(self.required)
            .with_repeat(self.repeat)
            .global(self.global)
            .hidden(self.hidden);

        if let Some(default) = &self.default {
            spec = spec.with_defaults(default.clone());
        }
        if let Some(implicit) = &self.implicit {
            spec = spec.with_implicit(implicit.clone());
        }
        if let Some(group) = &self.group {
            spec = spec.with_group(group.clone());
        }
        if let Some(delimiter) = self.delimiter {
            spec = spec.with_delimiter(delimiter);
        }
        if let Some(help) = &self.help {
            spec = spec.with_help(help.clone());
        }
        if let Some(help) = &self.long_help {
            spec = spec.with_long_help(help.clone());
        }
        if let Some(value_name) = &self.value_name {
            spec = spec.with_value_name(value_name.clone());
        }
        for relevant in &self.relevant {
            spec = spec.with_relevant(relevant.name.clone(), relevant.required);
        }

        for def in &self.validators {
            for validator in def.build()? {
                spec = spec.with_validator(validator);
            }
        }

        Ok(spec)
    }
}

impl ValidatorDef {
    /// Build the validators this definition describes
    pub fn build(&self) -> ConfigResult<Vec<Validator>> {
        let mut validators = Vec::new();

        match (self.min, self.max) {
            (Some(min), Some(max)) => validators.push(Validator::range(min, max)),
            (Some(min), None) => validators.push(Validator::min(min)),
            (None, Some(max)) => validators.push(Validator::max(max)),
            (None, None) => {}
        }
        if let Some(pattern) = &self.pattern {
            let validator = Validator::pattern(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                error: e.to_string(),
            })?;
            validators.push(validator);
        }
        if self.non_empty {
            validators.push(Validator::non_empty());
        }

        if validators.is_empty() {
            return Err(ConfigError::Invalid(
                "Validator needs one of: min, max, pattern, non-empty".to_string(),
            ));
        }

        if let Some(message) = &self.message {
            validators = validators
                .into_iter()
                .map(|v| v.with_message(message.clone()))
                .collect();
        }

        Ok(validators)
    }
}

/// Parse a YAML definition into an unsealed registry
///
/// Custom types can be registered on the result before sealing it.
pub fn registry_from_yaml(yaml: &str) -> Result<Registry> {
    let def: RegistryDef = serde_yaml::from_str(yaml)?;
    Ok(def.build()?)
}

/// Parse a YAML definition into a sealed registry
pub fn sealed_from_yaml(yaml: &str) -> Result<Registry> {
    let mut registry = registry_from_yaml(yaml)?;
    registry.seal()?;
    Ok(registry)
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Custom deserializer for names that handles both a single name and a list
fn deserialize_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => seq
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| D::Error::custom("names must be strings"))
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("names must be a string or array")),
    }
}

/// Custom deserializer for arity that handles both counts and symbols
fn deserialize_arity<'de, D>(deserializer: D) -> std::result::Result<Option<Arity>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(|n| Some(Arity::Fixed(n as usize)))
            .ok_or_else(|| D::Error::custom(format!("Invalid arity: {}", n))),
        Value::String(s) => s.parse::<Arity>().map(Some).map_err(D::Error::custom),
        _ => Err(D::Error::custom("arity must be a number or one of ?, *, +, ...")),
    }
}

/// Custom deserializer for defaults that handles both scalars and lists
fn deserialize_raw_values<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Null => Ok(None),
        Value::Sequence(seq) => seq
            .iter()
            .map(|item| {
                scalar_to_string(item).ok_or_else(|| D::Error::custom("default values must be scalars"))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Some),
        other => scalar_to_string(&other)
            .map(|s| Some(vec![s]))
            .ok_or_else(|| D::Error::custom("default must be a scalar or array")),
    }
}

fn deserialize_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Null => Ok(None),
        other => scalar_to_string(&other)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a scalar value")),
    }
}
