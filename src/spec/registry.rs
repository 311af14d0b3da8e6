//! Spec registry
//!
//! A registry holds the options, positionals and subcommands of one command.
//! Registries are built mutably and then sealed; sealing validates the whole
//! tree and converts declared defaults, after which the registry is read-only
//! and can be shared between threads.

use crate::error::{ConfigError, ConfigResult};
use crate::parse::convert::{ConverterTable, TypeScope};
use crate::parse::{self, Mode, ParsedResult, Report};
use crate::spec::types::{is_identifier, Arity, ArgumentSpec, SpecKind, TypeTag, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Definitions for one command and its subcommands
#[derive(Debug, Clone)]
pub struct Registry {
    name: Option<String>,
    version: Option<String>,
    about: Option<String>,
    options: Vec<ArgumentSpec>,
    positionals: Vec<ArgumentSpec>,
    subcommands: Vec<(String, Registry)>,
    types: ConverterTable,
    abbreviations: bool,
    subcommand_required: bool,
    collect_operands: bool,
    help_requests: bool,
    sealed: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty, unsealed registry
    pub fn new() -> Self {
        Registry {
            name: None,
            version: None,
            about: None,
            options: Vec::new(),
            positionals: Vec::new(),
            subcommands: Vec::new(),
            types: ConverterTable::default(),
            abbreviations: true,
            subcommand_required: false,
            collect_operands: false,
            help_requests: true,
            sealed: false,
        }
    }

    fn ensure_unsealed(&self) -> ConfigResult<()> {
        if self.sealed {
            Err(ConfigError::Sealed)
        } else {
            Ok(())
        }
    }

    /// Add a named option
    pub fn add_option(&mut self, mut spec: ArgumentSpec) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        spec.kind = SpecKind::Option;
        spec.prepare()?;
        self.options.push(spec);
        Ok(self)
    }

    /// Add a positional argument; positionals bind in the order they are added
    pub fn add_positional(&mut self, mut spec: ArgumentSpec) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        spec.kind = SpecKind::Positional;
        spec.prepare()?;
        self.positionals.push(spec);
        Ok(self)
    }

    /// Add a nested subcommand and return its registry
    pub fn add_subcommand(&mut self, name: impl Into<String>) -> ConfigResult<&mut Registry> {
        self.ensure_unsealed()?;
        let name = name.into();
        if !is_identifier(&name) {
            return Err(ConfigError::InvalidName(name));
        }

        let mut registry = Registry::new();
        registry.name = Some(name.clone());

        let index = self.subcommands.len();
        self.subcommands.push((name, registry));
        Ok(&mut self.subcommands[index].1)
    }

    /// Register a conversion for a custom type name
    ///
    /// The type is visible to this registry and every nested subcommand.
    pub fn register_type<F>(&mut self, name: impl Into<String>, convert: F) -> ConfigResult<&mut Self>
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.ensure_unsealed()?;
        self.types.register(name, Arc::new(convert));
        Ok(self)
    }

    /// Name shown in version output and usage lines
    ///
    /// Subcommand registries are named after their subcommand.
    pub fn set_name(&mut self, name: impl Into<String>) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        self.name = Some(name.into());
        Ok(self)
    }

    pub fn set_version(&mut self, version: impl Into<String>) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        self.version = Some(version.into());
        Ok(self)
    }

    pub fn set_about(&mut self, about: impl Into<String>) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        self.about = Some(about.into());
        Ok(self)
    }

    /// Enable or disable unambiguous prefix matching of long options
    pub fn set_abbreviations(&mut self, enabled: bool) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        self.abbreviations = enabled;
        Ok(self)
    }

    /// Require one of the subcommands to be selected
    pub fn set_subcommand_required(&mut self, required: bool) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        self.subcommand_required = required;
        Ok(self)
    }

    /// Keep positional tokens that no positional spec accepts as operands
    pub fn set_collect_operands(&mut self, collect: bool) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        self.collect_operands = collect;
        Ok(self)
    }

    /// Treat a leading `-h`, `--help`, `help`, `-v`, `--version` or `version`
    /// as a help or version request, unless it is a declared name
    pub fn set_help_requests(&mut self, enabled: bool) -> ConfigResult<&mut Self> {
        self.ensure_unsealed()?;
        self.help_requests = enabled;
        Ok(self)
    }

    /// Validate the registry tree and make it read-only
    ///
    /// Sealing an already sealed registry does nothing.
    pub fn seal(&mut self) -> ConfigResult<()> {
        if self.sealed {
            return Ok(());
        }
        self.seal_in(&TypeScope::default())
    }

    fn seal_in(&mut self, parent: &TypeScope<'_>) -> ConfigResult<()> {
        let Registry {
            options,
            positionals,
            subcommands,
            types,
            sealed,
            ..
        } = self;
        let scope = parent.nested(types);

        check_names(options, positionals)?;
        check_options(options)?;
        check_positionals(positionals)?;
        check_groups(options.iter().chain(positionals.iter()))?;
        check_relevant(options, positionals)?;

        // Types and defaults
        for spec in options.iter_mut().chain(positionals.iter_mut()) {
            resolve_values(spec, &scope)?;
        }

        // Subcommands
        let mut seen = HashSet::new();
        for (name, _) in subcommands.iter() {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateSubcommand(name.clone()));
            }
        }
        for (name, sub) in subcommands.iter_mut() {
            if sub.sealed {
                continue;
            }
            sub.seal_in(&scope).map_err(|e| ConfigError::InSubcommand {
                name: name.clone(),
                source: Box::new(e),
            })?;
        }

        *sealed = true;
        tracing::debug!(
            options = options.len(),
            positionals = positionals.len(),
            subcommands = subcommands.len(),
            "registry sealed"
        );
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn options(&self) -> &[ArgumentSpec] {
        &self.options
    }

    pub fn positionals(&self) -> &[ArgumentSpec] {
        &self.positionals
    }

    /// Subcommands in declaration order
    pub fn subcommands(&self) -> impl Iterator<Item = (&str, &Registry)> {
        self.subcommands.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn subcommand(&self, name: &str) -> Option<&Registry> {
        self.subcommand_index(name).map(|i| &self.subcommands[i].1)
    }

    pub(crate) fn subcommand_index(&self, name: &str) -> Option<usize> {
        self.subcommands.iter().position(|(n, _)| n == name)
    }

    pub(crate) fn subcommand_at(&self, index: usize) -> (&str, &Registry) {
        let (name, registry) = &self.subcommands[index];
        (name, registry)
    }

    /// Follow a path of subcommand names from this registry
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Registry> {
        path.iter()
            .try_fold(self, |registry, name| registry.subcommand(name.as_ref()))
    }

    /// Option with exactly this name
    pub(crate) fn option_named(&self, name: &str) -> Option<&ArgumentSpec> {
        self.options.iter().find(|s| s.names.iter().any(|n| n == name))
    }

    /// Argument by option name or positional key
    ///
    /// A bare word also matches the option with that long name (`out` for
    /// `--out`) or that short name (`o` for `-o`).
    pub fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        if let Some(spec) = self.option_named(name) {
            return Some(spec);
        }
        if let Some(spec) = self.positionals.iter().find(|s| s.key() == name) {
            return Some(spec);
        }
        if name.starts_with('-') {
            return None;
        }
        let dashed = if name.chars().count() == 1 {
            format!("-{}", name)
        } else {
            format!("--{}", name)
        };
        self.option_named(&dashed)
    }

    /// Options having a long name that starts with `prefix`, with that name
    pub(crate) fn options_with_prefix(&self, prefix: &str) -> Vec<(&ArgumentSpec, &str)> {
        self.options
            .iter()
            .flat_map(|spec| {
                spec.long_names()
                    .filter(move |n| n.starts_with(prefix))
                    .map(move |n| (spec, n.as_str()))
            })
            .collect()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn allows_abbreviations(&self) -> bool {
        self.abbreviations
    }

    pub fn requires_subcommand(&self) -> bool {
        self.subcommand_required
    }

    pub fn collects_operands(&self) -> bool {
        self.collect_operands
    }

    pub fn answers_requests(&self) -> bool {
        self.help_requests
    }

    pub fn types(&self) -> &ConverterTable {
        &self.types
    }

    /// Declared defaults by key
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.options
            .iter()
            .chain(self.positionals.iter())
            .filter_map(|s| s.default().map(|d| (s.key().to_string(), d.clone())))
            .collect()
    }

    /// Parse an argument list (without the program name)
    pub fn parse<I, S>(&self, args: I, mode: Mode) -> Result<ParsedResult, Report>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        parse::parse(self, &args, mode)
    }

    /// Parse the arguments of the current process
    pub fn parse_env(&self, mode: Mode) -> Result<ParsedResult, Report> {
        self.parse(std::env::args().skip(1), mode)
    }
}

/// Names, aliases and result keys are unique among siblings
fn check_names(options: &[ArgumentSpec], positionals: &[ArgumentSpec]) -> ConfigResult<()> {
    let mut names = HashSet::new();
    for name in options.iter().flat_map(|s| s.names.iter()) {
        if !names.insert(name.as_str()) {
            return Err(ConfigError::DuplicateName(name.clone()));
        }
    }

    let mut keys = HashSet::new();
    for spec in options.iter().chain(positionals.iter()) {
        if !keys.insert(spec.key()) {
            return Err(ConfigError::DuplicateName(spec.key().to_string()));
        }
    }

    Ok(())
}

fn check_options(options: &[ArgumentSpec]) -> ConfigResult<()> {
    for spec in options {
        if spec.arity == Arity::Fixed(0) && spec.value_type != TypeTag::Boolean {
            return Err(ConfigError::FlagNotBoolean(spec.display_name().to_string()));
        }
        if spec.arity == Arity::Remainder {
            return Err(ConfigError::MisplacedRemainder(spec.display_name().to_string()));
        }
    }
    Ok(())
}

/// Positional ordering: one variable-arity positional, nothing required after
/// it or after an optional positional
fn check_positionals(positionals: &[ArgumentSpec]) -> ConfigResult<()> {
    let mut variadic: Option<&str> = None;
    let mut optional: Option<&str> = None;

    for (i, spec) in positionals.iter().enumerate() {
        if spec.arity == Arity::Fixed(0) {
            return Err(ConfigError::EmptyPositional(spec.key().to_string()));
        }
        if spec.arity == Arity::Remainder && i + 1 != positionals.len() {
            return Err(ConfigError::MisplacedRemainder(spec.key().to_string()));
        }

        if spec.required {
            if let Some(variadic) = variadic {
                return Err(ConfigError::RequiredAfterVariadic {
                    variadic: variadic.to_string(),
                    required: spec.key().to_string(),
                });
            }
            if let Some(optional) = optional {
                return Err(ConfigError::RequiredAfterOptional {
                    optional: optional.to_string(),
                    required: spec.key().to_string(),
                });
            }
        }

        if spec.arity.is_variable() {
            if let Some(first) = variadic {
                return Err(ConfigError::MultipleVariadic {
                    first: first.to_string(),
                    second: spec.key().to_string(),
                });
            }
            variadic = Some(spec.key());
        } else if !spec.required && optional.is_none() {
            optional = Some(spec.key());
        }
    }

    Ok(())
}

/// Relevant arguments must name an argument of the same registry
fn check_relevant(options: &[ArgumentSpec], positionals: &[ArgumentSpec]) -> ConfigResult<()> {
    for spec in options.iter().chain(positionals.iter()) {
        for (name, _) in spec.relevant() {
            let known = options.iter().any(|o| o.names.iter().any(|n| n == name))
                || positionals.iter().any(|p| p.key() == name);
            if !known {
                return Err(ConfigError::UnknownRelevant {
                    name: spec.display_name().to_string(),
                    relevant: name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// A mutual-exclusion group cannot contain two required members
fn check_groups<'a>(specs: impl Iterator<Item = &'a ArgumentSpec>) -> ConfigResult<()> {
    let mut required: HashMap<&str, &str> = HashMap::new();

    for spec in specs.filter(|s| s.required) {
        let Some(group) = spec.group() else {
            continue;
        };
        if let Some(first) = required.insert(group, spec.display_name()) {
            return Err(ConfigError::RequiredInGroup {
                group: group.to_string(),
                first: first.to_string(),
                second: spec.display_name().to_string(),
            });
        }
    }

    Ok(())
}

/// Check the declared type and convert raw defaults and implicit values
fn resolve_values(spec: &mut ArgumentSpec, scope: &TypeScope<'_>) -> ConfigResult<()> {
    let name = spec.display_name().to_string();

    match &spec.value_type {
        TypeTag::Choice(choices) if choices.is_empty() => {
            return Err(ConfigError::EmptyChoices(name));
        }
        tag if !scope.resolves(tag) => {
            return Err(ConfigError::UnknownType {
                name,
                type_name: tag.name().to_string(),
            });
        }
        _ => {}
    }

    let convert = |raw: &str| -> ConfigResult<Vec<Value>> {
        let parts: Vec<&str> = match spec.delimiter {
            Some(d) => raw.split(d).collect(),
            None => vec![raw],
        };
        parts
            .into_iter()
            .map(|part| {
                scope
                    .convert(&spec.value_type, part)
                    .map_err(|failure| ConfigError::InvalidDefault {
                        name: name.clone(),
                        value: raw.to_string(),
                        error: failure.reason,
                    })
            })
            .collect()
    };

    let default = match &spec.default_raw {
        Some(raw) => {
            let mut values = Vec::new();
            for item in raw {
                values.extend(convert(item)?);
            }

            if spec.is_multi() {
                Some(Value::List(values))
            } else if values.len() == 1 {
                Some(values.remove(0))
            } else {
                return Err(ConfigError::InvalidDefault {
                    name: name.clone(),
                    value: raw.join(" "),
                    error: "expected a single value".to_string(),
                });
            }
        }
        // Flags are false unless given; appending flags start empty
        None if spec.kind == SpecKind::Option && spec.arity == Arity::Fixed(0) => {
            if spec.is_multi() {
                Some(Value::List(Vec::new()))
            } else {
                Some(Value::Bool(false))
            }
        }
        None => None,
    };

    let implicit = match &spec.implicit_raw {
        Some(raw) => {
            let mut values = convert(raw)?;
            if spec.is_multi() || values.len() != 1 {
                Some(Value::List(values))
            } else {
                Some(values.remove(0))
            }
        }
        None => None,
    };

    spec.default = default;
    spec.implicit = implicit;
    Ok(())
}
