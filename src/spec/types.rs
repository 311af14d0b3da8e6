//! Core argument specification types
//!
//! This module defines the data structures that describe a single argument:
//! its names, how many values it consumes, what type those values convert to
//! and how repeated occurrences combine.

use crate::error::{ConfigError, ConfigResult};
use crate::parse::validate::Validator;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

/// Number of value tokens an argument consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly N values. `Fixed(0)` is a flag.
    Fixed(usize),
    /// Zero or one value (`?`)
    Optional,
    /// Zero or more values (`*`)
    ZeroOrMore,
    /// One or more values (`+`)
    OneOrMore,
    /// Every remaining token, verbatim (`...`)
    Remainder,
}

impl Arity {
    /// Minimum number of values that satisfy this arity
    pub fn min(&self) -> usize {
        match self {
            Arity::Fixed(n) => *n,
            Arity::OneOrMore => 1,
            Arity::Optional | Arity::ZeroOrMore | Arity::Remainder => 0,
        }
    }

    /// Whether the number of consumed values is open-ended
    pub fn is_variable(&self) -> bool {
        matches!(self, Arity::ZeroOrMore | Arity::OneOrMore | Arity::Remainder)
    }

    /// Whether a binding of this arity holds a list rather than one value
    pub fn is_multi(&self) -> bool {
        match self {
            Arity::Fixed(n) => *n > 1,
            Arity::Optional => false,
            _ => true,
        }
    }

    /// Whether the argument accepts any value at all
    pub fn takes_value(&self) -> bool {
        *self != Arity::Fixed(0)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Optional => f.write_str("?"),
            Arity::ZeroOrMore => f.write_str("*"),
            Arity::OneOrMore => f.write_str("+"),
            Arity::Remainder => f.write_str("..."),
        }
    }
}

impl FromStr for Arity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "?" => Ok(Arity::Optional),
            "*" => Ok(Arity::ZeroOrMore),
            "+" => Ok(Arity::OneOrMore),
            "..." | "remainder" => Ok(Arity::Remainder),
            other => other.parse::<usize>().map(Arity::Fixed).map_err(|_| {
                ConfigError::Invalid(format!(
                    "Invalid arity: {}. Must be a number, ?, *, + or ...",
                    other
                ))
            }),
        }
    }
}

/// How repeated occurrences of the same argument combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    /// The last occurrence wins
    #[default]
    Overwrite,
    /// Values of every occurrence accumulate into one list
    Append,
    /// A second occurrence is an error
    Reject,
}

/// Declared value type of an argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Integer,
    Float,
    Boolean,
    String,
    Path,
    /// One of a fixed set of strings
    Choice(Vec<String>),
    /// A type registered by name with [`Registry::register_type`](crate::spec::Registry::register_type)
    Custom(String),
}

impl TypeTag {
    /// Human readable name used in messages
    pub fn name(&self) -> &str {
        match self {
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Boolean => "boolean",
            TypeTag::String => "string",
            TypeTag::Path => "path",
            TypeTag::Choice(_) => "choice",
            TypeTag::Custom(name) => name,
        }
    }

    /// Resolve a type name as written in a definition
    pub fn from_name(name: &str, choices: Vec<String>) -> Self {
        match name {
            "int" | "integer" => TypeTag::Integer,
            "float" | "number" => TypeTag::Float,
            "bool" | "boolean" => TypeTag::Boolean,
            "str" | "string" => TypeTag::String,
            "path" => TypeTag::Path,
            "choice" | "enum" => TypeTag::Choice(choices),
            other => TypeTag::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A converted argument value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    List(Vec<Value>),
}

impl Value {
    /// Numeric view used by range validators
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Textual view used by pattern validators
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Path(p) => p.to_str(),
            _ => None,
        }
    }

    /// Items of a list value, or the value itself as a single item
    pub fn items(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
            Value::Path(v) => write!(f, "{}", v.display()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Typed extraction from a [`Value`]
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            Value::Path(p) => Some(p.display().to_string()),
            _ => None,
        }
    }
}

impl FromValue for PathBuf {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Path(p) => Some(p.clone()),
            Value::Str(s) => Some(PathBuf::from(s)),
            _ => None,
        }
    }
}

macro_rules! integer_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(*v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_from_value!(i64, i32, i16, u64, u32, u16, u8, usize);

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        value.items().iter().map(T::from_value).collect()
    }
}

/// Whether an argument is matched by name or by position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    Option,
    Positional,
}

/// Definition of a single option or positional argument
///
/// Specs are built with the `with_*` methods and handed to a
/// [`Registry`](crate::spec::Registry). Raw defaults are converted to typed
/// values when the registry is sealed.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub(crate) kind: SpecKind,
    pub(crate) names: Vec<String>,
    pub(crate) key: String,
    pub(crate) arity: Arity,
    pub(crate) value_type: TypeTag,
    pub(crate) default_raw: Option<Vec<String>>,
    pub(crate) default: Option<Value>,
    pub(crate) implicit_raw: Option<String>,
    pub(crate) implicit: Option<Value>,
    pub(crate) required: bool,
    pub(crate) group: Option<String>,
    pub(crate) validators: Vec<Validator>,
    pub(crate) repeat: Repeat,
    pub(crate) global: bool,
    pub(crate) delimiter: Option<char>,
    pub(crate) help: Option<String>,
    pub(crate) long_help: Option<String>,
    pub(crate) value_name: Option<String>,
    pub(crate) hidden: bool,
    /// Related arguments listed in per-argument help, with whether each is required
    pub(crate) relevant: Vec<(String, bool)>,
}

fn long_name_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^--[A-Za-z][A-Za-z0-9_-]*$").expect("valid pattern"))
}

fn short_name_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^-[A-Za-z0-9]$").expect("valid pattern"))
}

fn positional_name_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid pattern"))
}

/// Whether `name` is a valid positional or subcommand name
pub(crate) fn is_identifier(name: &str) -> bool {
    positional_name_regex().is_match(name)
}

impl ArgumentSpec {
    fn new(kind: SpecKind, names: Vec<String>, arity: Arity, value_type: TypeTag) -> Self {
        ArgumentSpec {
            kind,
            names,
            key: String::new(),
            arity,
            value_type,
            default_raw: None,
            default: None,
            implicit_raw: None,
            implicit: None,
            required: false,
            group: None,
            validators: Vec::new(),
            repeat: Repeat::default(),
            global: false,
            delimiter: None,
            help: None,
            long_help: None,
            value_name: None,
            hidden: false,
            relevant: Vec::new(),
        }
    }

    /// A named option taking one string value, e.g. `["--output", "-o"]`
    pub fn option<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        Self::new(SpecKind::Option, names, Arity::Fixed(1), TypeTag::String)
    }

    /// A boolean option that takes no value
    pub fn flag<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::option(names)
            .with_arity(Arity::Fixed(0))
            .with_type(TypeTag::Boolean)
    }

    /// A positional argument taking one string value
    pub fn positional(name: impl Into<String>) -> Self {
        Self::new(
            SpecKind::Positional,
            vec![name.into()],
            Arity::Fixed(1),
            TypeTag::String,
        )
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_type(mut self, value_type: TypeTag) -> Self {
        self.value_type = value_type;
        self
    }

    /// Restrict values to a fixed set of strings
    pub fn with_choices<I, S>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = choices.into_iter().map(Into::into).collect();
        self.with_type(TypeTag::Choice(choices))
    }

    /// Raw default value, converted with the declared type when sealing
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_raw = Some(vec![value.into()]);
        self
    }

    /// Raw default values for multi-value arities
    pub fn with_defaults<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_raw = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Value bound when an optional-arity option is given without a value
    pub fn with_implicit(mut self, value: impl Into<String>) -> Self {
        self.implicit_raw = Some(value.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Place the argument in a mutual-exclusion group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Make an option visible inside nested subcommands
    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// Split every value on `delimiter` before conversion
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_long_help(mut self, help: impl Into<String>) -> Self {
        self.long_help = Some(help.into());
        self
    }

    pub fn with_value_name(mut self, name: impl Into<String>) -> Self {
        self.value_name = Some(name.into());
        self
    }

    /// Hide the argument from generated help
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// List another argument of the same registry in this one's help
    ///
    /// `name` is an option name (`--out`) or a positional name.
    pub fn with_relevant(mut self, name: impl Into<String>, required: bool) -> Self {
        self.relevant.push((name.into(), required));
        self
    }

    /// Check name syntax and derive the result key
    pub(crate) fn prepare(&mut self) -> ConfigResult<()> {
        if self.names.is_empty() {
            return Err(ConfigError::MissingName);
        }

        match self.kind {
            SpecKind::Option => {
                for name in &self.names {
                    if !long_name_regex().is_match(name) && !short_name_regex().is_match(name) {
                        return Err(ConfigError::InvalidName(name.clone()));
                    }
                }
                let primary = self
                    .long_names()
                    .next()
                    .unwrap_or(&self.names[0])
                    .trim_start_matches('-');
                self.key = primary.to_string();
            }
            SpecKind::Positional => {
                let name = &self.names[0];
                if self.names.len() != 1 || !is_identifier(name) {
                    return Err(ConfigError::InvalidName(name.clone()));
                }
                self.key = name.clone();
            }
        }

        Ok(())
    }

    /// Key under which the value appears in a parsed result
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn long_names(&self) -> impl Iterator<Item = &String> {
        self.names.iter().filter(|n| n.starts_with("--"))
    }

    pub fn short_names(&self) -> impl Iterator<Item = char> + '_ {
        self.names
            .iter()
            .filter(|n| !n.starts_with("--"))
            .filter_map(|n| n.strip_prefix('-'))
            .filter_map(|n| n.chars().next())
    }

    /// Preferred name for messages: the first long name, else the first name
    pub fn display_name(&self) -> &str {
        self.long_names().next().unwrap_or(&self.names[0])
    }

    pub fn kind(&self) -> SpecKind {
        self.kind
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn value_type(&self) -> &TypeTag {
        &self.value_type
    }

    /// Typed default, available once the registry is sealed
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn default_raw(&self) -> Option<&[String]> {
        self.default_raw.as_deref()
    }

    pub fn implicit(&self) -> Option<&Value> {
        self.implicit.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn delimiter(&self) -> Option<char> {
        self.delimiter
    }

    /// Whether a binding holds a list of values
    pub fn is_multi(&self) -> bool {
        self.arity.is_multi() || self.delimiter.is_some() || self.repeat == Repeat::Append
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Long help, falling back to the short help
    pub fn long_help(&self) -> Option<&str> {
        self.long_help.as_deref().or(self.help.as_deref())
    }

    /// Placeholder shown in usage, defaults to the upper-cased key
    pub fn value_name(&self) -> String {
        self.value_name
            .clone()
            .unwrap_or_else(|| self.key.to_uppercase().replace('-', "_"))
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn relevant(&self) -> &[(String, bool)] {
        &self.relevant
    }
}
