//! Error types for Argot
//!
//! Registry misconfiguration is a [`ConfigError`], raised while building or
//! sealing a registry. Problems with user input never surface here; they are
//! collected as [`ParseError`](crate::parse::ParseError) values inside a
//! [`Report`].

use crate::parse::Report;
use thiserror::Error;

/// Result type alias for Argot operations
pub type Result<T> = std::result::Result<T, ArgotError>;

/// Main error type for Argot
#[derive(Error, Debug)]
pub enum ArgotError {
    /// Registry construction or sealing errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// User input did not match the registry
    #[error("{0}")]
    Parse(#[from] Report),

    /// YAML registry definition errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Registry construction and sealing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Registry is sealed and can no longer be modified")]
    Sealed,

    #[error("Argument needs at least one name")]
    MissingName,

    #[error("Invalid argument name '{0}'")]
    InvalidName(String),

    #[error("Name '{0}' is used by more than one argument")]
    DuplicateName(String),

    #[error("Subcommand '{0}' is defined more than once")]
    DuplicateSubcommand(String),

    #[error("Required positional '{required}' follows variable-arity positional '{variadic}'")]
    RequiredAfterVariadic { variadic: String, required: String },

    #[error("Required positional '{required}' follows optional positional '{optional}'")]
    RequiredAfterOptional { optional: String, required: String },

    #[error("Positionals '{first}' and '{second}' both take a variable number of values")]
    MultipleVariadic { first: String, second: String },

    #[error("Remainder arity is only allowed on the last positional, not on '{0}'")]
    MisplacedRemainder(String),

    #[error("Positional '{0}' must take at least one value")]
    EmptyPositional(String),

    #[error("Arguments '{first}' and '{second}' are both required but share exclusion group '{group}'")]
    RequiredInGroup {
        group: String,
        first: String,
        second: String,
    },

    #[error("Flag '{0}' takes no value and must be boolean")]
    FlagNotBoolean(String),

    #[error("Default value '{value}' for '{name}' is invalid: {error}")]
    InvalidDefault {
        name: String,
        value: String,
        error: String,
    },

    #[error("Argument '{name}' lists unknown relevant argument '{relevant}'")]
    UnknownRelevant { name: String, relevant: String },

    #[error("Choice argument '{0}' declares no choices")]
    EmptyChoices(String),

    #[error("Type '{type_name}' used by '{name}' is not registered")]
    UnknownType { name: String, type_name: String },

    #[error("Invalid pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    #[error("Invalid definition: {0}")]
    Invalid(String),

    #[error("In subcommand '{name}': {source}")]
    InSubcommand {
        name: String,
        source: Box<ConfigError>,
    },
}

/// Specialized result type for registry operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Unwrap nested subcommand context down to the underlying error
    pub fn root_cause(&self) -> &ConfigError {
        match self {
            ConfigError::InSubcommand { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_subcommands() {
        let err = ConfigError::InSubcommand {
            name: "remote".to_string(),
            source: Box::new(ConfigError::InSubcommand {
                name: "add".to_string(),
                source: Box::new(ConfigError::DuplicateName("--url".to_string())),
            }),
        };

        assert_eq!(
            err.root_cause(),
            &ConfigError::DuplicateName("--url".to_string())
        );
        assert_eq!(
            err.to_string(),
            "In subcommand 'remote': In subcommand 'add': Name '--url' is used by more than one argument"
        );
    }

    #[test]
    fn test_config_error_converts_into_argot_error() {
        let err: ArgotError = ConfigError::Sealed.into();
        assert!(matches!(err, ArgotError::Config(ConfigError::Sealed)));
    }
}
