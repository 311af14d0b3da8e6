//! Argot - declarative command-line argument parsing
//!
//! Arguments are declared once in a [`Registry`], either in code or from a
//! YAML definition, sealed, and then used to parse any number of argument
//! lists. Parsing never panics on user input: every problem is reported as a
//! [`ParseError`] inside a [`Report`].
//!
//! ```
//! use argot::{ArgumentSpec, Mode, Registry};
//!
//! let mut registry = Registry::new();
//! registry
//!     .add_option(ArgumentSpec::flag(["--verbose", "-v"]))
//!     .unwrap()
//!     .add_positional(ArgumentSpec::positional("input").required(true))
//!     .unwrap();
//! registry.seal().unwrap();
//!
//! let result = registry.parse(["--verbose", "file.txt"], Mode::Strict).unwrap();
//! assert_eq!(result.get::<bool>("verbose"), Some(true));
//! assert_eq!(result.get::<String>("input"), Some("file.txt".to_string()));
//! ```

// Public modules
pub mod cli;
pub mod error;
pub mod help;
pub mod parse;
pub mod spec;

// Re-export commonly used types
pub use error::{ArgotError, ConfigError, Result};
pub use parse::{parse, ErrorKind, Mode, ParseError, ParsedResult, Report, Request};
pub use spec::{Arity, ArgumentSpec, Registry, TypeTag, Value};

/// Current version of Argot
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
