//! Parsing
//!
//! This module turns raw arguments into a [`ParsedResult`] using a sealed
//! [`Registry`](crate::spec::Registry): tokenizing, matching, converting and
//! validating, with failures collected into a [`Report`].

pub mod convert;
mod engine;
pub mod report;
pub mod result;
pub mod token;
pub mod validate;

// Re-export main types
pub use convert::{ConversionFailure, ConvertFn, ConverterTable};
pub use report::{Category, ErrorKind, Mode, ParseError, Report};
pub use result::{ParsedResult, Request, Subcommand};
pub use token::{tokenize, Token, TokenKind};
pub use validate::Validator;

use crate::spec::Registry;

/// Parse `args` (without the program name) against a sealed registry
///
/// Every failure is returned in the [`Report`]; in [`Mode::Strict`] it holds
/// exactly one error.
pub fn parse<S: AsRef<str>>(registry: &Registry, args: &[S], mode: Mode) -> Result<ParsedResult, Report> {
    if !registry.is_sealed() {
        let error = ParseError::new(ErrorKind::Unsealed, "registry must be sealed before parsing");
        return Err(Report::new(mode, vec![error]));
    }
    engine::run(registry, args, mode)
}
