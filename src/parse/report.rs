//! Parse errors and the error reporter
//!
//! Every failure during a parse becomes a [`ParseError`]. The [`Reporter`]
//! decides, based on the [`Mode`], whether parsing continues after one.

use colored::Colorize;
use std::fmt;
use std::ops::ControlFlow;

/// How many errors a parse reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Stop at the first error
    #[default]
    Strict,
    /// Keep going and report every error
    Collect,
}

/// Broad class of a parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Parse,
    Conversion,
    Validation,
}

/// What went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownOption,
    /// An abbreviation matched several options, listed by name
    Ambiguous(Vec<String>),
    MissingRequired,
    WrongArity,
    UnexpectedToken,
    UnexpectedValue,
    MutuallyExclusive,
    Duplicate,
    MissingSubcommand,
    /// The registry was not sealed before parsing
    Unsealed,
    Conversion { type_name: String },
    Validation,
}

impl ErrorKind {
    pub fn category(&self) -> Category {
        match self {
            ErrorKind::Conversion { .. } => Category::Conversion,
            ErrorKind::Validation => Category::Validation,
            _ => Category::Parse,
        }
    }

    /// Short tag used when rendering
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::UnknownOption => "unknown-option",
            ErrorKind::Ambiguous(_) => "ambiguous",
            ErrorKind::MissingRequired => "missing-required",
            ErrorKind::WrongArity => "wrong-arity",
            ErrorKind::UnexpectedToken => "unexpected-token",
            ErrorKind::UnexpectedValue => "unexpected-value",
            ErrorKind::MutuallyExclusive => "mutually-exclusive",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::MissingSubcommand => "missing-subcommand",
            ErrorKind::Unsealed => "unsealed",
            ErrorKind::Conversion { .. } => "conversion",
            ErrorKind::Validation => "validation",
        }
    }
}

/// A single failure, reported as data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ErrorKind,
    /// Option name or `positional #k (name)` the error is about
    pub subject: Option<String>,
    /// The input tokens involved
    pub tokens: Vec<String>,
    /// Index of the first raw argument involved
    pub offset: Option<usize>,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            subject: None,
            tokens: Vec::new(),
            offset: None,
            message: message.into(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    fn location(&self) -> Option<String> {
        match (self.tokens.is_empty(), self.offset) {
            (true, None) => None,
            (true, Some(offset)) => Some(format!("at argument {}", offset + 1)),
            (false, None) => Some(format!("while parsing \"{}\"", self.tokens.join(" "))),
            (false, Some(offset)) => Some(format!(
                "while parsing \"{}\" at argument {}",
                self.tokens.join(" "),
                offset + 1
            )),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(subject) = &self.subject {
            write!(f, "{}: ", subject)?;
        }
        f.write_str(&self.message)?;
        if let Some(location) = self.location() {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

/// All errors of a failed parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    mode: Mode,
    errors: Vec<ParseError>,
}

impl Report {
    pub(crate) fn new(mode: Mode, errors: Vec<ParseError>) -> Self {
        Report { mode, errors }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn first(&self) -> Option<&ParseError> {
        self.errors.first()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
        self.errors.iter()
    }

    /// Whether any error has the given kind
    pub fn contains(&self, kind: &ErrorKind) -> bool {
        self.errors.iter().any(|e| &e.kind == kind)
    }

    /// Render for a terminal, one error per line
    pub fn render_colored(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{} {}", format!("error[{}]:", e.kind.tag()).red().bold(), e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a ParseError;
    type IntoIter = std::slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "error[{}]: {}", error.kind.tag(), error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Report {}

/// Collects errors and tells the engine whether to keep going
#[derive(Debug)]
pub(crate) struct Reporter {
    mode: Mode,
    errors: Vec<ParseError>,
}

impl Reporter {
    pub(crate) fn new(mode: Mode) -> Self {
        Reporter {
            mode,
            errors: Vec::new(),
        }
    }

    /// Record an error; breaks in strict mode
    pub(crate) fn report(&mut self, error: ParseError) -> ControlFlow<()> {
        tracing::trace!(kind = error.kind.tag(), "{}", error);
        self.errors.push(error);
        match self.mode {
            Mode::Strict => ControlFlow::Break(()),
            Mode::Collect => ControlFlow::Continue(()),
        }
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn into_report(self) -> Report {
        Report::new(self.mode, self.errors)
    }
}
