//! Value validation
//!
//! Validators are predicates attached to an argument. They run on converted
//! values only, in declaration order, and the first failing predicate decides
//! the reported message.

use crate::spec::Value;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A predicate on a converted value together with its failure message
#[derive(Clone)]
pub struct Validator {
    message: String,
    predicate: Predicate,
}

impl Validator {
    /// Create a validator from an arbitrary predicate
    pub fn new<F>(message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Validator {
            message: message.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Numeric lower bound (inclusive)
    pub fn min(min: f64) -> Self {
        Self::new(format!("must be at least {}", min), move |v| {
            v.as_f64().map_or(true, |n| n >= min)
        })
    }

    /// Numeric upper bound (inclusive)
    pub fn max(max: f64) -> Self {
        Self::new(format!("must be at most {}", max), move |v| {
            v.as_f64().map_or(true, |n| n <= max)
        })
    }

    /// Numeric range (inclusive on both ends)
    pub fn range(min: f64, max: f64) -> Self {
        Self::new(format!("must be between {} and {}", min, max), move |v| {
            v.as_f64().map_or(true, |n| n >= min && n <= max)
        })
    }

    /// Textual values must match a regular expression
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(Self::new(format!("must match pattern '{}'", pattern), move |v| {
            v.as_str().map_or(true, |s| re.is_match(s))
        }))
    }

    /// Textual values must not be empty
    pub fn non_empty() -> Self {
        Self::new("must not be empty", |v| v.as_str().map_or(true, |s| !s.is_empty()))
    }

    /// Replace the failure message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// The first value that failed validation and the predicate it failed
#[derive(Debug)]
pub struct Rejection<'v> {
    pub index: usize,
    pub validator: &'v Validator,
}

/// Run every validator over each value, stopping at the first failure
pub fn validate_values<'v>(validators: &'v [Validator], values: &[Value]) -> Result<(), Rejection<'v>> {
    for (index, value) in values.iter().enumerate() {
        if let Some(validator) = validators.iter().find(|v| !v.check(value)) {
            return Err(Rejection { index, validator });
        }
    }
    Ok(())
}
