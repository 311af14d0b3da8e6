//! Matching engine
//!
//! A single pass over the normalized tokens, driven by an explicit state
//! machine. Each entered subcommand pushes a frame holding its bindings; the
//! frames are folded into a nested [`ParsedResult`] at the end.

use crate::parse::convert::TypeScope;
use crate::parse::report::{ErrorKind, Mode, ParseError, Report, Reporter};
use crate::parse::result::{ParsedResult, Request, Subcommand};
use crate::parse::token::{tokenize, tokenize_from, ShortOptions, Token, TokenKind};
use crate::parse::validate::validate_values;
use crate::spec::{Arity, ArgumentSpec, Registry, Repeat, TypeTag, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

/// Bindings of one active registry
struct Frame<'r> {
    registry: &'r Registry,
    name: Option<&'r str>,
    values: BTreeMap<String, Value>,
    present: BTreeSet<String>,
    operands: Vec<String>,
    /// Index of the next positional spec to bind
    next_positional: usize,
    request: Option<Request>,
}

impl<'r> Frame<'r> {
    fn new(registry: &'r Registry, name: Option<&'r str>) -> Self {
        Frame {
            registry,
            name,
            values: BTreeMap::new(),
            present: BTreeSet::new(),
            operands: Vec::new(),
            next_positional: 0,
            request: None,
        }
    }
}

/// A spec together with the frame it binds into
#[derive(Clone, Copy)]
struct SpecRef<'r> {
    frame: usize,
    spec: &'r ArgumentSpec,
    /// Declaration index for positionals
    position: Option<usize>,
}

impl SpecRef<'_> {
    fn subject(&self) -> String {
        match self.position {
            Some(k) => format!("positional #{} ({})", k + 1, self.spec.key()),
            None => self.spec.display_name().to_string(),
        }
    }
}

/// An option name waiting for its values
struct Pending<'r> {
    target: SpecRef<'r>,
    name: String,
    index: usize,
}

enum State<'r> {
    ExpectingToken,
    ResolvingOption,
    ConsumingArity(Pending<'r>),
    InSubcommand(usize),
    Done,
}

enum Lookup<'r> {
    Found(SpecRef<'r>),
    Ambiguous(Vec<String>),
    Unknown,
}

/// A raw value and the argument it came from
struct RawValue {
    text: String,
    index: usize,
}

/// Where a binding came from, for error reporting
struct Origin {
    subject: String,
    tokens: Vec<String>,
    offset: usize,
}

impl Origin {
    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, message)
            .with_subject(self.subject.clone())
            .with_tokens(self.tokens.clone())
            .at(self.offset)
    }
}

/// Short options visible from the innermost frame
struct VisibleShorts<'f, 'r>(&'f [Frame<'r>]);

impl ShortOptions for VisibleShorts<'_, '_> {
    fn takes_value(&self, c: char) -> Option<bool> {
        let innermost = self.0.len().checked_sub(1)?;
        self.0.iter().enumerate().rev().find_map(|(depth, frame)| {
            frame
                .registry
                .options()
                .iter()
                .filter(|s| depth == innermost || s.is_global())
                .find(|s| s.short_names().any(|short| short == c))
                .map(|s| s.arity().takes_value())
        })
    }
}

struct Engine<'r, 'a, S> {
    args: &'a [S],
    tokens: Vec<Token>,
    cursor: usize,
    frames: Vec<Frame<'r>>,
    reporter: Reporter,
}

/// Match `args` against a sealed registry
pub(crate) fn run<S: AsRef<str>>(
    registry: &Registry,
    args: &[S],
    mode: Mode,
) -> Result<ParsedResult, Report> {
    tracing::debug!(args = args.len(), ?mode, "parsing arguments");

    let frames = vec![Frame::new(registry, None)];
    let tokens = tokenize(args, &VisibleShorts(&frames));
    let mut engine = Engine {
        args,
        tokens,
        cursor: 0,
        frames,
        reporter: Reporter::new(mode),
    };

    // A break only means strict mode stopped early; the reporter has the error
    let _ = engine.run();

    if engine.reporter.has_errors() {
        let report = engine.reporter.into_report();
        tracing::debug!(errors = report.len(), "parse failed");
        Err(report)
    } else {
        tracing::debug!(depth = engine.frames.len(), "parse finished");
        Ok(engine.finish())
    }
}

impl<'r, 'a, S: AsRef<str>> Engine<'r, 'a, S> {
    fn run(&mut self) -> ControlFlow<()> {
        let mut state = State::ExpectingToken;
        loop {
            state = match state {
                State::ExpectingToken => self.expect_token()?,
                State::ResolvingOption => self.resolve_option()?,
                State::ConsumingArity(pending) => self.consume_arity(pending)?,
                State::InSubcommand(index) => self.enter_subcommand(index),
                State::Done => break,
            };
        }

        // A help or version request stands in for the regular arguments
        if self.frames[self.innermost()].request.is_some() {
            return ControlFlow::Continue(());
        }
        self.check_required()
    }

    fn innermost(&self) -> usize {
        self.frames.len() - 1
    }

    fn expect_token(&mut self) -> ControlFlow<(), State<'r>> {
        if let Some(request) = self.request() {
            tracing::debug!(?request, "help or version requested");
            let innermost = self.innermost();
            self.frames[innermost].request = Some(request);
            return ControlFlow::Continue(State::Done);
        }

        let Some(token) = self.tokens.get(self.cursor) else {
            return ControlFlow::Continue(State::Done);
        };

        match token.kind {
            TokenKind::OptionName => ControlFlow::Continue(State::ResolvingOption),
            TokenKind::Positional => self.positional(),
            TokenKind::Separator => {
                self.cursor += 1;
                ControlFlow::Continue(State::ExpectingToken)
            }
            TokenKind::OptionValue => {
                let error = ParseError::new(ErrorKind::UnexpectedValue, "value does not belong to any option")
                    .with_tokens([token.text.clone()])
                    .at(token.index);
                self.cursor += 1;
                self.reporter.report(error)?;
                ControlFlow::Continue(State::ExpectingToken)
            }
        }
    }

    fn resolve_option(&mut self) -> ControlFlow<(), State<'r>> {
        let token = self.tokens[self.cursor].clone();
        self.cursor += 1;

        let error = match self.lookup(&token.text) {
            Lookup::Found(target) => {
                return ControlFlow::Continue(State::ConsumingArity(Pending {
                    target,
                    name: token.text,
                    index: token.index,
                }));
            }
            Lookup::Ambiguous(names) => {
                let message = format!("ambiguous option, could be {}", names.join(", "));
                ParseError::new(ErrorKind::Ambiguous(names), message)
            }
            Lookup::Unknown => ParseError::new(ErrorKind::UnknownOption, "unknown option"),
        };

        // Drop an attached value along with the unresolved name
        if self.peek_kind() == Some(TokenKind::OptionValue) {
            self.cursor += 1;
        }

        self.reporter.report(
            error
                .with_subject(token.text.clone())
                .with_tokens([token.text])
                .at(token.index),
        )?;
        ControlFlow::Continue(State::ExpectingToken)
    }

    /// `-h`, `--help`, `help`, `-v`, `--version` or `version` as the first
    /// argument of the active registry, when not a declared name
    fn request(&self) -> Option<Request> {
        let frame = &self.frames[self.innermost()];
        if self.cursor != 0 || !frame.registry.answers_requests() {
            return None;
        }

        let token = self.tokens.first()?;
        if token.kind == TokenKind::Separator || token.escaped {
            return None;
        }
        let word = self.args[token.index].as_ref();
        if self.declares(word) || frame.registry.subcommand_index(word).is_some() {
            return None;
        }

        match word {
            "-h" | "--help" | "help" => Some(Request::Help {
                topic: self.args.get(token.index + 1).map(|a| a.as_ref().to_string()),
            }),
            "-v" | "--version" | "version" => Some(Request::Version),
            _ => None,
        }
    }

    /// Whether `name` is exactly an option name visible from the innermost frame
    fn declares(&self, name: &str) -> bool {
        let innermost = self.innermost();
        self.frames.iter().enumerate().any(|(depth, frame)| {
            frame
                .registry
                .option_named(name)
                .map_or(false, |spec| depth == innermost || spec.is_global())
        })
    }

    /// Exact name first, innermost registry then enclosing globals, then
    /// unambiguous long-name prefix
    fn lookup(&self, name: &str) -> Lookup<'r> {
        let innermost = self.innermost();

        for (depth, frame) in self.frames.iter().enumerate().rev() {
            let registry: &'r Registry = frame.registry;
            if let Some(spec) = registry.option_named(name) {
                if depth == innermost || spec.is_global() {
                    return Lookup::Found(SpecRef {
                        frame: depth,
                        spec,
                        position: None,
                    });
                }
            }
        }

        if !name.starts_with("--") || !self.frames[innermost].registry.allows_abbreviations() {
            return Lookup::Unknown;
        }

        let mut candidates: Vec<SpecRef<'r>> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        for (depth, frame) in self.frames.iter().enumerate().rev() {
            let registry: &'r Registry = frame.registry;
            for (spec, long) in registry.options_with_prefix(name) {
                if depth != innermost && !spec.is_global() {
                    continue;
                }
                names.push(long.to_string());
                if !candidates.iter().any(|c| std::ptr::eq(c.spec, spec)) {
                    candidates.push(SpecRef {
                        frame: depth,
                        spec,
                        position: None,
                    });
                }
            }
        }

        match candidates.len() {
            0 => Lookup::Unknown,
            1 => Lookup::Found(candidates[0]),
            _ => {
                names.sort();
                names.dedup();
                Lookup::Ambiguous(names)
            }
        }
    }

    fn consume_arity(&mut self, pending: Pending<'r>) -> ControlFlow<(), State<'r>> {
        let Pending { target, name, index } = pending;
        let spec = target.spec;

        let attached = match self.tokens.get(self.cursor) {
            Some(token) if token.kind == TokenKind::OptionValue => {
                self.cursor += 1;
                Some(RawValue {
                    text: token.text.clone(),
                    index: token.index,
                })
            }
            _ => None,
        };

        match spec.arity() {
            Arity::Fixed(0) => {
                let origin = self.origin(&target, &name, index, attached.iter());
                let value = match attached {
                    None => Value::Bool(true),
                    Some(raw) => match TypeScope::default().convert(&TypeTag::Boolean, &raw.text) {
                        Ok(value) => value,
                        Err(_) => {
                            let error = origin.error(
                                ErrorKind::UnexpectedValue,
                                format!("flag takes no value, got '{}'", raw.text),
                            );
                            self.reporter.report(error)?;
                            return ControlFlow::Continue(State::ExpectingToken);
                        }
                    },
                };
                self.bind_values(target, vec![value], &origin, false)?;
            }
            Arity::Fixed(n) => {
                let mut raw: Vec<RawValue> = attached.into_iter().collect();
                let missing = n.saturating_sub(raw.len());
                raw.extend(self.take_values(missing));
                let origin = self.origin(&target, &name, index, raw.iter());

                if raw.len() < n {
                    let error = origin.error(
                        ErrorKind::WrongArity,
                        format!("expected {} value{}, got {}", n, plural(n), raw.len()),
                    );
                    self.attempted(&target);
                    self.reporter.report(error)?;
                    return ControlFlow::Continue(State::ExpectingToken);
                }
                self.bind_raw(target, raw, &origin, false)?;
            }
            Arity::Optional => {
                let raw: Vec<RawValue> = match attached {
                    Some(raw) => vec![raw],
                    // A subcommand name is never taken as the optional value
                    None if self.before_subcommand() => Vec::new(),
                    None => self.take_values(1),
                };
                let origin = self.origin(&target, &name, index, raw.iter());

                if raw.is_empty() {
                    let implicit = match spec.implicit() {
                        Some(Value::List(items)) if spec.is_multi() => items.clone(),
                        Some(value) => vec![value.clone()],
                        None => Vec::new(),
                    };
                    self.bind_values(target, implicit, &origin, false)?;
                } else {
                    self.bind_raw(target, raw, &origin, false)?;
                }
            }
            Arity::ZeroOrMore | Arity::OneOrMore | Arity::Remainder => {
                let mut raw: Vec<RawValue> = attached.into_iter().collect();
                let available = self.variadic_run();
                let take = available.saturating_sub(self.reserved(self.cursor + available));
                raw.extend(self.take_values(take));
                let origin = self.origin(&target, &name, index, raw.iter());

                if raw.is_empty() && spec.arity() == Arity::OneOrMore {
                    let error = origin.error(ErrorKind::WrongArity, "expected at least one value, got 0");
                    self.attempted(&target);
                    self.reporter.report(error)?;
                    return ControlFlow::Continue(State::ExpectingToken);
                }
                self.bind_raw(target, raw, &origin, false)?;
            }
        }

        ControlFlow::Continue(State::ExpectingToken)
    }

    fn positional(&mut self) -> ControlFlow<(), State<'r>> {
        let token = self.tokens[self.cursor].clone();
        let depth = self.innermost();
        let registry: &'r Registry = self.frames[depth].registry;
        let next = self.frames[depth].next_positional;

        if let Some(index) = self.selects_subcommand(&token) {
            return ControlFlow::Continue(State::InSubcommand(index));
        }

        let Some(spec) = registry.positionals().get(next) else {
            self.cursor += 1;
            if registry.collects_operands() {
                self.frames[depth].operands.push(token.text);
            } else {
                let error = ParseError::new(ErrorKind::UnexpectedToken, "unexpected argument")
                    .with_tokens([token.text])
                    .at(token.index);
                self.reporter.report(error)?;
            }
            return ControlFlow::Continue(State::ExpectingToken);
        };

        let target = SpecRef {
            frame: depth,
            spec,
            position: Some(next),
        };

        match spec.arity() {
            Arity::Remainder => return self.take_remainder(target, token.index),
            Arity::ZeroOrMore | Arity::OneOrMore => {
                // Stays open: later positional tokens keep accumulating here
                let raw = self.take_positionals(usize::MAX);
                let continuing = self.frames[depth].present.contains(spec.key());

                let origin = self.positional_origin(&target, &raw);
                self.bind_raw(target, raw, &origin, continuing)?;
                return ControlFlow::Continue(State::ExpectingToken);
            }
            Arity::Optional => {
                let raw = self.take_positionals(1);
                self.frames[depth].next_positional += 1;

                let origin = self.positional_origin(&target, &raw);
                self.bind_raw(target, raw, &origin, false)?;
            }
            Arity::Fixed(n) => {
                let raw = self.take_positionals(n);
                self.frames[depth].next_positional += 1;

                let origin = self.positional_origin(&target, &raw);
                if raw.len() < n {
                    let error = origin.error(
                        ErrorKind::WrongArity,
                        format!("expected {} value{}, got {}", n, plural(n), raw.len()),
                    );
                    self.attempted(&target);
                    self.reporter.report(error)?;
                    return ControlFlow::Continue(State::ExpectingToken);
                }
                self.bind_raw(target, raw, &origin, false)?;
            }
        }

        self.remainder_after(depth)
    }

    /// Start a remainder positional as soon as the positional before it is
    /// bound, so option-like tokens after it are kept verbatim
    fn remainder_after(&mut self, depth: usize) -> ControlFlow<(), State<'r>> {
        let registry: &'r Registry = self.frames[depth].registry;
        let next = self.frames[depth].next_positional;
        let Some(spec) = registry.positionals().get(next) else {
            return ControlFlow::Continue(State::ExpectingToken);
        };
        if spec.arity() != Arity::Remainder {
            return ControlFlow::Continue(State::ExpectingToken);
        }

        let mut cursor = self.cursor;
        if self.tokens.get(cursor).map(|t| t.kind) == Some(TokenKind::Separator) {
            cursor += 1;
        }
        let start = match self.tokens.get(cursor) {
            Some(token) if self.selects_subcommand(token).is_none() => token.index,
            _ => return ControlFlow::Continue(State::ExpectingToken),
        };

        let target = SpecRef {
            frame: depth,
            spec,
            position: Some(next),
        };
        self.take_remainder(target, start)
    }

    /// Bind every raw argument from `start` on and stop matching
    fn take_remainder(&mut self, target: SpecRef<'r>, start: usize) -> ControlFlow<(), State<'r>> {
        let raw: Vec<RawValue> = self.args[start..]
            .iter()
            .enumerate()
            .map(|(i, arg)| RawValue {
                text: arg.as_ref().to_string(),
                index: start + i,
            })
            .collect();
        self.cursor = self.tokens.len();
        self.frames[target.frame].next_positional += 1;

        let origin = self.positional_origin(&target, &raw);
        self.bind_raw(target, raw, &origin, false)?;
        ControlFlow::Continue(State::Done)
    }

    /// Subcommand named by `token`, if one may be selected now
    ///
    /// Selection waits until the required positionals are bound and is off
    /// while a variable-arity positional is collecting.
    fn selects_subcommand(&self, token: &Token) -> Option<usize> {
        if token.escaped {
            return None;
        }
        let frame = &self.frames[self.innermost()];
        let index = frame.registry.subcommand_index(&token.text)?;

        let pending = frame
            .registry
            .positionals()
            .get(frame.next_positional..)
            .unwrap_or_default();
        let collecting = pending
            .first()
            .map_or(false, |s| s.arity().is_variable() && frame.present.contains(s.key()));
        let owed = pending
            .iter()
            .any(|s| s.is_required() && !frame.present.contains(s.key()));

        if collecting || owed {
            None
        } else {
            Some(index)
        }
    }

    fn before_subcommand(&self) -> bool {
        self.tokens
            .get(self.cursor)
            .map_or(false, |t| t.kind == TokenKind::Positional && self.selects_subcommand(t).is_some())
    }

    fn enter_subcommand(&mut self, index: usize) -> State<'r> {
        let parent: &'r Registry = self.frames[self.innermost()].registry;
        let (name, registry) = parent.subcommand_at(index);
        let start = self.tokens[self.cursor].index + 1;

        tracing::debug!(subcommand = name, "entering subcommand");
        self.frames.push(Frame::new(registry, Some(name)));

        // Short options of the subcommand change how clusters split
        self.tokens = tokenize_from(self.args, start, &VisibleShorts(&self.frames));
        self.cursor = 0;
        State::ExpectingToken
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.cursor).map(|t| t.kind)
    }

    /// Take up to `limit` value tokens following an option
    fn take_values(&mut self, limit: usize) -> Vec<RawValue> {
        let mut raw = Vec::new();
        while raw.len() < limit {
            match self.tokens.get(self.cursor) {
                Some(token) if token.is_value_like() => {
                    raw.push(RawValue {
                        text: token.text.clone(),
                        index: token.index,
                    });
                    self.cursor += 1;
                }
                _ => break,
            }
        }
        raw
    }

    /// Take up to `limit` positional tokens, stepping over separators
    fn take_positionals(&mut self, limit: usize) -> Vec<RawValue> {
        let mut raw = Vec::new();
        while raw.len() < limit {
            match self.tokens.get(self.cursor) {
                Some(token) if token.kind == TokenKind::Positional => {
                    raw.push(RawValue {
                        text: token.text.clone(),
                        index: token.index,
                    });
                }
                Some(token) if token.kind == TokenKind::Separator => {}
                _ => break,
            }
            self.cursor += 1;
        }
        raw
    }

    /// Number of tokens a variadic option could take before hitting an
    /// option, a separator or a subcommand name
    fn variadic_run(&self) -> usize {
        self.tokens[self.cursor..]
            .iter()
            .take_while(|t| t.is_value_like())
            .take_while(|t| self.selects_subcommand(t).is_none())
            .count()
    }

    /// Values a variadic option must leave for unbound required positionals,
    /// less what the positional tokens after `end` can already supply
    fn reserved(&self, end: usize) -> usize {
        let frame = &self.frames[self.innermost()];
        let owed: usize = frame
            .registry
            .positionals()
            .iter()
            .skip(frame.next_positional)
            .filter(|s| s.is_required() && !frame.present.contains(s.key()))
            .map(|s| s.arity().min())
            .sum();
        let later = self.tokens[end..]
            .iter()
            .filter(|t| t.kind == TokenKind::Positional)
            .count();
        owed.saturating_sub(later)
    }

    fn origin<'v>(
        &self,
        target: &SpecRef<'r>,
        name: &str,
        index: usize,
        raw: impl Iterator<Item = &'v RawValue>,
    ) -> Origin {
        let mut tokens = vec![name.to_string()];
        tokens.extend(raw.map(|r| r.text.clone()));
        Origin {
            subject: target.subject(),
            tokens,
            offset: index,
        }
    }

    fn positional_origin(&self, target: &SpecRef<'r>, raw: &[RawValue]) -> Origin {
        let offset = raw
            .first()
            .map(|r| r.index)
            .or_else(|| self.tokens.get(self.cursor).map(|t| t.index))
            .unwrap_or(self.args.len());
        Origin {
            subject: target.subject(),
            tokens: raw.iter().map(|r| r.text.clone()).collect(),
            offset,
        }
    }

    fn scope(&self, frame: usize) -> TypeScope<'r> {
        TypeScope::new(self.frames[..=frame].iter().map(|f| f.registry.types()).collect())
    }

    /// Convert and validate raw values, then bind them
    fn bind_raw(
        &mut self,
        target: SpecRef<'r>,
        raw: Vec<RawValue>,
        origin: &Origin,
        continuing: bool,
    ) -> ControlFlow<()> {
        let spec = target.spec;
        let scope = self.scope(target.frame);

        let mut values = Vec::with_capacity(raw.len());
        let mut sources = Vec::with_capacity(raw.len());
        let mut failed = false;

        for item in &raw {
            let parts: Vec<&str> = match spec.delimiter() {
                Some(d) => item.text.split(d).collect(),
                None => vec![item.text.as_str()],
            };
            for part in parts {
                match scope.convert(spec.value_type(), part) {
                    Ok(value) => {
                        values.push(value);
                        sources.push(item);
                    }
                    Err(failure) => {
                        failed = true;
                        let error = ParseError::new(
                            ErrorKind::Conversion {
                                type_name: failure.type_name.clone(),
                            },
                            failure.to_string(),
                        )
                        .with_subject(origin.subject.clone())
                        .with_tokens(origin.tokens.clone())
                        .at(item.index);
                        self.reporter.report(error)?;
                    }
                }
            }
        }
        if failed {
            self.attempted(&target);
            return ControlFlow::Continue(());
        }

        if let Err(rejection) = validate_values(spec.validators(), &values) {
            let source = sources[rejection.index];
            let error = ParseError::new(ErrorKind::Validation, rejection.validator.message())
                .with_subject(origin.subject.clone())
                .with_tokens([source.text.clone()])
                .at(source.index);
            self.attempted(&target);
            return self.reporter.report(error);
        }

        self.bind_values(target, values, origin, continuing)
    }

    /// Count a rejected binding as given, so it is not also reported missing
    fn attempted(&mut self, target: &SpecRef<'r>) {
        self.frames[target.frame]
            .present
            .insert(target.spec.key().to_string());
    }

    fn bind_values(
        &mut self,
        target: SpecRef<'r>,
        values: Vec<Value>,
        origin: &Origin,
        continuing: bool,
    ) -> ControlFlow<()> {
        let spec = target.spec;
        let key = spec.key();
        let frame = &self.frames[target.frame];

        if !continuing && spec.repeat() == Repeat::Reject && frame.present.contains(key) {
            return self
                .reporter
                .report(origin.error(ErrorKind::Duplicate, "given more than once"));
        }

        if let Some(group) = spec.group() {
            let registry = frame.registry;
            let conflict = registry
                .options()
                .iter()
                .chain(registry.positionals())
                .find(|other| {
                    other.key() != key && other.group() == Some(group) && frame.present.contains(other.key())
                });
            if let Some(other) = conflict {
                let message = format!("cannot be used together with {}", other.display_name());
                return self
                    .reporter
                    .report(origin.error(ErrorKind::MutuallyExclusive, message));
            }
        }

        let frame = &mut self.frames[target.frame];
        frame.present.insert(key.to_string());
        let accumulate = continuing || spec.repeat() == Repeat::Append;

        if spec.is_multi() {
            let mut items = match frame.values.remove(key) {
                Some(Value::List(items)) if accumulate => items,
                _ => Vec::new(),
            };
            items.extend(values);
            frame.values.insert(key.to_string(), Value::List(items));
        } else if let Some(value) = values.into_iter().last() {
            frame.values.insert(key.to_string(), value);
        } else {
            // Given without a value: resolves to the default
            frame.values.remove(key);
        }

        tracing::trace!(key, value = ?frame.values.get(key), "bound");
        ControlFlow::Continue(())
    }

    fn check_required(&mut self) -> ControlFlow<()> {
        let innermost = self.innermost();
        let mut missing = Vec::new();

        for (depth, frame) in self.frames.iter().enumerate() {
            let registry = frame.registry;

            for spec in registry.options() {
                if spec.is_required() && !frame.present.contains(spec.key()) {
                    missing.push(
                        ParseError::new(ErrorKind::MissingRequired, "required argument was not provided")
                            .with_subject(spec.display_name()),
                    );
                }
            }

            for (k, spec) in registry.positionals().iter().enumerate() {
                if spec.is_required() && !frame.present.contains(spec.key()) {
                    missing.push(
                        ParseError::new(ErrorKind::MissingRequired, "required argument was not provided")
                            .with_subject(format!("positional #{} ({})", k + 1, spec.key())),
                    );
                }
            }

            if depth == innermost && registry.requires_subcommand() {
                let names: Vec<&str> = registry.subcommands().map(|(name, _)| name).collect();
                if !names.is_empty() {
                    let mut error = ParseError::new(
                        ErrorKind::MissingSubcommand,
                        format!("a subcommand is required, one of: {}", names.join(", ")),
                    );
                    if let Some(name) = frame.name {
                        error = error.with_subject(name);
                    }
                    missing.push(error);
                }
            }
        }

        for error in missing {
            self.reporter.report(error)?;
        }
        ControlFlow::Continue(())
    }

    /// Fold the frames, innermost first, into a nested result
    fn finish(self) -> ParsedResult {
        let mut inner: Option<Subcommand> = None;

        for frame in self.frames.into_iter().rev() {
            let result = ParsedResult {
                values: frame.values,
                defaults: frame.registry.defaults(),
                present: frame.present,
                operands: frame.operands,
                request: frame.request,
                subcommand: inner.take(),
            };
            match frame.name {
                Some(name) => {
                    inner = Some(Subcommand {
                        name: name.to_string(),
                        result: Box::new(result),
                    })
                }
                None => return result,
            }
        }

        // The root frame has no name, so the loop always returns
        ParsedResult::default()
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
