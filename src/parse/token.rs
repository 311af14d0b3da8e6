//! Tokenizer
//!
//! Turns raw arguments into normalized tokens. The only knowledge of the
//! registry needed here is which short options take a value, which decides
//! how a short cluster such as `-vfout.txt` is split.

/// Kind of a normalized token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `--name` or `-n`
    OptionName,
    /// A value attached to the preceding option name (`--name=value`, `-nvalue`)
    OptionValue,
    /// Anything that is not an option
    Positional,
    /// The literal `--`
    Separator,
}

/// One normalized token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Index of the raw argument this token came from
    pub index: usize,
    /// Whether the token follows the `--` separator
    pub escaped: bool,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, index: usize, escaped: bool) -> Self {
        Token {
            kind,
            text: text.into(),
            index,
            escaped,
        }
    }

    /// Whether the token can serve as a value for a preceding option
    pub fn is_value_like(&self) -> bool {
        self.kind == TokenKind::Positional
    }
}

/// Lookup of short option characters
pub trait ShortOptions {
    /// `Some(true)` if `-c` takes a value, `Some(false)` if it is known and
    /// takes none, `None` if it is unknown
    fn takes_value(&self, c: char) -> Option<bool>;
}

/// No short options known
pub struct NoShortOptions;

impl ShortOptions for NoShortOptions {
    fn takes_value(&self, _: char) -> Option<bool> {
        None
    }
}

/// Tokenize a full argument list
pub fn tokenize<S: AsRef<str>>(args: &[S], shorts: &dyn ShortOptions) -> Vec<Token> {
    tokenize_from(args, 0, shorts)
}

/// Tokenize the arguments starting at raw index `start`
///
/// Indices in the returned tokens are relative to the full list, so the
/// engine can re-tokenize the tail after entering a subcommand.
pub fn tokenize_from<S: AsRef<str>>(
    args: &[S],
    start: usize,
    shorts: &dyn ShortOptions,
) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(args.len().saturating_sub(start));
    let mut escaped = false;

    for (index, arg) in args.iter().enumerate().skip(start) {
        let arg = arg.as_ref();

        if escaped {
            tokens.push(Token::new(TokenKind::Positional, arg, index, true));
            continue;
        }

        if arg == "--" {
            tokens.push(Token::new(TokenKind::Separator, arg, index, false));
            escaped = true;
            continue;
        }

        if let Some(long) = arg.strip_prefix("--") {
            match long.split_once('=') {
                Some((name, value)) if !name.is_empty() => {
                    tokens.push(Token::new(TokenKind::OptionName, format!("--{}", name), index, false));
                    tokens.push(Token::new(TokenKind::OptionValue, value, index, false));
                }
                _ => tokens.push(Token::new(TokenKind::OptionName, arg, index, false)),
            }
            continue;
        }

        match arg.strip_prefix('-') {
            Some(cluster) if !cluster.is_empty() && !is_negative_number(cluster, shorts) => {
                split_cluster(cluster, index, shorts, &mut tokens);
            }
            _ => tokens.push(Token::new(TokenKind::Positional, arg, index, false)),
        }
    }

    tokens
}

/// `-5` or `-0.5` is a value, unless `-5` is itself a declared short option
fn is_negative_number(body: &str, shorts: &dyn ShortOptions) -> bool {
    let starts_with_digit = body.chars().next().map_or(false, |c| c.is_ascii_digit() || c == '.');
    if !starts_with_digit || body.parse::<f64>().is_err() {
        return false;
    }
    body.chars()
        .next()
        .map_or(true, |c| shorts.takes_value(c).is_none())
}

fn split_cluster(cluster: &str, index: usize, shorts: &dyn ShortOptions, tokens: &mut Vec<Token>) {
    for (offset, c) in cluster.char_indices() {
        tokens.push(Token::new(TokenKind::OptionName, format!("-{}", c), index, false));

        let rest = &cluster[offset + c.len_utf8()..];
        if rest.is_empty() {
            break;
        }
        if let Some(value) = rest.strip_prefix('=') {
            tokens.push(Token::new(TokenKind::OptionValue, value, index, false));
            break;
        }
        if shorts.takes_value(c) == Some(true) {
            tokens.push(Token::new(TokenKind::OptionValue, rest, index, false));
            break;
        }
    }
}
