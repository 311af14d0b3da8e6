//! Help text
//!
//! Usage lines and help listings are derived from a sealed registry. Entries
//! are laid out in two columns: names, then help text word-wrapped to a fixed
//! width. Help and version requests found while parsing are answered by
//! [`respond`].

use crate::parse::{ParsedResult, Request};
use crate::spec::{Arity, ArgumentSpec, Registry, SpecKind, TypeTag};
use std::fmt::Write;

/// Column widths for help listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpLayout {
    /// Width of the name column, including indentation
    pub name_width: usize,
    /// Width the help text is wrapped to
    pub help_width: usize,
}

impl Default for HelpLayout {
    fn default() -> Self {
        HelpLayout {
            name_width: 20,
            help_width: 60,
        }
    }
}

/// One-line usage summary
pub fn usage(registry: &Registry, program: &str) -> String {
    let mut parts = vec![program.to_string()];

    if registry.options().iter().any(|s| !s.is_hidden()) {
        parts.push("[OPTIONS]".to_string());
    }
    for spec in registry.positionals().iter().filter(|s| !s.is_hidden()) {
        parts.push(positional_usage(spec));
    }
    if registry.subcommands().next().is_some() {
        parts.push(if registry.requires_subcommand() {
            "<COMMAND>".to_string()
        } else {
            "[COMMAND]".to_string()
        });
    }

    format!("Usage: {}", parts.join(" "))
}

/// Full help listing for a registry
pub fn render(registry: &Registry, program: &str, layout: HelpLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", usage(registry, program));

    if let Some(about) = registry.about() {
        out.push('\n');
        for line in wrap(about, layout.name_width + layout.help_width) {
            let _ = writeln!(out, "{}", line);
        }
    }

    let positionals: Vec<&ArgumentSpec> = registry.positionals().iter().filter(|s| !s.is_hidden()).collect();
    if !positionals.is_empty() {
        out.push_str("\nArguments:\n");
        for spec in positionals {
            entry(&mut out, &positional_usage(spec), &annotated_help(spec), layout);
        }
    }

    let options: Vec<&ArgumentSpec> = registry.options().iter().filter(|s| !s.is_hidden()).collect();
    if !options.is_empty() {
        out.push_str("\nOptions:\n");
        for spec in options {
            entry(&mut out, &option_label(spec), &annotated_help(spec), layout);
        }
    }

    let commands: Vec<(&str, &Registry)> = registry.subcommands().collect();
    if !commands.is_empty() {
        out.push_str("\nCommands:\n");
        for (name, sub) in commands {
            entry(&mut out, name, sub.about().unwrap_or_default(), layout);
        }
    }

    out
}

/// Detailed help for one argument, looked up by option name or positional name
///
/// Lists the related arguments declared with
/// [`ArgumentSpec::with_relevant`], split into required and optional ones.
pub fn describe_argument(registry: &Registry, name: &str) -> Option<String> {
    let spec = registry.argument(name)?;
    let layout = HelpLayout::default();

    let mut out = label(spec);
    out.push('\n');
    if let Some(help) = spec.long_help() {
        for line in wrap(help, layout.help_width) {
            let _ = writeln!(out, "    {}", line);
        }
    }

    for (heading, required) in [("Required arguments", true), ("Optional arguments", false)] {
        let related: Vec<&ArgumentSpec> = spec
            .relevant()
            .iter()
            .filter(|(_, r)| *r == required)
            .filter_map(|(name, _)| registry.argument(name))
            .collect();
        if related.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}:", heading);
        for other in related {
            entry(&mut out, &label(other), other.help().unwrap_or_default(), layout);
        }
    }

    Some(out)
}

/// Name, version and description lines
pub fn version(registry: &Registry, program: &str) -> String {
    let mut out = registry.name().unwrap_or(program).to_string();
    if let Some(version) = registry.version() {
        let _ = write!(out, " {}", version);
    }
    out.push('\n');
    if let Some(about) = registry.about() {
        let _ = writeln!(out, "{}", about);
    }
    out
}

/// Text answering the help or version request in `result`, if it holds one
///
/// Help is rendered for the subcommand the request was made in. A help topic
/// naming an argument of that subcommand gets the argument's detailed help;
/// any other topic gets the full listing.
pub fn respond(registry: &Registry, result: &ParsedResult, program: &str) -> Option<String> {
    let chain = result.subcommand_chain();
    let target = registry.find(&chain)?;

    let text = match result.request()? {
        Request::Version => version(registry, program),
        Request::Help { topic } => {
            let detail = topic.as_deref().and_then(|name| describe_argument(target, name));
            detail.unwrap_or_else(|| {
                let path = std::iter::once(registry.name().unwrap_or(program))
                    .chain(chain.iter().copied())
                    .collect::<Vec<_>>()
                    .join(" ");
                render(target, &path, HelpLayout::default())
            })
        }
    };
    Some(text)
}

fn label(spec: &ArgumentSpec) -> String {
    if spec.kind() == SpecKind::Positional {
        positional_usage(spec)
    } else {
        option_label(spec)
    }
}

fn positional_usage(spec: &ArgumentSpec) -> String {
    let name = spec.key();
    match spec.arity() {
        Arity::Fixed(n) if spec.is_required() => vec![format!("<{}>", name); n].join(" "),
        Arity::Fixed(n) => vec![format!("[{}]", name); n].join(" "),
        Arity::Optional => format!("[{}]", name),
        Arity::ZeroOrMore | Arity::Remainder => format!("[{}]...", name),
        Arity::OneOrMore => format!("<{}>...", name),
    }
}

fn option_label(spec: &ArgumentSpec) -> String {
    let shorts = spec.short_names().map(|c| format!("-{}", c));
    let longs = spec.long_names().cloned();
    let mut label = shorts.chain(longs).collect::<Vec<_>>().join(", ");

    let value = spec.value_name();
    match spec.arity() {
        Arity::Fixed(0) => {}
        Arity::Fixed(n) => {
            for _ in 0..n {
                let _ = write!(label, " <{}>", value);
            }
        }
        Arity::Optional => {
            let _ = write!(label, " [{}]", value);
        }
        Arity::ZeroOrMore | Arity::Remainder => {
            let _ = write!(label, " [{}]...", value);
        }
        Arity::OneOrMore => {
            let _ = write!(label, " <{}>...", value);
        }
    }

    label
}

/// Help text with default, choices and required annotations
fn annotated_help(spec: &ArgumentSpec) -> String {
    let mut help = spec.help().unwrap_or_default().to_string();
    let mut note = |text: String| {
        if !help.is_empty() {
            help.push(' ');
        }
        help.push_str(&text);
    };

    if let TypeTag::Choice(choices) = spec.value_type() {
        note(format!("[possible values: {}]", choices.join(", ")));
    }
    if let Some(default) = spec.default_raw() {
        note(format!("[default: {}]", default.join(", ")));
    }
    if spec.is_required() {
        note("[required]".to_string());
    }

    help
}

/// Write one two-column entry
fn entry(out: &mut String, label: &str, help: &str, layout: HelpLayout) {
    let mut name = format!("  {}", label);
    let lines = wrap(help, layout.help_width);

    if lines.is_empty() {
        let _ = writeln!(out, "{}", name.trim_end());
        return;
    }

    // Names too long for the column get a line of their own
    if name.len() + 1 >= layout.name_width {
        let _ = writeln!(out, "{}", name);
        name.clear();
    }

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            name.clear();
        }
        let _ = writeln!(out, "{:<width$}{}", name, line, width = layout.name_width);
    }
}

/// Greedy word wrap; words longer than `width` get a line of their own
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.set_about("Compile things").unwrap();
        registry
            .add_option(ArgumentSpec::flag(["--verbose", "-v"]).with_help("Print more"))
            .unwrap()
            .add_option(
                ArgumentSpec::option(["--profile"])
                    .with_choices(["debug", "release"])
                    .with_default("debug")
                    .with_help("Profile"),
            )
            .unwrap()
            .add_option(ArgumentSpec::flag(["--internal"]).hidden(true))
            .unwrap()
            .add_positional(ArgumentSpec::positional("input").required(true).with_help("Input file"))
            .unwrap()
            .add_positional(ArgumentSpec::positional("extra").with_arity(Arity::ZeroOrMore))
            .unwrap();
        registry
            .add_subcommand("clean")
            .unwrap()
            .set_about("Remove build output")
            .unwrap();
        registry.seal().unwrap();
        registry
    }

    #[test]
    fn test_usage_line() {
        assert_eq!(
            usage(&registry(), "make"),
            "Usage: make [OPTIONS] <input> [extra]... [COMMAND]"
        );
    }

    #[test]
    fn test_render_sections() {
        let help = render(&registry(), "make", HelpLayout::default());
        assert!(help.contains("Compile things"));
        assert!(help.contains("\nArguments:\n"));
        assert!(help.contains("  -v, --verbose     Print more\n"));
        assert!(help.contains("[possible values: debug, release] [default: debug]"));
        assert!(help.contains("Input file [required]"));
        assert!(help.contains("\nCommands:\n  clean             Remove build output\n"));
        assert!(!help.contains("--internal"));
    }

    #[test]
    fn test_long_names_get_their_own_line() {
        let mut out = String::new();
        entry(&mut out, "--a-really-long-option <VALUE>", "Help", HelpLayout::default());
        assert_eq!(out, "  --a-really-long-option <VALUE>\n                    Help\n");
    }

    #[test]
    fn test_wrap() {
        let lines = wrap("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_wrapped_help_is_indented() {
        let layout = HelpLayout {
            name_width: 10,
            help_width: 12,
        };
        let mut out = String::new();
        entry(&mut out, "-x", "alpha beta gamma delta", layout);
        assert_eq!(out, "  -x      alpha beta\n          gamma delta\n");
    }

    #[test]
    fn test_describe_argument() {
        let registry = registry();
        let text = describe_argument(&registry, "--profile").unwrap();
        assert!(text.starts_with("--profile <PROFILE>\n"));
        assert!(text.contains("    Profile"));

        assert!(describe_argument(&registry, "input").is_some());
        assert!(describe_argument(&registry, "--nope").is_none());
    }

    #[test]
    fn test_describe_argument_by_bare_name() {
        let registry = registry();
        assert!(describe_argument(&registry, "profile").unwrap().starts_with("--profile"));
        assert!(describe_argument(&registry, "v").unwrap().starts_with("-v, --verbose"));
    }

    #[test]
    fn test_describe_argument_lists_relevant() {
        let mut registry = Registry::new();
        registry
            .add_option(
                ArgumentSpec::option(["--out", "-o"])
                    .with_help("Output file")
                    .with_relevant("--mode", true)
                    .with_relevant("--force", false),
            )
            .unwrap()
            .add_option(ArgumentSpec::option(["--mode"]).with_help("Output mode"))
            .unwrap()
            .add_option(ArgumentSpec::flag(["--force"]).with_help("Overwrite"))
            .unwrap();
        registry.seal().unwrap();

        let text = describe_argument(&registry, "--out").unwrap();
        assert_eq!(
            text,
            "-o, --out <OUT>\n    Output file\n\nRequired arguments:\n  --mode <MODE>     Output mode\n\nOptional arguments:\n  --force           Overwrite\n"
        );
    }

    #[test]
    fn test_version_text() {
        let mut registry = Registry::new();
        registry
            .set_name("make")
            .unwrap()
            .set_version("2.1.0")
            .unwrap()
            .set_about("Compile things")
            .unwrap();
        registry.seal().unwrap();

        assert_eq!(version(&registry, "ignored"), "make 2.1.0\nCompile things\n");
        assert_eq!(version(&Registry::new(), "tool"), "tool\n");
    }

    #[test]
    fn test_respond_to_requests() {
        let registry = registry();

        let result = registry.parse(["--help"], crate::Mode::Strict).unwrap();
        let text = respond(&registry, &result, "make").unwrap();
        assert!(text.starts_with("Usage: make [OPTIONS]"));

        let result = registry.parse(["help", "--profile"], crate::Mode::Strict).unwrap();
        let text = respond(&registry, &result, "make").unwrap();
        assert!(text.starts_with("--profile <PROFILE>\n"));

        let result = registry.parse(["main.c", "clean", "--help"], crate::Mode::Strict).unwrap();
        let text = respond(&registry, &result, "make").unwrap();
        assert!(text.starts_with("Usage: make clean\n"));

        let result = registry.parse(["input.c"], crate::Mode::Strict).unwrap();
        assert!(respond(&registry, &result, "make").is_none());
    }
}
