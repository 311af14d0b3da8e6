//! Main CLI application

use crate::help::{self, HelpLayout};
use crate::parse::{Mode, ParsedResult};
use crate::spec::{sealed_from_yaml, Registry};
use anyhow::{anyhow, Context as _, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Print nothing
    Silent,
    /// Print results and errors only
    Quiet,
    /// Print results, errors and warnings
    Normal,
    /// Also print debug logging
    Verbose,
}

impl Verbosity {
    fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Silent => LevelFilter::OFF,
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::WARN,
            Verbosity::Verbose => LevelFilter::DEBUG,
        }
    }
}

/// How `parse` prints a successful result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Yaml,
}

/// CLI application
pub struct App {
    /// Sealed registry loaded from the definition file
    registry: Registry,
    /// Program name used in help output
    program: String,
}

impl App {
    /// Load and seal a registry definition file
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read definition file {}", path.display()))?;
        let registry = sealed_from_yaml(&yaml)
            .with_context(|| format!("Invalid definition in {}", path.display()))?;

        let program = match registry.name() {
            Some(name) => name.to_string(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "argot".to_string()),
        };

        Ok(App { registry, program })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parse `args` and render the outcome
    ///
    /// Returns the text to print and whether the parse succeeded. A help or
    /// version request is answered with help or version text.
    pub fn parse(&self, args: &[String], mode: Mode, format: OutputFormat) -> Result<(String, bool)> {
        match self.registry.parse(args, mode) {
            Ok(result) => {
                if let Some(text) = help::respond(&self.registry, &result, &self.program) {
                    return Ok((text, true));
                }
                let text = match format {
                    OutputFormat::Text => render_text(&result),
                    OutputFormat::Yaml => serde_yaml::to_string(&result)?,
                };
                Ok((text, true))
            }
            Err(report) => Ok((report.render_colored(), false)),
        }
    }

    /// Help for the registry at `path`, or for one of its arguments
    pub fn describe(&self, path: &[String], argument: Option<&str>) -> Result<String> {
        let registry = self
            .registry
            .find(path)
            .ok_or_else(|| anyhow!("Unknown subcommand '{}'", path.join(" ")))?;

        match argument {
            Some(name) => help::describe_argument(registry, name)
                .ok_or_else(|| anyhow!("Unknown argument '{}'", name)),
            None => {
                let program = std::iter::once(self.program.as_str())
                    .chain(path.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(help::render(registry, &program, HelpLayout::default()))
            }
        }
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    let file = Arg::new("file")
        .short('f')
        .long("file")
        .value_name("FILE")
        .help("Path to a YAML registry definition")
        .value_parser(value_parser!(PathBuf))
        .required(true);

    Command::new("argot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse arguments against a declarative registry definition")
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print results and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse arguments given after --")
                .arg(file.clone())
                .arg(
                    Arg::new("collect")
                        .long("collect")
                        .help("Report every error instead of stopping at the first")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format for the parsed result")
                        .value_parser(["text", "yaml"])
                        .default_value("text"),
                )
                .arg(
                    Arg::new("args")
                        .value_name("ARGS")
                        .help("Arguments to parse")
                        .num_args(0..)
                        .allow_hyphen_values(true)
                        .last(true),
                ),
        )
        .subcommand(
            Command::new("describe")
                .about("Print help generated from a definition")
                .arg(file)
                .arg(
                    Arg::new("argument")
                        .long("argument")
                        .value_name("NAME")
                        .help("Describe one argument instead of the whole command")
                        .allow_hyphen_values(true),
                )
                .arg(
                    Arg::new("path")
                        .value_name("SUBCOMMAND")
                        .help("Subcommand path to describe")
                        .num_args(0..),
                ),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

fn init_logging(verbosity: Verbosity) {
    // A subscriber may already be installed when running inside tests
    let _ = tracing_subscriber::fmt()
        .with_max_level(verbosity.level_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn file_arg(matches: &ArgMatches) -> Result<&PathBuf> {
    matches
        .get_one::<PathBuf>("file")
        .ok_or_else(|| anyhow!("--file is required"))
}

fn run_parse(matches: &ArgMatches, verbosity: Verbosity) -> Result<i32> {
    let app = App::from_file(file_arg(matches)?)?;

    let mode = if matches.get_flag("collect") {
        Mode::Collect
    } else {
        Mode::Strict
    };
    let format = match matches.get_one::<String>("format").map(String::as_str) {
        Some("yaml") => OutputFormat::Yaml,
        _ => OutputFormat::Text,
    };

    let (text, ok) = app.parse(&strings(matches, "args"), mode, format)?;
    if verbosity > Verbosity::Silent {
        if ok {
            print!("{}", text);
        } else {
            eprintln!("{}", text);
        }
    }

    Ok(if ok { 0 } else { 1 })
}

fn run_describe(matches: &ArgMatches, verbosity: Verbosity) -> Result<i32> {
    let app = App::from_file(file_arg(matches)?)?;
    let argument = matches.get_one::<String>("argument").map(String::as_str);

    let text = app.describe(&strings(matches, "path"), argument)?;
    if verbosity > Verbosity::Silent {
        print!("{}", text);
    }

    Ok(0)
}

/// Run the CLI application with the process arguments
///
/// Returns the exit code: 0 on success, 1 when the arguments do not match the
/// definition. Definition and I/O problems are returned as errors.
pub fn run() -> Result<i32> {
    run_from(std::env::args_os())
}

/// Run the CLI application with explicit arguments, program name first
pub fn run_from<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = build_command();
    let matches = command.clone().get_matches_from(args);

    let verbosity = get_verbosity(&matches);
    init_logging(verbosity);

    match matches.subcommand() {
        Some(("parse", sub)) => run_parse(sub, verbosity),
        Some(("describe", sub)) => run_describe(sub, verbosity),
        _ => {
            command.print_help()?;
            println!();
            Ok(0)
        }
    }
}

/// Render a result as `key = value` lines, nesting subcommands
pub fn render_text(result: &ParsedResult) -> String {
    let mut out = String::new();
    write_text(&mut out, result, 0);
    out
}

fn write_text(out: &mut String, result: &ParsedResult, depth: usize) {
    let indent = "  ".repeat(depth);

    for (key, value) in result.resolved() {
        let _ = writeln!(out, "{}{} = {}", indent, key, value);
    }
    if !result.operands().is_empty() {
        let _ = writeln!(out, "{}operands = {}", indent, result.operands().join(" "));
    }
    if let Some((name, sub)) = result.subcommand() {
        let _ = writeln!(out, "{}[{}]", indent, name);
        write_text(out, sub, depth + 1);
    }
}
