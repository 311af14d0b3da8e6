//! Integration tests for parsing

mod common;

use argot::parse::{Category, Validator};
use argot::spec::Repeat;
use argot::{Arity, ArgumentSpec, ErrorKind, Mode, Registry, Request, TypeTag, Value};
use common::args;
use std::thread;

fn input_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::flag(["--verbose", "-v"]))
        .unwrap()
        .add_option(ArgumentSpec::option(["--jobs", "-j"]).with_type(TypeTag::Integer))
        .unwrap()
        .add_positional(ArgumentSpec::positional("input").required(true))
        .unwrap();
    registry.seal().unwrap();
    registry
}

fn build_registry() -> Registry {
    common::registry(
        r#"
options:
  - names: [--jobs, -j]
    type: int
    default: 1
  - names: --debug
    type: bool
    global: true
subcommands:
  - name: build
    options:
      - names: [--out, -o]
    positionals:
      - name: target
        required: true
  - name: clean
"#,
    )
}

#[test]
fn test_flag_and_positional() {
    let result = input_registry()
        .parse(["--verbose", "file.txt"], Mode::Strict)
        .unwrap();
    assert_eq!(result.get::<bool>("verbose"), Some(true));
    assert_eq!(result.get::<String>("input"), Some("file.txt".to_string()));
    assert!(result.subcommand().is_none());
}

#[test]
fn test_missing_required_positional() {
    let no_args: [&str; 0] = [];
    let report = input_registry().parse(no_args, Mode::Strict).unwrap_err();
    assert_eq!(report.len(), 1);

    let error = report.first().unwrap();
    assert_eq!(error.kind, ErrorKind::MissingRequired);
    assert_eq!(error.subject.as_deref(), Some("positional #1 (input)"));
}

#[test]
fn test_subcommand_result() {
    let result = build_registry()
        .parse(["--jobs", "4", "build", "app"], Mode::Strict)
        .unwrap();
    assert_eq!(result.get::<i64>("jobs"), Some(4));

    let (name, build) = result.subcommand().unwrap();
    assert_eq!(name, "build");
    assert_eq!(build.get::<String>("target"), Some("app".to_string()));
    assert_eq!(build.get::<String>("out"), None);
}

#[test]
fn test_defaults_without_input() {
    let result = build_registry().parse(["clean"], Mode::Strict).unwrap();
    assert_eq!(result.get::<i64>("jobs"), Some(1));
    assert_eq!(result.get::<bool>("debug"), Some(false));
    assert!(!result.is_present("jobs"));
    assert_eq!(result.subcommand_chain(), vec!["clean"]);
}

#[test]
fn test_separator_demotes_options() {
    let result = input_registry()
        .parse(["--", "--verbose"], Mode::Strict)
        .unwrap();
    assert_eq!(result.get::<String>("input"), Some("--verbose".to_string()));
    assert_eq!(result.get::<bool>("verbose"), Some(false));
}

#[test]
fn test_escaped_subcommand_name_is_positional() {
    let mut registry = Registry::new();
    registry.set_collect_operands(true).unwrap();
    registry.add_subcommand("build").unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["--", "build"], Mode::Strict).unwrap();
    assert!(result.subcommand().is_none());
    assert_eq!(result.operands(), ["build".to_string()]);
}

#[test]
fn test_global_option_inside_subcommand() {
    let result = build_registry()
        .parse(["build", "--debug", "app"], Mode::Strict)
        .unwrap();
    assert_eq!(result.get::<bool>("debug"), Some(true));
    assert_eq!(result.leaf().get::<String>("target"), Some("app".to_string()));
}

#[test]
fn test_parent_option_not_visible_in_subcommand() {
    let report = build_registry()
        .parse(["build", "--jobs", "2", "app"], Mode::Strict)
        .unwrap_err();
    let error = report.first().unwrap();
    assert_eq!(error.kind, ErrorKind::UnknownOption);
    assert_eq!(error.subject.as_deref(), Some("--jobs"));
}

#[test]
fn test_subcommand_short_options_split_clusters() {
    let result = build_registry()
        .parse(["build", "-obin/app", "app"], Mode::Strict)
        .unwrap();
    let (_, build) = result.subcommand().unwrap();
    assert_eq!(build.get::<String>("out"), Some("bin/app".to_string()));
}

#[test]
fn test_subcommand_after_root_positional() {
    let registry = common::registry(
        r#"
positionals:
  - name: env
    required: true
subcommands:
  - name: build
    positionals:
      - name: target
        required: true
"#,
    );

    let result = registry.parse(["prod", "build", "app"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("env"), Some("prod".to_string()));
    assert_eq!(result.subcommand_chain(), vec!["build"]);
    assert_eq!(result.leaf().get::<String>("target"), Some("app".to_string()));

    // The first token fills the required positional, even when it names a subcommand
    let result = registry.parse(["build", "build", "app"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("env"), Some("build".to_string()));
    assert_eq!(result.leaf().get::<String>("target"), Some("app".to_string()));
}

#[test]
fn test_collecting_positional_keeps_subcommand_names() {
    let registry = common::registry(
        r#"
positionals:
  - name: files
    arity: "*"
subcommands:
  - name: build
"#,
    );

    let result = registry.parse(["a", "build"], Mode::Strict).unwrap();
    assert!(result.subcommand().is_none());
    assert_eq!(result.get::<Vec<String>>("files"), Some(args(&["a", "build"])));

    let result = registry.parse(["build"], Mode::Strict).unwrap();
    assert_eq!(result.subcommand_chain(), vec!["build"]);
}

#[test]
fn test_optional_option_before_subcommand() {
    let registry = common::registry(
        r#"
options:
  - names: --color
    arity: "?"
    implicit: always
    default: auto
subcommands:
  - name: build
    positionals:
      - name: target
        required: true
"#,
    );

    let result = registry.parse(["--color", "build", "app"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("color"), Some("always".to_string()));
    assert_eq!(result.leaf().get::<String>("target"), Some("app".to_string()));

    let result = registry.parse(["--color=build", "build", "app"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("color"), Some("build".to_string()));
}

#[test]
fn test_missing_subcommand() {
    let mut registry = Registry::new();
    registry.set_subcommand_required(true).unwrap();
    registry.add_subcommand("build").unwrap();
    registry.add_subcommand("clean").unwrap();
    registry.seal().unwrap();

    let no_args: [&str; 0] = [];
    let report = registry.parse(no_args, Mode::Strict).unwrap_err();
    assert_eq!(report.first().unwrap().kind, ErrorKind::MissingSubcommand);
    assert!(report.to_string().contains("build, clean"));
}

fn output_registry(abbreviations: bool) -> Registry {
    let mut registry = Registry::new();
    registry
        .set_abbreviations(abbreviations)
        .unwrap()
        .add_option(ArgumentSpec::option(["--out"]))
        .unwrap()
        .add_option(ArgumentSpec::option(["--output"]))
        .unwrap()
        .add_option(ArgumentSpec::flag(["--verbose"]))
        .unwrap();
    registry.seal().unwrap();
    registry
}

#[test]
fn test_ambiguous_abbreviation() {
    let report = output_registry(true)
        .parse(["--ou", "x"], Mode::Strict)
        .unwrap_err();
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.first().unwrap().kind,
        ErrorKind::Ambiguous(vec!["--out".to_string(), "--output".to_string()])
    );
}

#[test]
fn test_exact_name_beats_abbreviation() {
    let registry = output_registry(true);
    let result = registry.parse(["--out", "x"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("out"), Some("x".to_string()));
    assert_eq!(result.get::<String>("output"), None);

    let result = registry.parse(["--outp", "y", "--verb"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("output"), Some("y".to_string()));
    assert_eq!(result.get::<bool>("verbose"), Some(true));
}

#[test]
fn test_abbreviations_disabled() {
    let report = output_registry(false)
        .parse(["--verb"], Mode::Strict)
        .unwrap_err();
    assert_eq!(report.first().unwrap().kind, ErrorKind::UnknownOption);
}

#[test]
fn test_attached_values() {
    let registry = output_registry(true);
    let result = registry.parse(["--out=a=b"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("out"), Some("a=b".to_string()));

    let result = registry.parse(["--out="], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("out"), Some(String::new()));
}

#[test]
fn test_short_cluster() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::flag(["-a"]))
        .unwrap()
        .add_option(ArgumentSpec::flag(["-b"]))
        .unwrap()
        .add_option(ArgumentSpec::option(["--output", "-o"]))
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["-abofile.txt"], Mode::Strict).unwrap();
    assert_eq!(result.get::<bool>("a"), Some(true));
    assert_eq!(result.get::<bool>("b"), Some(true));
    assert_eq!(result.get::<String>("output"), Some("file.txt".to_string()));

    let result = registry.parse(["-ba", "-o", "x"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("output"), Some("x".to_string()));
}

#[test]
fn test_negative_number_is_a_value() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::option(["--offset"]).with_type(TypeTag::Integer))
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["--offset", "-5"], Mode::Strict).unwrap();
    assert_eq!(result.get::<i64>("offset"), Some(-5));
}

#[test]
fn test_one_or_more_needs_a_value() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::option(["--files"]).with_arity(Arity::OneOrMore))
        .unwrap()
        .add_option(ArgumentSpec::flag(["--verbose"]))
        .unwrap();
    registry.seal().unwrap();

    let report = registry.parse(["--files"], Mode::Strict).unwrap_err();
    assert_eq!(report.first().unwrap().kind, ErrorKind::WrongArity);

    let report = registry.parse(["--files", "--verbose"], Mode::Strict).unwrap_err();
    assert_eq!(report.first().unwrap().kind, ErrorKind::WrongArity);

    let result = registry.parse(["--files", "a", "b"], Mode::Strict).unwrap();
    assert_eq!(
        result.get::<Vec<String>>("files"),
        Some(vec!["a".to_string(), "b".to_string()])
    );
}

#[test]
fn test_optional_value_uses_implicit_and_default() {
    let mut registry = Registry::new();
    registry
        .add_option(
            ArgumentSpec::option(["--color"])
                .with_arity(Arity::Optional)
                .with_default("auto")
                .with_implicit("always"),
        )
        .unwrap();
    registry.seal().unwrap();

    let no_args: [&str; 0] = [];
    let cases: [(&[&str], &str); 3] = [
        (&no_args, "auto"),
        (&["--color"], "always"),
        (&["--color", "never"], "never"),
    ];
    for (input, expected) in cases {
        let result = registry.parse(input, Mode::Strict).unwrap();
        assert_eq!(result.get::<String>("color"), Some(expected.to_string()), "{:?}", input);
    }
}

#[test]
fn test_variadic_positional_stays_open() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::flag(["-v"]))
        .unwrap()
        .add_positional(ArgumentSpec::positional("files").with_arity(Arity::OneOrMore).required(true))
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["a", "-v", "b"], Mode::Strict).unwrap();
    assert_eq!(
        result.get::<Vec<String>>("files"),
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(result.get::<bool>("v"), Some(true));
}

#[test]
fn test_remainder_takes_everything() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::flag(["-v"]))
        .unwrap()
        .add_positional(ArgumentSpec::positional("command").with_arity(Arity::Remainder))
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["-v", "ls", "-la", "--", "x"], Mode::Strict).unwrap();
    assert_eq!(result.get::<bool>("v"), Some(true));
    assert_eq!(
        result.get::<Vec<String>>("command"),
        Some(args(&["ls", "-la", "--", "x"]))
    );
}

#[test]
fn test_remainder_after_fixed_positional() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::flag(["--dry-run", "-n"]))
        .unwrap()
        .add_positional(ArgumentSpec::positional("program").required(true))
        .unwrap()
        .add_positional(ArgumentSpec::positional("args").with_arity(Arity::Remainder))
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["ls", "-la"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("program"), Some("ls".to_string()));
    assert_eq!(result.get::<Vec<String>>("args"), Some(args(&["-la"])));

    // Options before the program still belong to the registry
    let result = registry
        .parse(["-n", "git", "log", "--oneline", "-n", "3"], Mode::Strict)
        .unwrap();
    assert_eq!(result.get::<bool>("dry-run"), Some(true));
    assert_eq!(
        result.get::<Vec<String>>("args"),
        Some(args(&["log", "--oneline", "-n", "3"]))
    );

    let result = registry.parse(["ls"], Mode::Strict).unwrap();
    assert!(!result.is_present("args"));
}

#[test]
fn test_repeat_policies() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::option(["--include", "-I"]).with_repeat(Repeat::Append))
        .unwrap()
        .add_option(ArgumentSpec::option(["--name"]).with_repeat(Repeat::Reject))
        .unwrap()
        .add_option(ArgumentSpec::option(["--level"]))
        .unwrap();
    registry.seal().unwrap();

    let result = registry
        .parse(["-I", "a", "--include=b", "--level", "1", "--level", "2"], Mode::Strict)
        .unwrap();
    assert_eq!(result.get::<Vec<String>>("include"), Some(args(&["a", "b"])));
    assert_eq!(result.get::<String>("level"), Some("2".to_string()));

    let report = registry
        .parse(["--name", "a", "--name", "b"], Mode::Strict)
        .unwrap_err();
    let error = report.first().unwrap();
    assert_eq!(error.kind, ErrorKind::Duplicate);
    assert_eq!(error.offset, Some(2));
}

#[test]
fn test_mutually_exclusive_group() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::flag(["--json"]).with_group("format"))
        .unwrap()
        .add_option(ArgumentSpec::flag(["--yaml"]).with_group("format"))
        .unwrap();
    registry.seal().unwrap();

    assert!(registry.parse(["--json"], Mode::Strict).is_ok());

    let report = registry.parse(["--json", "--yaml"], Mode::Strict).unwrap_err();
    let error = report.first().unwrap();
    assert_eq!(error.kind, ErrorKind::MutuallyExclusive);
    assert_eq!(error.subject.as_deref(), Some("--yaml"));
}

#[test]
fn test_conversion_error() {
    let report = input_registry()
        .parse(["--jobs", "many", "in"], Mode::Strict)
        .unwrap_err();
    let error = report.first().unwrap();
    assert_eq!(
        error.kind,
        ErrorKind::Conversion {
            type_name: "integer".to_string()
        }
    );
    assert_eq!(error.category(), Category::Conversion);
    assert_eq!(error.subject.as_deref(), Some("--jobs"));
    assert!(error.message.contains("many"));
}

#[test]
fn test_choices() {
    let mut registry = Registry::new();
    registry
        .add_option(ArgumentSpec::option(["--profile"]).with_choices(["debug", "release"]))
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["--profile", "release"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("profile"), Some("release".to_string()));

    let report = registry.parse(["--profile", "fast"], Mode::Strict).unwrap_err();
    assert_eq!(report.first().unwrap().category(), Category::Conversion);
    assert!(report.to_string().contains("debug, release"));
}

#[test]
fn test_delimited_values() {
    let mut registry = Registry::new();
    registry
        .add_option(
            ArgumentSpec::option(["--ports"])
                .with_type(TypeTag::Integer)
                .with_delimiter(','),
        )
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["--ports", "80,443"], Mode::Strict).unwrap();
    assert_eq!(result.get::<Vec<u16>>("ports"), Some(vec![80, 443]));
}

#[test]
fn test_validation_error() {
    let mut registry = Registry::new();
    registry
        .add_option(
            ArgumentSpec::option(["--jobs"])
                .with_type(TypeTag::Integer)
                .with_validator(Validator::range(1.0, 8.0).with_message("jobs must be between 1 and 8")),
        )
        .unwrap();
    registry.seal().unwrap();

    assert!(registry.parse(["--jobs", "8"], Mode::Strict).is_ok());

    let report = registry.parse(["--jobs", "9"], Mode::Strict).unwrap_err();
    let error = report.first().unwrap();
    assert_eq!(error.kind, ErrorKind::Validation);
    assert_eq!(error.message, "jobs must be between 1 and 8");
    assert_eq!(error.tokens, vec!["9"]);
}

#[test]
fn test_custom_type() {
    let mut registry = Registry::new();
    registry
        .register_type("port", |raw| {
            raw.parse::<u16>()
                .map(|p| Value::Int(i64::from(p)))
                .map_err(|e| e.to_string())
        })
        .unwrap()
        .add_option(ArgumentSpec::option(["--port"]).with_type(TypeTag::Custom("port".to_string())))
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["--port", "8080"], Mode::Strict).unwrap();
    assert_eq!(result.get::<u16>("port"), Some(8080));

    let report = registry.parse(["--port", "99999"], Mode::Strict).unwrap_err();
    assert_eq!(
        report.first().unwrap().kind,
        ErrorKind::Conversion {
            type_name: "port".to_string()
        }
    );
}

#[test]
fn test_collect_mode_reports_everything() {
    let registry = input_registry();
    let input = ["--jobs", "x", "--nope"];

    let report = registry.parse(input, Mode::Collect).unwrap_err();
    let kinds: Vec<&ErrorKind> = report.iter().map(|e| &e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            &ErrorKind::Conversion {
                type_name: "integer".to_string()
            },
            &ErrorKind::UnknownOption,
            &ErrorKind::MissingRequired,
        ]
    );
    assert_eq!(report.mode(), Mode::Collect);

    let report = registry.parse(input, Mode::Strict).unwrap_err();
    assert_eq!(report.len(), 1);
}

#[test]
fn test_unexpected_token_offset() {
    let report = input_registry()
        .parse(["-v", "a", "b"], Mode::Strict)
        .unwrap_err();
    let error = report.first().unwrap();
    assert_eq!(error.kind, ErrorKind::UnexpectedToken);
    assert_eq!(error.offset, Some(2));
    assert_eq!(error.to_string(), "unexpected argument (while parsing \"b\" at argument 3)");
}

#[test]
fn test_unsealed_registry_is_rejected() {
    let mut registry = Registry::new();
    registry.add_option(ArgumentSpec::flag(["--verbose"])).unwrap();

    let report = registry.parse(["--verbose"], Mode::Strict).unwrap_err();
    assert_eq!(report.first().unwrap().kind, ErrorKind::Unsealed);
}

#[test]
fn test_parsing_is_repeatable() {
    let registry = build_registry();
    let input = args(&["-j", "3", "build", "-o", "out", "app"]);

    let first = registry.parse(&input, Mode::Strict).unwrap();
    let second = registry.parse(&input, Mode::Strict).unwrap();
    assert_eq!(first, second);

    let bad = args(&["build", "--nope"]);
    let first = registry.parse(&bad, Mode::Collect).unwrap_err();
    let second = registry.parse(&bad, Mode::Collect).unwrap_err();
    assert_eq!(first.errors(), second.errors());
}

#[test]
fn test_shared_registry_across_threads() {
    let registry = build_registry();

    thread::scope(|scope| {
        for jobs in 1..=4i64 {
            let registry = &registry;
            scope.spawn(move || {
                let input = args(&["--jobs", &jobs.to_string(), "build", "app"]);
                let result = registry.parse(&input, Mode::Strict).unwrap();
                assert_eq!(result.get::<i64>("jobs"), Some(jobs));
            });
        }
    });
}

#[test]
fn test_free_parse_function() {
    let registry = input_registry();
    let result = argot::parse(&registry, &["in"], Mode::Strict).unwrap();
    assert_eq!(result.get::<String>("input"), Some("in".to_string()));
}

#[test]
fn test_help_and_version_requests() {
    let registry = common::registry(
        r#"
program: tool
version: 1.0.0
positionals:
  - name: input
    required: true
subcommands:
  - name: build
    options:
      - names: [--version, -V]
"#,
    );

    let result = registry.parse(["--help"], Mode::Strict).unwrap();
    assert_eq!(result.request(), Some(&Request::Help { topic: None }));

    let result = registry.parse(["help", "input"], Mode::Strict).unwrap();
    assert_eq!(
        result.request(),
        Some(&Request::Help {
            topic: Some("input".to_string())
        })
    );

    let result = registry.parse(["-v"], Mode::Strict).unwrap();
    assert_eq!(result.request(), Some(&Request::Version));

    // Only the first argument of a registry is a request
    let result = registry.parse(["x", "build", "-h"], Mode::Strict).unwrap();
    assert_eq!(result.request(), Some(&Request::Help { topic: None }));
    let report = registry.parse(["x", "--help"], Mode::Strict).unwrap_err();
    assert_eq!(report.first().unwrap().kind, ErrorKind::UnknownOption);

    // A declared name is parsed as declared
    let result = registry
        .parse(["x", "build", "--version", "2"], Mode::Strict)
        .unwrap();
    assert_eq!(result.request(), None);
    assert_eq!(result.leaf().get::<String>("version"), Some("2".to_string()));
}

#[test]
fn test_requests_can_be_disabled() {
    let mut registry = Registry::new();
    registry
        .set_help_requests(false)
        .unwrap()
        .add_positional(ArgumentSpec::positional("topic"))
        .unwrap();
    registry.seal().unwrap();

    let result = registry.parse(["help"], Mode::Strict).unwrap();
    assert_eq!(result.request(), None);
    assert_eq!(result.get::<String>("topic"), Some("help".to_string()));
}
