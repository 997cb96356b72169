//! weaver CLI - Command-line interface
//!
//! Commands:
//!   apply    - Run declarative aspects over a compilation
//!   schema   - Print JSON schema for an input document
//!   version  - Print version

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use weaver::config::LoggingConfig;
use weaver::model::CompilationDocument;
use weaver::*;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "apply" => cmd_apply(&args[2..]),
        "schema" => cmd_schema(&args[2..]),
        "version" | "--version" | "-v" => {
            println!("weaver {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
weaver - Advice execution engine

USAGE:
    weaver <COMMAND> [OPTIONS]

COMMANDS:
    apply <compilation.yaml> <aspects.yaml>   Run aspects and print transformations
    schema [name]                             Print JSON schema for an input document
    version                                   Print version

OPTIONS:
    --json                 JSON output format (apply)
    --config <weaver.yaml> Configuration file (default: ./weaver.yaml when present)

ENVIRONMENT:
    WEAVER_LOG             Log filter, e.g. weaver=debug (overrides logging.level)

EXAMPLES:
    weaver apply model.yaml aspects.yaml
    weaver apply model.yaml aspects.yaml --json > result.json
    weaver schema aspects
"#
    );
}

/// What `apply --json` prints
#[derive(Serialize)]
struct ApplyReport<'a> {
    revision: u32,
    hash: String,
    transformations: &'a [Transformation],
    diagnostics: &'a [Diagnostic],
    skipped: &'a [SkippedAspect],
}

fn cmd_apply(args: &[String]) -> Result<()> {
    if args.len() < 2 {
        return Err("Usage: weaver apply <compilation.yaml> <aspects.yaml> [--json] [--config <weaver.yaml>]".into());
    }

    let compilation_path = PathBuf::from(&args[0]);
    let aspects_path = PathBuf::from(&args[1]);
    let json_output = args.contains(&"--json".to_string());
    let config = load_config(parse_config_arg(args).as_deref())?;
    init_logging(&config.logging);

    let compilation = Compilation::load(&compilation_path)?;
    let aspects = AspectsDocument::load(&aspects_path)?;
    let result = aspects.into_pipeline(config).execute(compilation)?;

    if json_output {
        let report = ApplyReport {
            revision: result.compilation.revision(),
            hash: result.compilation.hash()?,
            transformations: &result.transformations,
            diagnostics: &result.diagnostics,
            skipped: &result.skipped,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for transformation in &result.transformations {
            println!("{}", transformation);
        }
        for diagnostic in &result.diagnostics {
            println!("{}", diagnostic);
        }
        for skipped in &result.skipped {
            println!(
                "skipped: aspect {} (instance {}) in step {}",
                skipped.aspect, skipped.instance, skipped.step
            );
        }
        println!(
            "\n{} transformation(s), {} diagnostic(s), revision {}",
            result.transformations.len(),
            result.diagnostics.len(),
            result.compilation.revision()
        );
    }

    if result.has_errors() {
        Err("Weaving reported errors".into())
    } else {
        Ok(())
    }
}

fn cmd_schema(args: &[String]) -> Result<()> {
    let schema_name = args.first().map(|s| s.as_str()).unwrap_or("list");

    match schema_name {
        "list" => {
            println!("Available schemas: config, compilation, aspects");
            Ok(())
        }
        "config" => print_schema::<WeaverConfig>(),
        "compilation" => print_schema::<CompilationDocument>(),
        "aspects" => print_schema::<AspectsDocument>(),
        _ => Err(format!("Unknown schema: {}", schema_name).into()),
    }
}

fn print_schema<T: schemars::JsonSchema>() -> Result<()> {
    let schema = schemars::schema_for!(T);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn parse_config_arg(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

fn load_config(path: Option<&Path>) -> Result<WeaverConfig> {
    match path {
        Some(path) => WeaverConfig::load(path),
        None => {
            let cwd = std::env::current_dir()?;
            Ok(WeaverConfig::load_from_dir(&cwd)?.unwrap_or_default())
        }
    }
}

/// Logs go to stderr so `--json` output stays parseable
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_env("WEAVER_LOG").unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = installed {
        eprintln!("Warning: could not install logger: {}", e);
    }
}
