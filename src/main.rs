// ==============================================================================
// CLI for protocue
// ==============================================================================
//
// Two subcommands:
//   - `protocue add <NAME> [OPTIONS]`  -- generate schemas, then write tests/<name>.cue
//   - `protocue generate [OPTIONS]`    -- generate schemas only

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use protocue::config::{self, Config};
use protocue::pipeline::DEFAULT_PROTO_ROOT;
use protocue::scaffold::TESTS_DIR;
use protocue::{
    Error, GeneratedSchema, Generator, HttpFetcher, Runtime, ScaffoldOutcome, add_test_case,
};

const USAGE: &str = "\
Generate CUE schemas from protobuf files and scaffold validated test cases

Usage:
  protocue add <NAME> [OPTIONS]   create tests/<name>.cue
  protocue generate [OPTIONS]     generate schemas only

Options:
  --proto_path <DIR>     directory imports are resolved under [default: ./]
  --protofiles <GLOB>    protobuf files to generate from (repeatable)
  --out <DIR>            root of the generated tree [default: .]
  --config <FILE>        configuration file [default: protocue.json if present]
  -h, --help             print this help
  -V, --version          print the version
";

// ==============================================================================
// CLI Argument Definitions
// ==============================================================================

#[derive(Debug, PartialEq)]
enum Command {
    Add { name: String },
    Generate,
}

#[derive(Debug, Default, PartialEq)]
struct Options {
    proto_path: Option<PathBuf>,
    protofiles: Vec<String>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum Invocation {
    Help,
    Version,
    Run(Command, Options),
}

fn parse_args(args: impl IntoIterator<Item = impl Into<OsString>>) -> Result<Invocation, lexopt::Error> {
    use lexopt::prelude::*;

    let mut parser = lexopt::Parser::from_args(args);
    let mut subcommand: Option<String> = None;
    let mut name: Option<String> = None;
    let mut options = Options::default();

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => return Ok(Invocation::Help),
            Short('V') | Long("version") => return Ok(Invocation::Version),
            Long("proto_path" | "proto-path") => {
                options.proto_path = Some(parser.value()?.into());
            }
            Long("protofiles") => options.protofiles.push(parser.value()?.string()?),
            Long("out") => options.out = Some(parser.value()?.into()),
            Long("config") => options.config = Some(parser.value()?.into()),
            Value(value) if subcommand.is_none() => subcommand = Some(value.string()?),
            Value(value) if subcommand.as_deref() == Some("add") && name.is_none() => {
                name = Some(value.string()?);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let command = match subcommand.as_deref() {
        Some("add") => Command::Add {
            name: name.ok_or("missing test case name: protocue add <NAME>")?,
        },
        Some("generate") => Command::Generate,
        Some(other) => return Err(format!("unknown subcommand `{other}`").into()),
        None => return Ok(Invocation::Help),
    };
    Ok(Invocation::Run(command, options))
}

// ==============================================================================
// Entry Point
// ==============================================================================

fn main() -> miette::Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().build())
    }))?;
    install_tracing();

    let (command, options) = match parse_args(std::env::args_os().skip(1)).into_diagnostic()? {
        Invocation::Help => {
            print!("{USAGE}");
            return Ok(());
        }
        Invocation::Version => {
            println!("protocue {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Invocation::Run(command, options) => (command, options),
    };

    let config = match &options.config {
        Some(path) => Config::load(path, true)?,
        None => Config::load(Path::new(config::DEFAULT_FILE), false)?,
    };
    let out = options.out.clone().unwrap_or_else(|| PathBuf::from("."));
    let generator = build_generator(&options, &config, &out);
    let mut runtime = Runtime::new();

    match command {
        Command::Add { name } => run_add(&mut runtime, &generator, &out, &name),
        Command::Generate => run_generate(&mut runtime, &generator),
    }
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Command-line flags win over the configuration file.
fn build_generator(options: &Options, config: &Config, out: &Path) -> Generator {
    let proto_root = options
        .proto_path
        .clone()
        .or_else(|| config.proto_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROTO_ROOT));

    let mut generator = Generator::new();
    generator
        .proto_root(proto_root)
        .out_dir(out)
        .registry(config.registry());
    if let Some(timeout) = config.fetch_timeout {
        generator.fetcher(HttpFetcher::new(timeout));
    }
    for pattern in &options.protofiles {
        generator.protofile(pattern);
    }
    generator
}

// ==============================================================================
// `add` Subcommand
// ==============================================================================

fn run_add(
    runtime: &mut Runtime,
    generator: &Generator,
    out: &Path,
    name: &str,
) -> miette::Result<()> {
    let outcome = add_test_case(runtime, generator, &out.join(TESTS_DIR), name)
        .map_err(miette::Report::new)?;
    match outcome {
        ScaffoldOutcome::AlreadyExists(_) => println!("{name} already exists"),
        ScaffoldOutcome::Created { path, generated } => {
            match &generated {
                Some(output) => report_schemas(&output.schemas),
                None => println!("No protofiles. Will not generate schemas."),
            }
            println!("create: {}", path.display());
        }
    }
    Ok(())
}

// ==============================================================================
// `generate` Subcommand
// ==============================================================================

fn run_generate(runtime: &mut Runtime, generator: &Generator) -> miette::Result<()> {
    match generator.generate(runtime) {
        Ok(output) => {
            if let Some(descriptor) = &output.descriptor {
                println!("create: {}", descriptor.display());
            }
            report_schemas(&output.schemas);
            Ok(())
        }
        Err(e) if e.is_empty_input() => {
            println!("No protofiles. Will not generate schemas.");
            Ok(())
        }
        Err(e) => Err(miette::Report::new::<Error>(e)),
    }
}

fn report_schemas(schemas: &[GeneratedSchema]) {
    for schema in schemas {
        if let GeneratedSchema::Materialized { path, .. } = schema {
            println!("create: {}", path.display());
        }
    }
}
