//! WSDL Binding Generator CLI
//!
//! Compiles `<sdk>/<target>.wsdl` into Go units under `<output>/<target>/`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wsdl_gen::{generate, write_units, GenerateOptions, DEFAULT_MODULE};

#[derive(Parser)]
#[command(name = "wsdl-gen")]
#[command(about = "Generate Go bindings from WSDL and XSD schema documents")]
#[command(version)]
struct Cli {
    /// Output root; units are written under <OUTPUT>/<TARGET>/
    output: PathBuf,

    /// Target namespace short name (e.g., vim25, pbm, sms)
    target: String,

    /// Directory holding <TARGET>.wsdl and its linked schemas
    #[arg(long, default_value = "sdk")]
    sdk: PathBuf,

    /// JSON document with type, field, and enum documentation
    #[arg(long)]
    enrichment: Option<PathBuf>,

    /// Additional namespace documents may reference (repeatable)
    #[arg(long = "namespace", value_name = "NAME")]
    namespaces: Vec<String>,

    /// Type names to emit as polymorphic bases even without subtypes
    #[arg(
        long,
        env = "FORCE_BASE_INTERFACE_FOR_TYPES",
        value_delimiter = ',',
        value_name = "NAMES"
    )]
    force_base: Vec<String>,

    /// Go module path used for cross-package imports
    #[arg(long, default_value = DEFAULT_MODULE)]
    module: String,

    /// Generate in memory and report, but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Log pipeline progress to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), u8> {
    let wsdl = cli.sdk.join(format!("{}.wsdl", cli.target));

    let mut options = GenerateOptions::new(wsdl).target(&cli.target).module(cli.module);
    options.namespaces = cli.namespaces;
    options.force_base = cli
        .force_base
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(path) = cli.enrichment {
        options = options.enrichment(path);
    }

    let generation = generate(&options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if cli.dry_run {
        for unit in &generation.units {
            println!("{}/{}", generation.target, unit.kind.path());
        }
    } else {
        write_units(&cli.output, &generation).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    }

    println!(
        "{} types, {} base types",
        generation.total_types, generation.base_types
    );
    Ok(())
}
