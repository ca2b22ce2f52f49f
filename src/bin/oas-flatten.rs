//! oas-flatten CLI
//!
//! Dereference `$ref` pointers and flatten `allOf` compositions in an
//! OpenAPI v3 document, writing the result as JSON or YAML.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use oas_flatten::{
    dereference, flatten, load_document, write_document, CircularRefPolicy, FlattenOptions,
    OutputFormat,
};

#[derive(Parser)]
#[command(name = "oas-flatten")]
#[command(about = "Dereference and flatten allOf compositions in OpenAPI v3 documents")]
#[command(version)]
struct Cli {
    /// Input OpenAPI document (JSON or YAML)
    #[arg(short = 's', long = "source")]
    source: PathBuf,

    /// Output file; format chosen by extension (.json, .yaml, .yml)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Flatten allOf compositions (without this, the tool only dereferences)
    #[arg(short = 'm', long = "merge")]
    merge: bool,

    /// Fully dereference $ref pointers before flattening
    #[arg(short = 'd', long = "dereference")]
    dereference: bool,

    /// Keep the components section when writing a dereferenced document
    #[arg(long, requires = "dereference")]
    keep_components: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Usage errors exit 1; --help and --version are not usage errors.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run(cli: &Cli) -> Result<(), u8> {
    // Validate the destination before doing any work, so a bad extension
    // never produces a partial run.
    OutputFormat::from_path(&cli.output).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut document = load_document(&cli.source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if cli.dereference {
        let base_dir = cli.source.parent().unwrap_or(Path::new("."));
        dereference(&mut document, base_dir, CircularRefPolicy::Ignore).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    }

    if cli.merge {
        let options = FlattenOptions {
            dereferenced: cli.dereference,
            keep_components: cli.keep_components,
            ..FlattenOptions::default()
        };
        let report = flatten(&mut document, &options);
        for failure in &report.failures {
            eprintln!("Warning: cannot merge {}", failure);
        }
    }

    write_document(&document, &cli.output, cli.pretty).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    println!("Wrote {}", cli.output.display());
    Ok(())
}
