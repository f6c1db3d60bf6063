use clap::Parser;
use serde::Deserialize;
use slidematch::{SolveError, Solver, SolverConfig};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Slider-puzzle solver (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Gap image URL or path (overrides the config).
    #[arg(long, value_name = "LOCATOR")]
    gap: Option<String>,
    /// Background image URL or path (overrides the config).
    #[arg(long, value_name = "LOCATOR")]
    background: Option<String>,
    /// Annotated output image (overrides the config).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    gap: String,
    background: String,
    /// Where to write the result JSON; stdout when absent.
    result_path: Option<PathBuf>,
    solver: SolverConfig,
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let from_file = cli.config.exists() || (cli.gap.is_none() && cli.background.is_none());
    let mut config: Config = if from_file {
        let config_text = fs::read_to_string(&cli.config)?;
        serde_json::from_str(&config_text)?
    } else {
        Config::default()
    };
    if let Some(gap) = cli.gap {
        config.gap = gap;
    }
    if let Some(background) = cli.background {
        config.background = background;
    }
    if let Some(output) = cli.output {
        config.solver.output_path = output;
    }
    if config.gap.is_empty() || config.background.is_empty() {
        return Err("gap and background must be set in the config or on the command line".into());
    }

    let solver = Solver::from_config(config.solver)?;
    let result = solver.solve(&config.gap, &config.background)?;
    tracing::info!(
        solved = result.position.is_some(),
        entry = result.matched_entry_id.as_deref().unwrap_or("none"),
        "solve finished"
    );
    let json = serde_json::to_string_pretty(&result)?;

    match config.result_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        let filter = match "slidematch=info".parse() {
            Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
            Err(_) => EnvFilter::from_default_env(),
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return ExitCode::SUCCESS;
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<SolveError>() {
                Some(solve) => eprintln!("error [{}]: {solve}", solve.stage()),
                None => eprintln!("error: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}
