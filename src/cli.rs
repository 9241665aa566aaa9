//! Command-line surface: argument parsing, interactive prompts for omitted
//! selections, and dispatch into the library's catalogue/library/driver/
//! generator/report pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Input;

use marchsim::{catalogue, driver, generator, library, report, DEFAULT_SEED};

#[derive(Parser)]
#[command(name = "marchsim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output.
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a March program against a fault catalogue and write a detection
    /// report.
    Simulate {
        /// Path to the fault catalogue JSON document.
        #[arg(long)]
        catalogue: PathBuf,

        /// Path to the March program library JSON document.
        #[arg(long)]
        library: PathBuf,

        /// Name of the program to run, from the library. Prompted
        /// interactively when omitted.
        #[arg(long)]
        program: Option<String>,

        /// Memory rows. Prompted interactively when omitted.
        #[arg(long)]
        rows: Option<usize>,

        /// Memory columns. Prompted interactively when omitted.
        #[arg(long)]
        cols: Option<usize>,

        /// Seed for address placement. Defaults to a fixed published
        /// constant for reproducibility.
        #[arg(long)]
        seed: Option<u64>,

        /// Report output path. Defaults to `<program-name>.report.txt`.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Search for a March program that detects every subcase in a fault
    /// catalogue.
    Generate {
        /// Path to the fault catalogue JSON document.
        #[arg(long)]
        catalogue: PathBuf,

        /// Candidate operation sequence length to search.
        #[arg(long)]
        length: usize,

        /// Memory rows. Prompted interactively when omitted.
        #[arg(long)]
        rows: Option<usize>,

        /// Memory columns. Prompted interactively when omitted.
        #[arg(long)]
        cols: Option<usize>,

        /// Seed for address placement. Defaults to a fixed published
        /// constant for reproducibility.
        #[arg(long)]
        seed: Option<u64>,

        /// Report output path. Defaults to `generated.report.txt`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .init();
}

fn prompt_usize(label: &str) -> Result<usize> {
    Input::<usize>::new()
        .with_prompt(label)
        .interact_text()
        .context("failed to read interactive input")
}

fn prompt_program_name(names: &[&str]) -> Result<String> {
    for (i, name) in names.iter().enumerate() {
        println!("  [{i}] {name}");
    }
    let index: usize = Input::new()
        .with_prompt("select a March program by index")
        .interact_text()
        .context("failed to read interactive input")?;
    names
        .get(index)
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("index {index} out of range"))
}

/// Parses CLI arguments, initializes logging, and dispatches to the chosen
/// subcommand. Returns the process-level error chain ready for `main` to
/// print on failure.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Simulate { catalogue, library, program, rows, cols, seed, out } => {
            run_simulate(&catalogue, &library, program, rows, cols, seed, out)
        }
        Commands::Generate { catalogue, length, rows, cols, seed, out } => {
            run_generate(&catalogue, length, rows, cols, seed, out)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_simulate(
    catalogue_path: &Path,
    library_path: &Path,
    program_name: Option<String>,
    rows: Option<usize>,
    cols: Option<usize>,
    seed: Option<u64>,
    out: Option<PathBuf>,
) -> Result<()> {
    let cat = catalogue::load(catalogue_path)
        .with_context(|| format!("failed to read catalogue at {}", catalogue_path.display()))?;
    let lib = library::load(library_path)
        .with_context(|| format!("failed to read library at {}", library_path.display()))?;

    let program_name = match program_name {
        Some(name) => name,
        None => {
            if lib.is_empty() {
                anyhow::bail!("March program library at {} is empty", library_path.display());
            }
            prompt_program_name(&lib.names())?
        }
    };
    let program = lib
        .get(&program_name)
        .with_context(|| format!("failed to select program {program_name:?}"))?;

    let rows = match rows {
        Some(r) => r,
        None => prompt_usize("memory rows")?,
    };
    let cols = match cols {
        Some(c) => c,
        None => prompt_usize("memory cols")?,
    };
    let seed = seed.unwrap_or(DEFAULT_SEED);

    tracing::info!(program = %program_name, rows, cols, seed, "running simulation");
    let sim_report = driver::run(&cat, &program, rows, cols, seed)
        .context("simulation run failed")?;

    let text = report::render(&sim_report);
    let out_path = out.unwrap_or_else(|| PathBuf::from(format!("{program_name}.report.txt")));
    std::fs::write(&out_path, &text)
        .with_context(|| format!("failed to write report to {}", out_path.display()))?;
    tracing::info!(path = %out_path.display(), report = %text, "wrote report");
    println!("{} {}", style("report written to").green(), out_path.display());

    Ok(())
}

fn run_generate(
    catalogue_path: &Path,
    length: usize,
    rows: Option<usize>,
    cols: Option<usize>,
    seed: Option<u64>,
    out: Option<PathBuf>,
) -> Result<()> {
    let cat = catalogue::load(catalogue_path)
        .with_context(|| format!("failed to read catalogue at {}", catalogue_path.display()))?;

    let rows = match rows {
        Some(r) => r,
        None => prompt_usize("memory rows")?,
    };
    let cols = match cols {
        Some(c) => c,
        None => prompt_usize("memory cols")?,
    };
    let seed = seed.unwrap_or(DEFAULT_SEED);

    tracing::info!(length, rows, cols, seed, "searching for a detecting program");
    let program = generator::generate(&cat, length, rows, cols, seed)
        .context("generator search failed")?;

    let out_path = out.unwrap_or_else(|| PathBuf::from("generated.report.txt"));
    if program.is_empty() {
        tracing::info!("no candidate found");
        std::fs::write(&out_path, "none found\n")
            .with_context(|| format!("failed to write report to {}", out_path.display()))?;
        println!("{}", style(format!("no candidate of length {length} detects every subcase")).yellow());
        return Ok(());
    }

    let sim_report = driver::run(&cat, &program, rows, cols, seed)
        .context("verifying generated program failed")?;
    let mut text = format!("program: {program}\n\n");
    text.push_str(&report::render(&sim_report));
    std::fs::write(&out_path, &text)
        .with_context(|| format!("failed to write report to {}", out_path.display()))?;
    tracing::info!(path = %out_path.display(), program = %program.to_string(), "wrote report");
    println!("{} {program}", style("generated program:").green());
    println!("{} {}", style("report written to").green(), out_path.display());

    Ok(())
}
