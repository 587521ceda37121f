use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::{io, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use xinfodump::{
    config::{Prompter, RunConfig, Terminal},
    process,
};

#[derive(Parser)]
#[command(name = "xinfodump")]
#[command(about = "Split, rename and time-normalize xInfoDump CSV exports")]
struct Args {
    /// YAML file with any of: glob, id_pattern, reprocess_pattern, out_dir, scenario
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Glob expression selecting the input CSV files
    #[arg(short, long)]
    glob: Option<String>,

    /// Regex with one integer capture group identifying the test number
    #[arg(long)]
    id_pattern: Option<String>,

    /// Regex recovering the test number from processed file names
    #[arg(long)]
    reprocess_pattern: Option<String>,

    /// Output directory (absent or empty)
    #[arg(short, long)]
    out_dir: Option<String>,

    /// ns-3 simulation scenario the tests came from
    #[arg(short, long)]
    scenario: Option<String>,

    /// Do not ask for confirmation when the configuration is complete
    #[arg(short, long)]
    yes: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_filter = if args.verbose {
        "info,xinfodump=debug"
    } else {
        "info"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    // ─── 2) assemble configuration ───────────────────────────────────
    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(v) = args.glob {
        config.glob = v;
    }
    if let Some(v) = args.id_pattern {
        config.id_pattern = v;
    }
    if let Some(v) = args.reprocess_pattern {
        config.reprocess_pattern = v;
    }
    if let Some(v) = args.out_dir {
        config.out_dir = v;
    }
    if let Some(v) = args.scenario {
        config.scenario = v;
    }

    // ─── 3) validate / prompt ────────────────────────────────────────
    let complete = config.is_complete();
    let plan = if complete && args.yes {
        config.validate()?
    } else {
        let mut prompter = Prompter::new(Terminal::new()?);
        match prompter.acquire(config, !complete)? {
            Some(plan) => plan,
            None => {
                eprintln!("Aborted.");
                std::process::exit(1);
            }
        }
    };
    info!(
        files = plan.inputs.len(),
        out_dir = %plan.out_dir.display(),
        "configuration accepted"
    );
    println!("Proceeding...");

    // ─── 4) run the pipeline ─────────────────────────────────────────
    let summary = process::run(&plan, Utc::now())?;
    println!(
        "Completed successfully! Find your processed dataset at {}",
        summary.out_dir.display()
    );
    Ok(())
}
