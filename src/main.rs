//! ferrovis - CLI for line-of-sight visibility

mod cli;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use ferrovis::{parse_altitudes, render, visibility};

fn main() {
    let cli = Cli::parse();
    cli.init_logging();

    // Every worker would see the same missing input: stop before launching any.
    let Some(input) = cli.altitudes.as_deref() else {
        tracing::error!("missing altitude list (e.g. `ferrovis 1,2,3`)");
        process::exit(1);
    };

    if let Err(e) = run(&cli, input) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli, input: &str) -> Result<()> {
    let altitudes = parse_altitudes(input).context("cannot read altitudes")?;
    let options = cli.options();
    if ferrovis::env::is_slurm_job() {
        tracing::info!("running inside a SLURM job");
    }

    let report = visibility(&altitudes, &options)
        .with_context(|| format!("visibility run with {} workers failed", options.workers))?;

    println!("{}", render(&report.flags));

    if cli.timings {
        let micros: Vec<String> = report
            .timings
            .iter()
            .map(|t| t.as_micros().to_string())
            .collect();
        eprintln!("{}", micros.join(" "));
    }

    Ok(())
}
