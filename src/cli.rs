//! Command-line argument parsing for ferrovis

use clap::{Parser, ValueEnum};
use ferrovis::{env, CollectMode, Options};

/// ferrovis - line-of-sight visibility over a group of workers
#[derive(Parser, Debug)]
#[command(name = "ferrovis")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Comma-separated altitudes; the observer stands on the first one
    #[arg(value_name = "ALTITUDES", allow_hyphen_values = true)]
    pub altitudes: Option<String>,

    /// Number of workers [default: SLURM_NTASKS or available parallelism]
    #[arg(short = 'n', long, env = env::WORKERS_VAR)]
    pub workers: Option<usize>,

    /// How visibility flags are gathered on rank 0
    #[arg(long, value_enum, default_value_t = CollectArg::Batch)]
    pub collect: CollectArg,

    /// Print each worker's classification time (µs) to stderr
    #[arg(long)]
    pub timings: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all diagnostics
    #[arg(short, long)]
    pub quiet: bool,
}

/// Collector wire mode
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectArg {
    /// One message per flag plus an end marker
    Stream,
    /// One message per worker
    Batch,
}

impl From<CollectArg> for CollectMode {
    fn from(arg: CollectArg) -> Self {
        match arg {
            CollectArg::Stream => CollectMode::Stream,
            CollectArg::Batch => CollectMode::Batch,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity; everything goes to stderr.
    pub fn init_logging(&self) {
        use tracing_subscriber::{fmt, EnvFilter};

        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_names(self.verbose > 1)
            .with_writer(std::io::stderr)
            .init();
    }

    /// Run options derived from the arguments.
    pub fn options(&self) -> Options {
        Options {
            workers: self.workers.unwrap_or_else(env::default_workers),
            collect: self.collect.into(),
            ..Options::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from(["ferrovis", "-n", "3", "--collect", "stream", "1,2,3"]).unwrap();
        assert_eq!(cli.altitudes.as_deref(), Some("1,2,3"));
        let options = cli.options();
        assert_eq!(options.workers, 3);
        assert_eq!(options.collect, CollectMode::Stream);
    }

    #[test]
    fn negative_first_altitude_is_not_a_flag() {
        let cli = Cli::try_parse_from(["ferrovis", "-n", "2", "-5,3,4"]).unwrap();
        assert_eq!(cli.altitudes.as_deref(), Some("-5,3,4"));
    }
}
