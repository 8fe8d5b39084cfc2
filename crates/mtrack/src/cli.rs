//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mtrack::DEFAULT_MEAN;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "mtrack")]
#[command(about = "Method-tracking instrumentor - expands timing, sampling and level markers")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log directive for the selected verbosity.
    pub const fn log_directive(&self) -> &'static str {
        if self.verbose {
            "mtrack=debug"
        } else if self.silent {
            "mtrack=error"
        } else {
            "mtrack=info"
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand the markers of a script and print the instrumented listings
    Expand {
        /// Marker script
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Sampling mean for declarations without a `mean` tag (at least 1)
        #[arg(
            long,
            default_value_t = DEFAULT_MEAN,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        default_mean: u32,

        /// First free local slot of every method
        #[arg(long, default_value_t = 0)]
        first_slot: u16,

        /// Name of the global level value read by level gates
        #[arg(long, default_value = "level")]
        level_field: String,

        /// Instrument methods one at a time
        #[arg(long)]
        sequential: bool,
    },
    /// Show the skip ranges and compare plan for level expressions
    Levels {
        /// Level expressions, e.g. `[0,5]`, `>=3`, `=2`
        #[arg(value_name = "EXPR", required = true)]
        exprs: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_args(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(["mtrack", "expand", "methods.mtrack"].iter().chain(args))
    }

    #[test]
    fn test_default_mean_must_be_positive() {
        assert!(expand_args(&["--default-mean", "0"]).is_err());
        assert!(expand_args(&["--default-mean", "-3"]).is_err());

        let cli = expand_args(&["--default-mean", "1"]).unwrap();
        let Commands::Expand { default_mean, .. } = cli.command else {
            panic!("expected expand command");
        };
        assert_eq!(default_mean, 1);
    }

    #[test]
    fn test_expand_defaults() {
        let cli = expand_args(&[]).unwrap();
        assert_eq!(cli.log_directive(), "mtrack=info");
        let Commands::Expand {
            default_mean,
            first_slot,
            sequential,
            ..
        } = cli.command
        else {
            panic!("expected expand command");
        };
        assert_eq!(default_mean, DEFAULT_MEAN);
        assert_eq!(first_slot, 0);
        assert!(!sequential);
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["mtrack", "-v", "levels", "[0,5]"]).unwrap();
        assert_eq!(cli.log_directive(), "mtrack=debug");
        assert!(Cli::try_parse_from(["mtrack", "-v", "-s", "levels", "1"]).is_err());
    }
}
