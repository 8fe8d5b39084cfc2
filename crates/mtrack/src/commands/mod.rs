//! Command implementations.

mod expand;
mod levels;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Expand {
            input,
            default_mean,
            first_slot,
            level_field,
            sequential,
        } => expand::cmd_expand(expand::ExpandArgs {
            input,
            default_mean: *default_mean,
            first_slot: *first_slot,
            level_field,
            parallel: !*sequential,
        }),
        Commands::Levels { exprs } => levels::cmd_levels(exprs),
    }
}
