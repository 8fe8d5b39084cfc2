//! Expand command.

use std::path::Path;

use mtrack::{BufferConfig, ExpandConfig, InstrumentConfig, Instrumentor, load_script};
use tracing::{error, info};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

pub struct ExpandArgs<'a> {
    pub input: &'a Path,
    pub default_mean: u32,
    pub first_slot: u16,
    pub level_field: &'a str,
    pub parallel: bool,
}

/// Handle the `expand` command.
pub fn cmd_expand(args: ExpandArgs<'_>) -> i32 {
    info!(input = %args.input.display(), "expanding");

    let methods = match load_script(args.input) {
        Ok(methods) => methods,
        Err(e) => {
            error!(input = %args.input.display(), error = %e, "failed to load script");
            return EXIT_FAILURE;
        }
    };

    let config = InstrumentConfig::default()
        .with_expand(
            ExpandConfig::default()
                .with_default_mean(args.default_mean)
                .with_level_field(args.level_field),
        )
        .with_buffer(BufferConfig::default().with_first_slot(args.first_slot))
        .with_parallel(args.parallel);
    let instrumentor = Instrumentor::new(config);

    match instrumentor.instrument_all(&methods) {
        Ok(instrumented) => {
            for method in &instrumented {
                println!("{method}");
            }
            for (method_id, mean) in instrumentor.counters().snapshot() {
                println!("counter {method_id} mean={mean}");
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, "expansion failed");
            EXIT_FAILURE
        }
    }
}
