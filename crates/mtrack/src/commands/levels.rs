//! Levels command.

use mtrack::{Interval, LevelGate};
use tracing::error;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

/// Handle the `levels` command.
pub fn cmd_levels(exprs: &[String]) -> i32 {
    let mut intervals = Vec::with_capacity(exprs.len());
    for expr in exprs {
        match expr.parse::<Interval>() {
            Ok(interval) => intervals.push(interval),
            Err(e) => {
                error!(error = %e, "invalid level expression");
                return EXIT_FAILURE;
            }
        }
    }

    println!("levels: {}", join(&intervals));
    println!("skip:   {}", join(&Interval::invert(&intervals)));

    let gate = LevelGate::plan(&intervals);
    if gate.is_open() {
        println!("gate:   open");
        return EXIT_SUCCESS;
    }
    for (i, steps) in gate.steps().iter().enumerate() {
        let steps: Vec<String> = steps.iter().map(ToString::to_string).collect();
        println!("range {}: {}", i + 1, steps.join("; "));
    }
    EXIT_SUCCESS
}

fn join(intervals: &[Interval]) -> String {
    if intervals.is_empty() {
        return "none".to_string();
    }
    intervals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
