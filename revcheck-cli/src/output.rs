use crate::{OutputFormat, GLOBAL_OPTS};
use colored::*;
use serde::Serialize;
use std::io;

/// Whether results should be printed as JSON
pub fn is_json() -> bool {
    GLOBAL_OPTS
        .get()
        .map(|opts| opts.output == OutputFormat::Json)
        .unwrap_or(false)
}

/// Whether regular output is suppressed
pub fn is_quiet() -> bool {
    GLOBAL_OPTS.get().map(|opts| opts.quiet).unwrap_or(false)
}

/// Print JSON output
pub fn print_json<T: Serialize>(data: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{}", json);
    Ok(())
}

/// Print a labelled value in text mode
pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("{:14} {}", format!("{}:", label).bold(), value);
}

/// Print verbose message (only if verbose mode is on)
pub fn verbose_println(level: u8, message: &str) {
    let opts = GLOBAL_OPTS.get().expect("Global options not initialized");

    if !opts.quiet && opts.verbose >= level {
        eprintln!("{} {}", "[VERBOSE]".dimmed(), message);
    }
}

