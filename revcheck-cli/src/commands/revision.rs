//! Revision check commands

use anyhow::{Context, Result};
use colored::Colorize;
use revcheck::revision::{extract_mpq_index, ValueProgram};
use revcheck::{RevisionChecker, RevisionConfig};
use serde::Serialize;
use std::path::PathBuf;

use crate::output::{self, print_field, verbose_println};

/// Where the MPQ index comes from
#[derive(Debug)]
pub enum MpqTarget {
    /// Archive name sent by the server
    Name(String),
    /// Index given directly
    Index(usize),
}

#[derive(Serialize)]
struct ChecksumReport<'a> {
    value: &'a str,
    mpq_index: usize,
    files: Vec<String>,
    strategy: String,
    execution: String,
    checksum: i32,
}

/// Compute a checksum over three files
pub fn checksum(
    value: &str,
    target: MpqTarget,
    files: &[PathBuf],
    config: RevisionConfig,
) -> Result<()> {
    let files: [PathBuf; 3] = files
        .to_vec()
        .try_into()
        .map_err(|_| anyhow::anyhow!("Exactly three files are required"))?;

    let checker = RevisionChecker::new(config.clone())?;
    let (mpq_index, checksum) = match target {
        MpqTarget::Name(name) => {
            let index = extract_mpq_index(&name)?;
            verbose_println(1, &format!("Archive {} selects MPQ index {}", name, index));
            let checksum = checker
                .check_revision(value, &files, &name)
                .context("Revision check failed")?;
            (index, checksum)
        }
        MpqTarget::Index(index) => {
            let checksum = checker
                .compute(value, &files, index)
                .context("Revision check failed")?;
            (index, checksum)
        }
    };
    verbose_println(
        1,
        &format!(
            "{} loading, {} execution",
            config.strategy, config.execution
        ),
    );

    if output::is_json() {
        output::print_json(&ChecksumReport {
            value,
            mpq_index,
            files: files.iter().map(|f| f.display().to_string()).collect(),
            strategy: config.strategy.to_string(),
            execution: config.execution.to_string(),
            checksum,
        })?;
    } else if output::is_quiet() {
        println!("{}", checksum);
    } else {
        print_field("MPQ index", mpq_index);
        print_field("Checksum", format!("{} ({:#010x})", checksum, checksum as u32));
    }

    Ok(())
}

#[derive(Serialize)]
struct FormulaReport {
    canonical: String,
    seeds: [u32; 3],
    operations: Vec<String>,
}

/// Parse a value string and print its canonical form
pub fn formula(value: &str) -> Result<()> {
    let program = ValueProgram::parse(value)?;

    if output::is_json() {
        output::print_json(&FormulaReport {
            canonical: program.to_string(),
            seeds: [program.seed_a, program.seed_b, program.seed_c],
            operations: program.ops.iter().map(|op| op.to_string()).collect(),
        })?;
        return Ok(());
    }

    println!("{}", program);
    if !output::is_quiet() {
        println!();
        print_field("Seed A", program.seed_a);
        print_field("Seed B", program.seed_b);
        print_field("Seed C", program.seed_c);
        println!("{}", "Operations:".bold());
        for (i, op) in program.ops.iter().enumerate() {
            println!("  {:2}. {}", i + 1, op);
        }
    }

    Ok(())
}

/// Print the MPQ index of an archive name
pub fn mpq_index(name: &str) -> Result<()> {
    let index = extract_mpq_index(name)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({ "name": name, "index": index }))?;
    } else {
        println!("{}", index);
    }

    Ok(())
}
