// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `verify` - standalone verification run outside a Story (spec §6.4, §A.6)

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use story_engine::{Engine, VerificationResult};

#[derive(Args)]
pub struct VerifyArgs {
    /// Path to the repository (or worktree) to verify; defaults to cwd
    path: Option<PathBuf>,
}

pub async fn run(engine: &Engine<story_core::SystemClock>, args: VerifyArgs, format: OutputFormat) -> Result<()> {
    let path = args.path.unwrap_or(std::env::current_dir()?);
    let result = engine.verify(&path).await.context("running verification")?;
    crate::output::format_or_json(format, &result, print_result)?;
    if !result.success {
        return Err(crate::exit_error::ExitError::new(1, "verification failed").into());
    }
    Ok(())
}

fn print_result(result: &VerificationResult) {
    for project in &result.projects {
        println!("{} ({})", project.name, project.project_type);
    }
    for step in &result.step_results {
        let marker = if step.success { "ok" } else { "FAIL" };
        println!("  [{marker}] {}", step.step_type);
        if !step.success {
            let tail = if step.stderr.is_empty() { &step.stdout } else { &step.stderr };
            println!("      {}", tail.lines().next_back().unwrap_or(""));
        }
    }
    println!("{}", result.summary);
}
