// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `export` - render Story artifacts to markdown (spec §6.4, §6.5)

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use story_core::StoryId;
use story_engine::{Engine, ExportKind, ExportOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportArg {
    Research,
    Plan,
    Changes,
}

impl From<ExportArg> for ExportKind {
    fn from(value: ExportArg) -> Self {
        match value {
            ExportArg::Research => ExportKind::Research,
            ExportArg::Plan => ExportKind::Plan,
            ExportArg::Changes => ExportKind::Changes,
        }
    }
}

#[derive(Args)]
pub struct ExportArgs {
    story_id: String,
    /// Which artifacts to render; defaults to all three
    #[arg(long = "kind", value_enum)]
    kinds: Vec<ExportArg>,
    /// Directory to write artifacts into; defaults to the Story's worktree
    #[arg(long)]
    output_path: Option<PathBuf>,
}

pub async fn run(engine: &Engine<story_core::SystemClock>, args: ExportArgs, format: OutputFormat) -> Result<()> {
    let id = StoryId::from_string(&args.story_id);
    let kinds: Vec<ExportKind> = if args.kinds.is_empty() {
        vec![ExportKind::Research, ExportKind::Plan, ExportKind::Changes]
    } else {
        args.kinds.into_iter().map(ExportKind::from).collect()
    };
    let outcome = engine.export_artifacts(id, args.output_path, &kinds).await.context("exporting artifacts")?;
    crate::output::format_or_json(format, &outcome, print_outcome)?;
    Ok(())
}

fn print_outcome(outcome: &ExportOutcome) {
    for artifact in &outcome.exported {
        println!("wrote {}", artifact.path.display());
    }
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }
}
