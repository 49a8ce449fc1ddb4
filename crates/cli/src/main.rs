// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `story` - local-first Story Orchestration Engine CLI (spec §6.4).
//!
//! No long-lived daemon: every invocation builds a fresh composition
//! root, runs the crash-recovery sweep, then the requested command.

mod color;
mod commands;
mod composition;
mod config;
mod exit_error;
mod output;

use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "story", author, version, about)]
struct Cli {
    /// Repository root to operate on; defaults to the current directory
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Override the Story store location (defaults to `<repo>/.story`)
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Story lifecycle commands: create, list, show, analyze, plan, run, ...
    Story(commands::story::StoryArgs),
    /// Render a Story's artifacts (research, plan, changes) to markdown
    Export(commands::export::ExportArgs),
    /// Run verification against a repository outside of any Story
    Verify(commands::verify::VerifyArgs),
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        match err.downcast::<ExitError>() {
            Ok(exit_err) => {
                eprintln!("error: {exit_err}");
                std::process::exit(exit_err.code);
            }
            Err(err) => {
                eprintln!("error: {err:#}");
                std::process::exit(1);
            }
        }
    }
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let matches = Cli::command().styles(color::styles()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let repo = cli.repo.map(Ok).unwrap_or_else(std::env::current_dir)?;
    let config = config::StoryConfig::load(&repo)?;
    let store_path = composition::store_path(&repo, cli.store_path, &config);
    let engine = composition::build_engine(store_path, &config);

    if let Err(err) = engine.recover().await {
        tracing::warn!(%err, "crash recovery sweep failed");
    }

    match cli.command {
        Command::Story(args) => commands::story::run(&engine, args, cli.format).await,
        Command::Export(args) => commands::export::run(&engine, args, cli.format).await,
        Command::Verify(args) => commands::verify::run(&engine, args, cli.format).await,
    }
}
