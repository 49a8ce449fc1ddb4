// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `story` - Story lifecycle commands (spec §6.4)

use crate::exit_error::ExitError;
use crate::output::{format_or_json, print_story_detail, print_story_summary, OutputFormat};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use story_core::{AutomationMode, GateMode, StepId, StoryId, StoryStatus};
use story_engine::{CreateStoryRequest, Engine, FinalizeRequest};
use story_storage::StoryFilter;

#[derive(Args)]
pub struct StoryArgs {
    #[command(subcommand)]
    pub command: StoryCommand,
}

#[derive(Subcommand)]
pub enum StoryCommand {
    /// Create a new Story
    Create {
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        repository_path: Option<PathBuf>,
        #[arg(long, value_parser = parse_automation_mode)]
        automation_mode: Option<AutomationMode>,
        #[arg(long)]
        issue_url: Option<String>,
        #[arg(long)]
        dispatch_target: Option<String>,
        #[arg(long)]
        max_parallelism: Option<u32>,
        #[arg(long, value_parser = parse_gate_mode)]
        gate_mode: Option<GateMode>,
    },
    /// List Stories, newest first
    List {
        #[arg(long, value_parser = parse_story_status)]
        status: Option<StoryStatus>,
        #[arg(long)]
        repository_path: Option<PathBuf>,
    },
    /// Show a single Story with its Steps
    Show { story_id: String },
    /// Delete a Story and tear down its worktree
    Delete { story_id: String },
    /// Run the Analyzer (Created -> Analyzed)
    Analyze { story_id: String },
    /// Run the Decomposer (Analyzed -> Planned)
    Plan {
        story_id: String,
        #[arg(long)]
        max_parallelism: Option<u32>,
    },
    /// Dispatch the current wave and drive the state machine forward
    Run { story_id: String },
    /// Approve or reject a Step; approving a failed Step in a GateFailed
    /// Story is the remediation path back to Executing (spec §4.7)
    Approve {
        story_id: String,
        step_id: String,
        #[arg(long)]
        reject: bool,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Re-evaluate a GatePending Story's gate
    ResumeGate { story_id: String },
    /// Cancel an in-flight Story
    Cancel { story_id: String },
    /// Finalize a GatePending Story with a passing gate
    Finalize {
        story_id: String,
        #[arg(long)]
        commit_message: Option<String>,
        #[arg(long)]
        no_squash: bool,
        #[arg(long)]
        create_pull_request: bool,
        #[arg(long)]
        pr_title: Option<String>,
        #[arg(long)]
        draft: bool,
    },
}

pub async fn run(engine: &Engine<story_core::SystemClock>, args: StoryArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        StoryCommand::Create {
            title,
            description,
            repository_path,
            automation_mode,
            issue_url,
            dispatch_target,
            max_parallelism,
            gate_mode,
        } => {
            let story = engine
                .create_story(CreateStoryRequest {
                    title,
                    description,
                    repository_path,
                    automation_mode,
                    issue_url,
                    dispatch_target,
                    max_parallelism,
                    gate_mode,
                })
                .await
                .context("creating story")?;
            format_or_json(format, &story, print_story_detail)?;
        }
        StoryCommand::List { status, repository_path } => {
            let filter = StoryFilter { status, repository_path };
            let stories = engine.list_stories(&filter).await.context("listing stories")?;
            format_or_json(format, &stories, |stories| stories.iter().for_each(print_story_summary))?;
        }
        StoryCommand::Show { story_id } => {
            let story = get(engine, &story_id).await?;
            format_or_json(format, &story, print_story_detail)?;
        }
        StoryCommand::Delete { story_id } => {
            let id = parse_story_id(&story_id)?;
            engine.delete_story(id).await.context("deleting story")?;
            println!("deleted {}", id.short(8));
        }
        StoryCommand::Analyze { story_id } => {
            let id = parse_story_id(&story_id)?;
            let story = engine.analyze_story(id).await.context("analyzing story")?;
            format_or_json(format, &story, print_story_detail)?;
        }
        StoryCommand::Plan { story_id, max_parallelism } => {
            let id = parse_story_id(&story_id)?;
            let config = max_parallelism.map(|max_parallelism| story_engine::DecomposeConfig { max_parallelism, include_tests: true });
            let story = engine.plan_story(id, config).await.context("planning story")?;
            format_or_json(format, &story, print_story_detail)?;
        }
        StoryCommand::Run { story_id } => {
            let id = parse_story_id(&story_id)?;
            let story = engine.run_story(id).await.context("running story")?;
            format_or_json(format, &story, print_story_detail)?;
        }
        StoryCommand::Approve { story_id, step_id, reject, feedback } => {
            let story_id = parse_story_id(&story_id)?;
            let step_id = StepId::from_string(&step_id);
            let step = engine.approve_step(story_id, step_id, !reject, feedback).await.context("approving step")?;
            format_or_json(format, &step, |step| println!("{} — {} ({})", step.id.short(8), step.name, step.status))?;
        }
        StoryCommand::ResumeGate { story_id } => {
            let id = parse_story_id(&story_id)?;
            let story = engine.resume_gate(id).await.context("resuming gate")?;
            format_or_json(format, &story, print_story_detail)?;
        }
        StoryCommand::Cancel { story_id } => {
            let id = parse_story_id(&story_id)?;
            let story = engine.cancel_story(id).await.context("cancelling story")?;
            format_or_json(format, &story, print_story_detail)?;
        }
        StoryCommand::Finalize { story_id, commit_message, no_squash, create_pull_request, pr_title, draft } => {
            let id = parse_story_id(&story_id)?;
            let request = FinalizeRequest { commit_message, squash: !no_squash, create_pull_request, pr_title, draft };
            let outcome = engine.finalize_story(id, request).await.context("finalizing story")?;
            format_or_json(format, &outcome, |outcome| match &outcome.pull_request_url {
                Some(url) => println!("finalized, pull request: {url}"),
                None => println!("finalized"),
            })?;
        }
    }
    Ok(())
}

async fn get(engine: &Engine<story_core::SystemClock>, raw_id: &str) -> Result<story_core::Story> {
    let id = parse_story_id(raw_id)?;
    Ok(engine.get_story(id).await.context("fetching story")?)
}

fn parse_story_id(raw: &str) -> Result<StoryId, ExitError> {
    if raw.is_empty() {
        return Err(ExitError::new(2, "story id must not be empty"));
    }
    Ok(StoryId::from_string(raw))
}

fn parse_gate_mode(raw: &str) -> Result<GateMode, String> {
    match raw {
        "auto_proceed" | "auto" => Ok(GateMode::AutoProceed),
        "pause_always" | "pause" => Ok(GateMode::PauseAlways),
        other => Err(format!("invalid gate mode {other:?}, expected auto_proceed|pause_always")),
    }
}

fn parse_automation_mode(raw: &str) -> Result<AutomationMode, String> {
    match raw {
        "assisted" => Ok(AutomationMode::Assisted),
        "autonomous" => Ok(AutomationMode::Autonomous),
        "full_autonomous" | "full" => Ok(AutomationMode::FullAutonomous),
        other => Err(format!("invalid automation mode {other:?}, expected assisted|autonomous|full_autonomous")),
    }
}

fn parse_story_status(raw: &str) -> Result<StoryStatus, String> {
    match raw {
        "created" => Ok(StoryStatus::Created),
        "analyzing" => Ok(StoryStatus::Analyzing),
        "analyzed" => Ok(StoryStatus::Analyzed),
        "planning" => Ok(StoryStatus::Planning),
        "planned" => Ok(StoryStatus::Planned),
        "executing" => Ok(StoryStatus::Executing),
        "gate_pending" => Ok(StoryStatus::GatePending),
        "gate_failed" => Ok(StoryStatus::GateFailed),
        "completed" => Ok(StoryStatus::Completed),
        "failed" => Ok(StoryStatus::Failed),
        "cancelled" => Ok(StoryStatus::Cancelled),
        other => Err(format!("invalid status {other:?}")),
    }
}
