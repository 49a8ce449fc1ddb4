// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Prints `value` as pretty JSON when `format` is `Json`, otherwise
/// defers to `text`.
pub fn format_or_json<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Text => text(value),
    }
    Ok(())
}

pub fn print_story_summary(story: &story_core::Story) {
    println!(
        "{} {} [{}]  wave={}  repo={}",
        crate::color::header(&story.id.short(8).to_string()),
        story.title,
        story.status,
        story.current_wave,
        story.repository_path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string()),
    );
}

pub fn print_story_detail(story: &story_core::Story) {
    print_story_summary(story);
    println!("  description: {}", story.description);
    if let Some(err) = &story.error {
        println!("  error: {err}");
    }
    if let Some(gate) = &story.gate_result {
        println!("  gate: {} ({})", gate.verdict, gate.summary);
        for failing in &gate.failing_steps {
            println!("    - {} / {}: {}", failing.project, failing.step_type, failing.reason);
        }
    }
    if story.steps.is_empty() {
        return;
    }
    println!("  steps:");
    for step in &story.steps {
        println!("    [wave {}] {} — {} ({})", step.wave, step.id.short(8), step.name, step.status);
    }
}
