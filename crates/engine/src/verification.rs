// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detects the buildable projects under a directory and runs their
//! verification steps (spec §4.3). Pure with respect to the Store: it
//! reads the filesystem, spawns processes, and returns a value.

use std::path::{Path, PathBuf};
use std::time::Duration;
use story_adapters::{run_with_timeout, RunError};

const VENDOR_DIRS: &[&str] = &[
    "node_modules", ".git", "target", "vendor", "venv", ".venv", "__pycache__", "dist", "bin", "obj", ".next",
];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("io error walking {path}: {source}")]
    Walk { path: PathBuf, #[source] source: std::io::Error },
    #[error(transparent)]
    Run(#[from] RunError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProjectType {
    Dotnet,
    Npm,
    Cargo,
    Go,
    Python,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProjectType::Dotnet => "dotnet",
            ProjectType::Npm => "npm",
            ProjectType::Cargo => "cargo",
            ProjectType::Go => "go",
            ProjectType::Python => "python",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VerificationStep {
    pub step_type: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
    pub required: bool,
    pub timeout: Duration,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DetectedProject {
    pub project_type: ProjectType,
    pub name: String,
    pub path: PathBuf,
    pub steps: Vec<VerificationStep>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StepResult {
    pub project: String,
    pub step_type: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub success: bool,
    pub required: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VerificationResult {
    pub projects: Vec<DetectedProject>,
    pub step_results: Vec<StepResult>,
    pub success: bool,
    pub summary: String,
}

pub struct VerificationEngine;

impl VerificationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn detect_projects(&self, root: &Path) -> Result<Vec<DetectedProject>, VerificationError> {
        let mut projects = Vec::new();
        walk(root, &mut projects)?;
        Ok(projects)
    }

    pub async fn verify(&self, root: &Path) -> Result<VerificationResult, VerificationError> {
        let projects = self.detect_projects(root)?;
        let mut step_results = Vec::new();

        for project in &projects {
            for step in &project.steps {
                let mut cmd = tokio::process::Command::new(&step.program);
                cmd.args(&step.args).current_dir(&step.working_directory);
                let label = format!("{} {}", project.name, step.step_type);
                match run_with_timeout(cmd, step.timeout, &label).await {
                    Ok(output) => {
                        step_results.push(StepResult {
                            project: project.name.clone(),
                            step_type: step.step_type.clone(),
                            exit_code: output.status.code(),
                            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                            timed_out: false,
                            success: output.status.success(),
                            required: step.required,
                        });
                    }
                    Err(RunError::TimedOut { .. }) => {
                        step_results.push(StepResult {
                            project: project.name.clone(),
                            step_type: step.step_type.clone(),
                            exit_code: None,
                            stdout: String::new(),
                            stderr: format!("timed out after {:?}", step.timeout),
                            timed_out: true,
                            success: false,
                            required: step.required,
                        });
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        let success = step_results.iter().all(|r| r.success || !r.required);
        let total = step_results.len();
        let passed = step_results.iter().filter(|r| r.success).count();
        let required_failures = step_results.iter().filter(|r| r.required && !r.success).count();

        let summary = if total == 0 {
            "No verification steps detected".to_string()
        } else if success {
            format!("{passed}/{total} steps passed")
        } else {
            format!("{required_failures} required failures")
        };

        Ok(VerificationResult { projects, step_results, success, summary })
    }
}

impl Default for VerificationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn walk(dir: &Path, projects: &mut Vec<DetectedProject>) -> Result<(), VerificationError> {
    let entries = std::fs::read_dir(dir).map_err(|source| VerificationError::Walk { path: dir.to_path_buf(), source })?;

    let mut file_names: Vec<String> = Vec::new();
    let mut subdirs: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| VerificationError::Walk { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !VENDOR_DIRS.contains(&name.as_str()) {
                subdirs.push(path);
            }
        } else if let Some(name) = path.file_name() {
            file_names.push(name.to_string_lossy().to_string());
        }
    }

    detect_here(dir, &file_names, projects);

    for subdir in subdirs {
        walk(&subdir, projects)?;
    }
    Ok(())
}

fn detect_here(dir: &Path, file_names: &[String], projects: &mut Vec<DetectedProject>) {
    let name_of = |dir: &Path| dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "root".to_string());

    let solution = file_names.iter().find(|n| n.ends_with(".sln"));
    if let Some(sln) = solution {
        projects.push(DetectedProject {
            project_type: ProjectType::Dotnet,
            name: sln.trim_end_matches(".sln").to_string(),
            path: dir.to_path_buf(),
            steps: vec![
                VerificationStep {
                    step_type: "build".to_string(),
                    program: "dotnet".to_string(),
                    args: vec!["build".to_string(), sln.clone()],
                    working_directory: dir.to_path_buf(),
                    required: true,
                    timeout: DEFAULT_TIMEOUT,
                },
                VerificationStep {
                    step_type: "format".to_string(),
                    program: "dotnet".to_string(),
                    args: vec!["format".to_string(), sln.clone(), "--verify-no-changes".to_string()],
                    working_directory: dir.to_path_buf(),
                    required: false,
                    timeout: DEFAULT_TIMEOUT,
                },
            ],
        });
    } else if let Some(proj) = file_names.iter().find(|n| n.ends_with(".csproj") || n.ends_with(".fsproj")) {
        projects.push(DetectedProject {
            project_type: ProjectType::Dotnet,
            name: proj.clone(),
            path: dir.to_path_buf(),
            steps: vec![VerificationStep {
                step_type: "build".to_string(),
                program: "dotnet".to_string(),
                args: vec!["build".to_string(), proj.clone()],
                working_directory: dir.to_path_buf(),
                required: true,
                timeout: DEFAULT_TIMEOUT,
            }],
        });
    }

    if file_names.iter().any(|n| n == "package.json") {
        if let Ok(contents) = std::fs::read_to_string(dir.join("package.json")) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) {
                let scripts = value.get("scripts").and_then(|s| s.as_object());
                let has_build = scripts.is_some_and(|s| s.contains_key("build"));
                if has_build {
                    let yarn = file_names.iter().any(|n| n == "yarn.lock");
                    let (program, build_args) = if yarn {
                        ("yarn".to_string(), vec!["build".to_string()])
                    } else {
                        ("npm".to_string(), vec!["run".to_string(), "build".to_string()])
                    };
                    let mut steps = vec![VerificationStep {
                        step_type: "build".to_string(),
                        program: program.clone(),
                        args: build_args,
                        working_directory: dir.to_path_buf(),
                        required: true,
                        timeout: DEFAULT_TIMEOUT,
                    }];
                    if scripts.is_some_and(|s| s.contains_key("lint")) {
                        let lint_args = if yarn { vec!["lint".to_string()] } else { vec!["run".to_string(), "lint".to_string()] };
                        steps.push(VerificationStep {
                            step_type: "lint".to_string(),
                            program,
                            args: lint_args,
                            working_directory: dir.to_path_buf(),
                            required: false,
                            timeout: DEFAULT_TIMEOUT,
                        });
                    }
                    projects.push(DetectedProject { project_type: ProjectType::Npm, name: name_of(dir), path: dir.to_path_buf(), steps });
                }
            }
        }
    }

    if file_names.iter().any(|n| n == "Cargo.toml") {
        projects.push(DetectedProject {
            project_type: ProjectType::Cargo,
            name: name_of(dir),
            path: dir.to_path_buf(),
            steps: vec![
                VerificationStep {
                    step_type: "build".to_string(),
                    program: "cargo".to_string(),
                    args: vec!["build".to_string()],
                    working_directory: dir.to_path_buf(),
                    required: true,
                    timeout: DEFAULT_TIMEOUT,
                },
                VerificationStep {
                    step_type: "format".to_string(),
                    program: "cargo".to_string(),
                    args: vec!["fmt".to_string(), "--".to_string(), "--check".to_string()],
                    working_directory: dir.to_path_buf(),
                    required: false,
                    timeout: DEFAULT_TIMEOUT,
                },
                VerificationStep {
                    step_type: "lint".to_string(),
                    program: "cargo".to_string(),
                    args: vec!["clippy".to_string(), "--".to_string(), "-D".to_string(), "warnings".to_string()],
                    working_directory: dir.to_path_buf(),
                    required: false,
                    timeout: DEFAULT_TIMEOUT,
                },
            ],
        });
    }

    if file_names.iter().any(|n| n == "go.mod") {
        projects.push(DetectedProject {
            project_type: ProjectType::Go,
            name: name_of(dir),
            path: dir.to_path_buf(),
            steps: vec![
                VerificationStep {
                    step_type: "build".to_string(),
                    program: "go".to_string(),
                    args: vec!["build".to_string(), "./...".to_string()],
                    working_directory: dir.to_path_buf(),
                    required: true,
                    timeout: DEFAULT_TIMEOUT,
                },
                VerificationStep {
                    step_type: "format".to_string(),
                    program: "gofmt".to_string(),
                    args: vec!["-l".to_string(), ".".to_string()],
                    working_directory: dir.to_path_buf(),
                    required: false,
                    timeout: DEFAULT_TIMEOUT,
                },
                VerificationStep {
                    step_type: "vet".to_string(),
                    program: "go".to_string(),
                    args: vec!["vet".to_string(), "./...".to_string()],
                    working_directory: dir.to_path_buf(),
                    required: false,
                    timeout: DEFAULT_TIMEOUT,
                },
            ],
        });
    }

    if file_names.iter().any(|n| n == "pyproject.toml") {
        if let Ok(contents) = std::fs::read_to_string(dir.join("pyproject.toml")) {
            if contents.contains("[tool.ruff]") {
                projects.push(DetectedProject {
                    project_type: ProjectType::Python,
                    name: name_of(dir),
                    path: dir.to_path_buf(),
                    steps: vec![
                        VerificationStep {
                            step_type: "lint".to_string(),
                            program: "ruff".to_string(),
                            args: vec!["check".to_string(), ".".to_string()],
                            working_directory: dir.to_path_buf(),
                            required: false,
                            timeout: DEFAULT_TIMEOUT,
                        },
                        VerificationStep {
                            step_type: "format".to_string(),
                            program: "ruff".to_string(),
                            args: vec!["format".to_string(), "--check".to_string(), ".".to_string()],
                            working_directory: dir.to_path_buf(),
                            required: false,
                            timeout: DEFAULT_TIMEOUT,
                        },
                    ],
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "verification_tests.rs"]
mod tests;
