// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test harness for the workspace-level `story` CLI specs.

use assert_cmd::Command;
use std::path::Path;

/// A throwaway git repository with a `story` invocation helper bound to it.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_init(&self) {
        run(self.path(), &["init", "-q"]);
        run(self.path(), &["config", "user.email", "spec@example.com"]);
        run(self.path(), &["config", "user.name", "spec"]);
        self.file("README.md", "seed\n");
        run(self.path(), &["add", "."]);
        run(self.path(), &["commit", "-q", "-m", "seed"]);
    }

    pub fn file(&self, relative: &str, contents: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, contents).expect("write file");
    }

    /// Builds a `story` invocation rooted at this project, via `--repo`.
    pub fn story(&self) -> Invocation {
        let mut cmd = Command::cargo_bin("story").expect("story binary");
        cmd.arg("--repo").arg(self.dir.path());
        Invocation { cmd }
    }
}

fn run(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git").arg("-C").arg(dir).args(args).status().expect("spawn git");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

pub struct Invocation {
    cmd: Command,
}

impl Invocation {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> Output {
        let assert = self.cmd.assert().success();
        Output::from(assert.get_output())
    }

    pub fn fails(mut self) -> Output {
        let assert = self.cmd.assert().failure();
        Output::from(assert.get_output())
    }
}

pub struct Output {
    stdout: String,
    stderr: String,
}

impl From<&std::process::Output> for Output {
    fn from(output: &std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl Output {
    pub fn stdout(&self) -> String {
        self.stdout.clone()
    }

    pub fn stderr(&self) -> String {
        self.stderr.clone()
    }

    pub fn stdout_has(&self, needle: &str) -> &Self {
        let out = self.stdout();
        assert!(out.contains(needle), "expected stdout to contain {needle:?}, got:\n{out}");
        self
    }

    pub fn stderr_has(&self, needle: &str) -> &Self {
        let err = self.stderr();
        assert!(err.contains(needle), "expected stderr to contain {needle:?}, got:\n{err}");
        self
    }
}
