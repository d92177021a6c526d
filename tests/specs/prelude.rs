// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for CLI specs.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::TempDir;

/// A `stratum` invocation with a clean, colorless environment.
pub struct Cli {
    cmd: Command,
}

pub fn cli() -> Cli {
    let mut cmd = Command::cargo_bin("stratum").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("STRATUM_LOG", "warn")
        .env_remove("COLOR")
        .env_remove("STRATUM_CONFIG")
        .env_remove("STRATUM_GENERATOR_URL")
        .env_remove("IAC_GENERATOR_URL")
        .env_remove("STRATUM_LOG_DIR");
    Cli { cmd }
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.cmd.env(key, value.as_ref());
        self
    }

    /// Run and require exit code 0.
    pub fn passes(mut self) -> Run {
        let output = self.cmd.output().unwrap();
        let run = Run { output };
        assert!(run.output.status.success(), "expected success\n{}", run.describe());
        run
    }

    /// Run and require the given exit code.
    pub fn exits_with(mut self, code: i32) -> Run {
        let output = self.cmd.output().unwrap();
        let run = Run { output };
        assert_eq!(run.output.status.code(), Some(code), "wrong exit code\n{}", run.describe());
        run
    }
}

pub struct Run {
    output: Output,
}

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout().contains(needle), "stdout lacks {:?}\n{}", needle, self.describe());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr().contains(needle), "stderr lacks {:?}\n{}", needle, self.describe());
        self
    }

    fn describe(&self) -> String {
        format!("--- stdout ---\n{}--- stderr ---\n{}", self.stdout(), self.stderr())
    }
}

/// Temporary directory holding a state snapshot path.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn state_file(&self) -> PathBuf {
        self.dir.path().join("state.zst")
    }

    /// `stratum` with `--state-file` pointing into this workspace.
    pub fn stratum(&self) -> Cli {
        let state_file = self.state_file();
        cli()
            .env("STRATUM_WORK_DIR", self.dir.path().join("work"))
            .args(&["--state-file", &state_file.to_string_lossy()])
    }
}
