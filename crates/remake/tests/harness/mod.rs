//! Test harness for remake integration tests
//!
//! Each test gets an isolated temp directory acting as the build root; the
//! remake binary runs with that directory as its working directory and with
//! its own location prepended to PATH so scripts can call `remake`
//! recursively.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use tempfile::TempDir;

/// An isolated build directory
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn remake_binary() -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_remake"))
    }

    /// Run `remake` with the given arguments in this environment.
    pub fn remake(&self, args: &[&str]) -> RemakeOutput {
        let binary = Self::remake_binary();
        let bin_dir = binary.parent().expect("binary has a parent directory");
        let path = match std::env::var("PATH") {
            Ok(path) => format!("{}:{}", bin_dir.display(), path),
            Err(_) => bin_dir.display().to_string(),
        };

        let mut cmd = Command::new(&binary);
        cmd.current_dir(self.dir.path());
        cmd.env("PATH", path);
        cmd.env_remove("REMAKE_SOCKET");
        cmd.env_remove("REMAKE_JOB_ID");
        cmd.args(args);

        let output = cmd.output().expect("failed to run remake");
        RemakeOutput::from(output)
    }

    /// Write the rule file.
    pub fn remakefile(&self, contents: &str) {
        self.write_file("Remakefile", contents);
    }

    pub fn write_file(&self, relative_path: &str, contents: &str) {
        std::fs::write(self.dir.path().join(relative_path), contents)
            .expect("failed to write file");
    }

    pub fn read_file(&self, relative_path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative_path)).expect("failed to read file")
    }

    pub fn file_exists(&self, relative_path: &str) -> bool {
        self.dir.path().join(relative_path).exists()
    }

    /// Bump a file's modification time by rewriting its contents.
    pub fn touch(&self, relative_path: &str) {
        let contents = self.read_file(relative_path);
        self.write_file(relative_path, &contents);
    }

    /// Wait long enough for a subsequent write to get a younger mtime.
    pub fn pause(&self) {
        std::thread::sleep(Duration::from_millis(50));
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Output from running remake
#[derive(Debug)]
pub struct RemakeOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RemakeOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
