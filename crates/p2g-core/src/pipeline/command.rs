//! External-command wrappers for the three pipeline stages

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::config::OUTPUT_DIRECTORY_VAR;
use crate::sync::{StageError, UploadError, WorkoutConverter, WorkoutDownloader, WorkoutUploader};
use crate::util::compact_text;

/// Environment variable carrying the requested workout count to the download command
pub const NUM_WORKOUTS_VAR: &str = "P2G_NUM_WORKOUTS";

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command line. Returns `None` when blank.
    ///
    /// No shell quoting is applied; wrap the command in a script when an
    /// argument needs embedded spaces.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn async_command(&self, output_directory: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(OUTPUT_DIRECTORY_VAR, output_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs the download command with the requested count in `P2G_NUM_WORKOUTS`.
#[derive(Debug, Clone)]
pub struct CommandDownloader {
    command: CommandSpec,
    output_directory: PathBuf,
}

impl CommandDownloader {
    pub fn new(command: CommandSpec, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            command,
            output_directory: output_directory.into(),
        }
    }
}

impl WorkoutDownloader for CommandDownloader {
    async fn download_latest(&self, count: u32) -> Result<(), StageError> {
        tokio::fs::create_dir_all(&self.output_directory).await?;
        let output = self
            .command
            .async_command(&self.output_directory)
            .env(NUM_WORKOUTS_VAR, count.to_string())
            .output()
            .await?;
        tracing::debug!(command = %self.command, status = %output.status, "Download command finished");
        check_exit(&self.command, &output)
    }
}

/// Runs one converter command to completion on the calling thread.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    command: CommandSpec,
    output_directory: PathBuf,
}

impl CommandConverter {
    pub fn new(command: CommandSpec, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            command,
            output_directory: output_directory.into(),
        }
    }
}

impl WorkoutConverter for CommandConverter {
    fn name(&self) -> &str {
        self.command.program()
    }

    fn convert(&self) -> Result<(), StageError> {
        std::fs::create_dir_all(&self.output_directory)?;
        let output = std::process::Command::new(self.command.program())
            .args(self.command.args())
            .env(OUTPUT_DIRECTORY_VAR, &self.output_directory)
            .stdin(Stdio::null())
            .output()?;
        check_exit(&self.command, &output)
    }
}

/// Runs the upload command. A non-zero exit is reported as
/// [`UploadError::Rejected`]; failing to launch it at all is unexpected.
#[derive(Debug, Clone)]
pub struct CommandUploader {
    command: CommandSpec,
    output_directory: PathBuf,
}

impl CommandUploader {
    pub fn new(command: CommandSpec, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            command,
            output_directory: output_directory.into(),
        }
    }
}

impl WorkoutUploader for CommandUploader {
    async fn upload_all(&self) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(&self.output_directory)
            .await
            .map_err(StageError::from)?;
        let output = self
            .command
            .async_command(&self.output_directory)
            .output()
            .await
            .map_err(StageError::from)?;

        if output.status.success() {
            return Ok(());
        }

        Err(UploadError::Rejected {
            status: output.status.to_string(),
            detail: failure_detail(&output),
        })
    }
}

fn check_exit(command: &CommandSpec, output: &Output) -> Result<(), StageError> {
    if output.status.success() {
        return Ok(());
    }
    Err(StageError::CommandFailed {
        command: command.to_string(),
        status: output.status.to_string(),
        stderr: failure_detail(output),
    })
}

/// Stderr when the command wrote any, otherwise stdout.
fn failure_detail(output: &Output) -> String {
    let stderr = compact_text(&String::from_utf8_lossy(&output.stderr));
    if stderr.is_empty() {
        compact_text(&String::from_utf8_lossy(&output.stdout))
    } else {
        stderr
    }
}
