use serde::Serialize;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};

#[derive(Debug, Serialize)]
pub enum Error {
    // command could not be spawned
    IO(String),
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Runs the command to completion, non zero exit codes are reported with the tool's stderr.
/// Returns stdout.
pub fn run(command: &mut Command) -> Result<String, Error> {
    let (description, output) = output(command)?;

    if !output.status.success() {
        return Err(Error::Failed {
            command: description,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Runs the command without checking its exit status.
pub fn output(command: &mut Command) -> Result<(String, Output), Error> {
    let description = describe(command);
    tracing::debug!(command = %description, "running");

    let output = command
        .output()
        .map_err(|err| Error::IO(format!("{} failed: {:?}", description, err)))?;

    if !output.stderr.is_empty() {
        tracing::warn!(
            stderr = String::from_utf8_lossy(&output.stderr).to_string(),
            command = %description,
            status = ?output.status.code(),
            "command wrote to stderr"
        );
    }

    Ok((description, output))
}

/// Whether the command exits successfully, spawn errors count as failure.
pub fn succeeds(command: &mut Command) -> bool {
    match output(command) {
        Ok((_, output)) => output.status.success(),
        Err(err) => {
            tracing::debug!(?err, "command check failed");
            false
        }
    }
}

/// Whether `program` can be executed, programs given as a path are checked directly.
pub fn which(program: &str) -> bool {
    if program.contains('/') {
        return fs::metadata(Path::new(program))
            .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false);
    }
    succeeds(Command::new("which").arg(program))
}

fn describe(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().to_string()];
    parts.extend(command.get_args().map(|arg| arg.to_string_lossy().to_string()));
    parts.join(" ")
}
