//! Subprocess invocation shared by provisioning and the command generator.

use std::path::Path;
use std::process::{Command, Stdio};

/// Output cap for captured subprocess text (the tail is kept).
const MAX_OUTPUT: usize = 10 * 1024;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit code, or `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Combined stdout/stderr, trimmed and capped.
    pub output: String,
}

impl CommandOutput {
    pub fn status_label(&self) -> String {
        match self.code {
            Some(c) => format!("exit code {c}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Run `argv` in `cwd` to completion, capturing stdout and stderr.
///
/// Spawn failures (missing program, permission denied) surface as `Err`;
/// a non-zero exit is reported through `CommandOutput::success`.
pub fn run_captured(argv: &[String], cwd: &Path) -> std::io::Result<CommandOutput> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command")
    })?;

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        output: combine_output(&stdout, &stderr),
    })
}

/// Human-readable form of an argv for log lines.
pub fn display_argv(argv: &[String]) -> String {
    argv.join(" ")
}

/// Combine stdout/stderr and cap to 10KB (keeping the tail).
fn combine_output(stdout: &str, stderr: &str) -> String {
    let output = if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    };
    let trimmed = output.trim();
    if trimmed.len() <= MAX_OUTPUT {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - MAX_OUTPUT;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let dir = TempDir::new().unwrap();
        let out = run_captured(&argv(&["sh", "-c", "echo out; echo err >&2"]), dir.path()).unwrap();
        assert!(out.success);
        assert_eq!(out.code, Some(0));
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[test]
    fn non_zero_exit_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let out = run_captured(&argv(&["sh", "-c", "exit 3"]), dir.path()).unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.status_label(), "exit code 3");
    }

    #[test]
    fn runs_in_given_directory() {
        let dir = TempDir::new().unwrap();
        run_captured(&argv(&["sh", "-c", "echo hi > marker"]), dir.path()).unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        assert!(run_captured(&argv(&["proxyup-no-such-program"]), dir.path()).is_err());
    }

    #[test]
    fn empty_argv_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(run_captured(&[], dir.path()).is_err());
    }

    #[test]
    fn output_capped_to_tail() {
        let long = "a".repeat(MAX_OUTPUT) + "END";
        let combined = combine_output(&long, "");
        assert_eq!(combined.len(), MAX_OUTPUT);
        assert!(combined.ends_with("END"));
    }
}
