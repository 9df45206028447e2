//! Shell command runner.
//!
//! Each call spins up a current-thread tokio runtime so the child can be
//! raced against a timeout. A child that outlives the timeout is killed
//! and reported as [`ApplicationError::CommandTimedOut`].
//!
//! ```text
//! run_shell("git rev-parse HEAD")   ──▶ sh -c "git rev-parse HEAD"
//! run_script(Path("gen.py"), args)  ──▶ python3 gen.py args...
//! run_script(Inline{.., "js"}, ..)  ──▶ node /tmp/trellis-XXXX.js args...
//! ```

use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, instrument, warn};
use trellis_core::{
    application::{
        ApplicationError,
        ports::{CommandOutput, CommandRunner, ScriptSource},
    },
    error::{TrellisError, TrellisResult},
};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    timeout: Duration,
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl ShellCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn shell(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }

    /// Interpreter for a script, chosen by file extension.
    fn interpreter(path: &Path) -> Command {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let (program, leading): (&str, &[&str]) = match extension.as_deref() {
            Some("sh") => ("sh", &[]),
            Some("bash") => ("bash", &[]),
            Some("js" | "mjs" | "cjs") => ("node", &[]),
            Some("ts") => ("npx", &["tsx"]),
            Some("py") => ("python3", &[]),
            Some("rb") => ("ruby", &[]),
            Some("ps1") => ("pwsh", &["-File"]),
            _ => {
                return Command::new(path);
            }
        };

        let mut cmd = Command::new(program);
        cmd.args(leading).arg(path);
        cmd
    }

    fn execute(&self, label: &str, mut cmd: Command, cwd: Option<&Path>) -> TrellisResult<CommandOutput> {
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let failed = |reason: String| -> TrellisError {
            ApplicationError::CommandFailed {
                command: label.to_string(),
                reason,
            }
            .into()
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| failed(format!("could not start runtime: {e}")))?;

        runtime.block_on(async {
            let child = cmd.spawn().map_err(|e| failed(e.to_string()))?;
            match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
                Ok(Ok(output)) => {
                    let output = CommandOutput {
                        status: output.status.code(),
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    };
                    debug!(command = %label, status = ?output.status, "Command finished");
                    Ok(output)
                }
                Ok(Err(e)) => Err(failed(e.to_string())),
                Err(_) => {
                    warn!(command = %label, timeout = ?self.timeout, "Command timed out; killed");
                    Err(ApplicationError::CommandTimedOut {
                        command: label.to_string(),
                        seconds: self.timeout.as_secs(),
                    }
                    .into())
                }
            }
        })
    }
}

impl CommandRunner for ShellCommandRunner {
    #[instrument(skip_all, fields(command = %command))]
    fn run_shell(&self, command: &str, cwd: Option<&Path>) -> TrellisResult<CommandOutput> {
        self.execute(command, Self::shell(command), cwd)
    }

    #[instrument(skip_all)]
    fn run_script(
        &self,
        script: &ScriptSource,
        args: &[String],
        cwd: Option<&Path>,
    ) -> TrellisResult<CommandOutput> {
        match script {
            ScriptSource::Path(path) => {
                let mut cmd = Self::interpreter(path);
                cmd.args(args);
                self.execute(&path.display().to_string(), cmd, cwd)
            }
            ScriptSource::Inline {
                contents,
                extension,
            } => {
                let suffix = format!(".{}", extension.as_deref().unwrap_or("sh"));
                let io_failed = |e: std::io::Error| -> TrellisError {
                    ApplicationError::CommandFailed {
                        command: "<inline script>".into(),
                        reason: format!("could not stage script: {e}"),
                    }
                    .into()
                };

                // Removed when `file` drops, after the child has exited.
                let mut file = tempfile::Builder::new()
                    .prefix("trellis-")
                    .suffix(&suffix)
                    .tempfile()
                    .map_err(io_failed)?;
                file.write_all(contents.as_bytes()).map_err(io_failed)?;
                file.flush().map_err(io_failed)?;

                let mut cmd = Self::interpreter(file.path());
                cmd.args(args);
                self.execute("<inline script>", cmd, cwd)
            }
        }
    }
}
