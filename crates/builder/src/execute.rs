//! External build tool invocation under a deadline

use pdfbuild_errors::{BuildError, Error};
use std::io::{self, Read};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::task;

/// Result of executing the build command
#[derive(Debug, Clone)]
pub struct BuildCommandResult {
    /// Whether the command succeeded
    pub success: bool,
    /// Exit code, `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Standard output and standard error, interleaved in production order
    pub log: String,
}

/// Runs `<program> <target>` inside a build directory
#[derive(Debug, Clone)]
pub struct BuildExecutor {
    program: String,
    timeout: Duration,
}

impl BuildExecutor {
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the build tool with `dir` as its working directory
    ///
    /// A nonzero exit is reported through [`BuildCommandResult::success`],
    /// not as an error.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::SpawnFailed` if the tool cannot be started and
    /// `BuildError::Timeout` if it does not finish before the deadline, in
    /// which case the tool and every process it started are killed and no
    /// output is returned.
    pub async fn run(&self, dir: &Path, target: &str) -> Result<BuildCommandResult, Error> {
        // One pipe for both streams keeps the log in production order.
        let (mut reader, writer) = io::pipe()?;
        let stderr_writer = writer.try_clone()?;

        let mut child = {
            let mut cmd = Command::new(&self.program);
            cmd.arg(target)
                .current_dir(dir)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(stderr_writer)
                .kill_on_drop(true);
            // Own process group, so a timeout can take down the whole tree.
            #[cfg(unix)]
            cmd.process_group(0);

            cmd.spawn().map_err(|e| BuildError::SpawnFailed {
                program: self.program.clone(),
                message: e.to_string(),
            })?
            // `cmd` drops here, closing the parent's write ends so the
            // reader sees EOF once the tool exits.
        };

        tracing::debug!(
            program = %self.program,
            build_target = target,
            dir = %dir.display(),
            pid = ?child.id(),
            "build started"
        );

        let reader_task = task::spawn_blocking(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| buf)
        });

        let started = Instant::now();
        let waited = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await?;
            let output = reader_task.await.map_err(io::Error::other)??;
            Ok::<_, io::Error>((status, output))
        })
        .await;

        let (status, output) = match waited {
            Ok(result) => result?,
            Err(_) => {
                self.terminate(&mut child).await;
                tracing::warn!(
                    program = %self.program,
                    dir = %dir.display(),
                    timeout = ?self.timeout,
                    "build timed out"
                );
                return Err(BuildError::Timeout {
                    limit: self.timeout,
                }
                .into());
            }
        };

        let result = BuildCommandResult {
            success: status.success(),
            exit_code: status.code(),
            log: String::from_utf8_lossy(&output).into_owned(),
        };

        tracing::debug!(
            program = %self.program,
            success = result.success,
            exit_code = ?result.exit_code,
            elapsed = ?started.elapsed(),
            "build finished"
        );

        Ok(result)
    }

    /// Kill the build and everything it started, then reap the child
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
                use nix::errno::Errno;
                use nix::sys::signal::{killpg, Signal};
                use nix::unistd::Pid;

                match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(e) => {
                        tracing::warn!(program = %self.program, pid, error = %e, "failed to kill build process group");
                    }
                }
            }
        }

        if let Err(e) = child.kill().await {
            tracing::warn!(program = %self.program, error = %e, "failed to kill timed out build");
        }
    }
}
