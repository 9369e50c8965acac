//! Job process handle: a child running in its own process group.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::ExecutorError;

/// Captured result of a process that exited on its own.
#[derive(Debug)]
pub(crate) struct Finished {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// A running job process.
///
/// The child leads a fresh process group so that a timeout kills everything
/// it forked, not just the direct child. Dropping the handle before the child
/// has been reaped kills the whole group as well.
#[derive(Debug)]
pub(crate) struct JobProcess {
    child: Child,
    pid: Option<u32>,
    reaped: bool,
}

impl JobProcess {
    /// Spawns `program args…` in `work_dir` with piped stdout/stderr and no stdin.
    pub(crate) fn spawn(
        program: &Path,
        args: &[&Path],
        work_dir: &Path,
    ) -> Result<Self, ExecutorError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| ExecutorError::SpawnFailed {
            program: program.to_owned(),
            source,
        })?;
        let pid = child.id();
        Ok(Self { child, pid, reaped: false })
    }

    /// Waits for exit and drains both pipes, bounded by `limit`.
    ///
    /// Returns `Ok(None)` on timeout, after the whole process group has been
    /// killed and the direct child reaped.
    pub(crate) async fn wait_with_timeout(
        mut self,
        limit: Duration,
    ) -> Result<Option<Finished>, ExecutorError> {
        let stdout = self.child.stdout.take();
        let stderr = self.child.stderr.take();

        let collected = tokio::time::timeout(limit, async {
            let (status, stdout, stderr) =
                tokio::join!(self.child.wait(), drain(stdout), drain(stderr));
            Ok::<_, ExecutorError>(Finished { status: status?, stdout: stdout?, stderr: stderr? })
        })
        .await;

        match collected {
            Ok(Ok(finished)) => {
                self.reaped = true;
                Ok(Some(finished))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(pid = ?self.pid, limit_s = limit.as_secs(), "job timed out, killing process group");
                self.kill_group();
                // kill() also reaps; an error means it already exited.
                let _ = self.child.kill().await;
                self.reaped = true;
                Ok(None)
            }
        }
    }

    #[cfg(unix)]
    fn kill_group(&self) {
        let Some(pgid) = self.pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
            return;
        };
        // SAFETY: killpg takes plain integers and touches no memory.
        let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if rc != 0 {
            tracing::debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}
}

impl Drop for JobProcess {
    // Once the leader is reaped its pid may be reused, so the group is only
    // signalled while the leader is still ours.
    fn drop(&mut self) {
        if !self.reaped {
            tracing::debug!(pid = ?self.pid, "job handle dropped before exit, killing process group");
            self.kill_group();
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
