//! Running `go mod graph` as the report source
//!
//! The child's stdout is exposed as a blocking reader so the graph can be
//! built while the child is still producing output. Stderr is inherited so
//! toolchain diagnostics reach the user unchanged.

use std::ffi::OsString;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use tracing::{debug, warn};

/// Errors from the report subprocess
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to start `{program} mod graph`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for `{program} mod graph`")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program} mod graph` exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

/// Builder for the `go mod graph` invocation
#[derive(Debug, Clone)]
pub struct ModGraphCommand {
    program: OsString,
    dir: PathBuf,
}

impl ModGraphCommand {
    /// Run `go mod graph` inside `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            program: OsString::from("go"),
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Use a different go executable
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Start the child with stdout piped
    pub fn spawn(&self) -> Result<ModGraphReport, ReportError> {
        let program = self.program.to_string_lossy().into_owned();

        let mut child = Command::new(&self.program)
            .args(["mod", "graph"])
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ReportError::Spawn {
                program: program.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReportError::Spawn {
                program,
                source: std::io::Error::other("stdout was not captured"),
            });
        };

        debug!(program = %program, pid = child.id(), dir = %self.dir.display(), "started report source");

        Ok(ModGraphReport {
            program,
            child,
            stdout: BufReader::new(stdout),
        })
    }
}

/// A running `go mod graph` child
///
/// Read the report through [`ModGraphReport::stdout`], then call
/// [`ModGraphReport::finish`] on success or [`ModGraphReport::abort`] when
/// processing failed part way.
#[derive(Debug)]
pub struct ModGraphReport {
    program: String,
    child: Child,
    stdout: BufReader<ChildStdout>,
}

impl ModGraphReport {
    /// Buffered reader over the child's stdout
    pub fn stdout(&mut self) -> &mut BufReader<ChildStdout> {
        &mut self.stdout
    }

    /// Wait for the child and check its exit status
    pub fn finish(self) -> Result<(), ReportError> {
        let Self {
            program,
            mut child,
            stdout,
        } = self;
        // close our end so a child still writing sees EPIPE instead of blocking
        drop(stdout);

        let status = child.wait().map_err(|source| ReportError::Wait {
            program: program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(ReportError::Failed { program, status });
        }

        debug!(program = %program, "report source exited cleanly");
        Ok(())
    }

    /// Kill and reap the child
    pub fn abort(mut self) {
        if let Err(err) = self.child.kill() {
            // already exited
            debug!(program = %self.program, error = %err, "could not kill report source");
        }
        if let Err(err) = self.child.wait() {
            warn!(program = %self.program, error = %err, "could not reap report source");
        }
    }
}
