use std::io::{BufRead, BufReader, Lines as IoLines, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with code {code}")]
    ExitStatus { program: String, code: i32 },
    #[error("`{program}` was terminated by a signal")]
    Killed { program: String },
    #[error("io error while reading output of `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Lazy sequence of trimmed output lines.
///
/// After the last line, a non-zero exit status is reported as a final
/// `Err(ProcessError::ExitStatus)` item.
pub type Lines<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

/// Spawns external programs.
pub trait ProcessRunner {
    /// Run `program` to completion and return its exit code.
    fn run(&self, program: &str, args: &[&str]) -> Result<i32>;

    /// Run `program` and yield its stdout line by line.
    fn stream(&self, program: &str, args: &[&str]) -> Result<Lines<'_>>;
}

/// Runs real processes in a fixed working directory.
#[derive(Debug, Clone)]
pub struct SystemProcess {
    working_dir: PathBuf,
}

impl SystemProcess {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    fn command(&self, program: &str, args: &[&str]) -> Command {
        debug!(program, ?args, dir = %self.working_dir.display(), "spawning process");
        let mut command = Command::new(program);
        command.args(args).current_dir(&self.working_dir);
        command
    }
}

impl ProcessRunner for SystemProcess {
    fn run(&self, program: &str, args: &[&str]) -> Result<i32> {
        let output = self
            .command(program, args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_string(),
                source,
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(program, "{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(program, "stderr: {}", line);
        }

        output.status.code().ok_or_else(|| ProcessError::Killed {
            program: program.to_string(),
        })
    }

    fn stream(&self, program: &str, args: &[&str]) -> Result<Lines<'_>> {
        let mut child = self
            .command(program, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ProcessError::Io {
            program: program.to_string(),
            source: std::io::Error::other("stdout was not captured"),
        })?;

        let stderr = child.stderr.take().map(collect_stderr);

        Ok(Box::new(ChildLines {
            program: program.to_string(),
            child: Some(child),
            lines: BufReader::new(stdout).lines(),
            stderr,
        }))
    }
}

/// Drain stderr on its own thread so a chatty child cannot block on it.
fn collect_stderr(stderr: impl Read + Send + 'static) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        BufReader::new(stderr)
            .lines()
            .map_while(|line| line.ok())
            .collect()
    })
}

/// Output lines of a running child; reaps the child once stdout is drained.
struct ChildLines {
    program: String,
    child: Option<Child>,
    lines: IoLines<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<Vec<String>>>,
}

impl ChildLines {
    /// Trace captured stderr; louder when the child failed.
    fn report_stderr(&mut self, failed: bool) {
        let Some(handle) = self.stderr.take() else {
            return;
        };
        let program = self.program.as_str();
        for line in handle.join().unwrap_or_default() {
            if failed {
                warn!(program, "stderr: {}", line);
            } else {
                debug!(program, "stderr: {}", line);
            }
        }
    }

    fn finish(&mut self) -> Option<Result<String>> {
        let mut child = self.child.take()?;
        let status = child.wait();
        self.report_stderr(!matches!(&status, Ok(status) if status.success()));
        match status {
            Ok(status) => match status.code() {
                Some(0) => None,
                Some(code) => Some(Err(ProcessError::ExitStatus {
                    program: self.program.clone(),
                    code,
                })),
                None => Some(Err(ProcessError::Killed {
                    program: self.program.clone(),
                })),
            },
            Err(source) => Some(Err(ProcessError::Io {
                program: self.program.clone(),
                source,
            })),
        }
    }
}

impl Iterator for ChildLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.child.as_ref()?;

        match self.lines.next() {
            Some(Ok(line)) => Some(Ok(line.trim().to_string())),
            Some(Err(source)) => {
                // Stop reading but still reap the child.
                if let Some(mut child) = self.child.take() {
                    let _ = child.kill();
                    let _ = child.wait();
                }
                self.report_stderr(true);
                Some(Err(ProcessError::Io {
                    program: self.program.clone(),
                    source,
                }))
            }
            None => self.finish(),
        }
    }
}

impl Drop for ChildLines {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}
