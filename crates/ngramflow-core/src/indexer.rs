//! Subprocess adapter for the external indexing backend.
//!
//! Owns exactly one child process speaking the line-oriented protocol:
//! lines in on stdin, optional lines out on stdout, close-stdin means
//! flush and exit. The child's stdout is always drained on a dedicated
//! thread; without it the child can fill its output pipe and deadlock
//! against the stdin we are still feeding.

use std::io::{self, BufRead, BufReader, LineWriter, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How the drain thread treats backend output lines.
pub enum OutputMode {
    /// Bulk ingest: the backend's output carries no information we need.
    Discard,
    /// Pipelined query: forward each output line, in order.
    Forward(Sender<String>),
}

/// Command line for launching the backend.
#[derive(Debug, Clone)]
pub struct BackendCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BackendCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for BackendCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A running backend process.
///
/// Input goes through a `LineWriter`, so every completed line reaches the
/// child's pipe before `write_line` returns — required for the pipelined
/// query mode, where FIFO correspondence between queries and responses is
/// the whole protocol.
pub struct IndexerProcess {
    child: Child,
    stdin: Option<LineWriter<ChildStdin>>,
    drain: Option<JoinHandle<()>>,
}

impl IndexerProcess {
    pub fn spawn(cmd: &BackendCommand, output: OutputMode) -> io::Result<Self> {
        log::debug!("launching backend: {cmd}");
        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("backend stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("backend stdout not captured"))?;

        let drain = thread::spawn(move || {
            let reader = BufReader::new(stdout);
            let mut forward = match output {
                OutputMode::Discard => None,
                OutputMode::Forward(tx) => Some(tx),
            };
            for line in reader.lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(_) => break,
                };
                let mut receiver_gone = false;
                match &forward {
                    Some(tx) => receiver_gone = tx.send(line).is_err(),
                    None => log::trace!("backend: {line}"),
                }
                // Receiver gone: keep draining so the child never blocks
                // on a full stdout pipe
                if receiver_gone {
                    forward = None;
                }
            }
        });

        Ok(Self {
            child,
            stdin: Some(LineWriter::new(stdin)),
            drain: Some(drain),
        })
    }

    /// Write one line of input to the backend.
    ///
    /// Fails with `BrokenPipe` once the process has exited or the input
    /// was closed.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let writer = self.stdin.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "backend input already closed")
        })?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")
    }

    /// Signal end-of-input. Idempotent.
    pub fn close_input(&mut self) {
        if let Some(mut writer) = self.stdin.take() {
            let _ = writer.flush();
        }
    }

    /// Close input, wait for the process to exit within the grace period,
    /// and join the drain thread.
    ///
    /// A backend that outlives the grace period is killed and reported as
    /// an error — its index state must be assumed incomplete.
    pub fn shutdown(mut self, grace: Duration) -> io::Result<ExitStatus> {
        self.close_input();

        let deadline = Instant::now() + grace;
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.join_drain();
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = self.child.kill();
                let _ = self.child.wait();
                self.join_drain();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("backend did not exit within {}s of input close", grace.as_secs()),
                ));
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    fn join_drain(&mut self) {
        if let Some(handle) = self.drain.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const GRACE: Duration = Duration::from_secs(10);

    #[test]
    fn command_display() {
        let cmd = BackendCommand::new("java")
            .args(["-cp", "lib/*"])
            .arg("IndexNgramFeatures");
        assert_eq!(format!("{cmd}"), "java -cp lib/* IndexNgramFeatures");
    }

    #[test]
    fn bulk_ingest_clean_exit() {
        let cmd = BackendCommand::new("cat");
        let mut proc = IndexerProcess::spawn(&cmd, OutputMode::Discard).unwrap();

        for i in 0..100 {
            proc.write_line(&format!("line {i}")).unwrap();
        }

        let status = proc.shutdown(GRACE).unwrap();
        assert!(status.success());
    }

    #[test]
    fn forward_mode_preserves_order() {
        let (tx, rx) = mpsc::channel();
        let cmd = BackendCommand::new("cat");
        let mut proc = IndexerProcess::spawn(&cmd, OutputMode::Forward(tx)).unwrap();

        proc.write_line("alpha").unwrap();
        proc.write_line("beta").unwrap();
        proc.write_line("gamma").unwrap();
        proc.shutdown(GRACE).unwrap();

        let lines: Vec<String> = rx.into_iter().collect();
        assert_eq!(lines, ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn write_after_close_is_broken_pipe() {
        let cmd = BackendCommand::new("cat");
        let mut proc = IndexerProcess::spawn(&cmd, OutputMode::Discard).unwrap();
        proc.close_input();
        proc.close_input(); // idempotent

        let err = proc.write_line("late").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        proc.shutdown(GRACE).unwrap();
    }

    #[test]
    fn dead_backend_surfaces_write_error() {
        let cmd = BackendCommand::new("true");
        let mut proc = IndexerProcess::spawn(&cmd, OutputMode::Discard).unwrap();
        thread::sleep(Duration::from_millis(300));

        // LineWriter flushes on newline, so EPIPE shows up within a
        // handful of writes once the child is gone
        let mut failed = false;
        for _ in 0..100 {
            if proc.write_line("anyone there?").is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed, "writes to a dead backend should fail");

        proc.shutdown(GRACE).unwrap();
    }

    #[test]
    fn nonzero_exit_reported() {
        let cmd = BackendCommand::new("sh").args(["-c", "exit 3"]);
        let proc = IndexerProcess::spawn(&cmd, OutputMode::Discard).unwrap();
        let status = proc.shutdown(GRACE).unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn hung_backend_killed_after_grace() {
        // Ignores stdin close and sleeps past the grace period
        let cmd = BackendCommand::new("sh").args(["-c", "sleep 30"]);
        let proc = IndexerProcess::spawn(&cmd, OutputMode::Discard).unwrap();

        let start = Instant::now();
        let err = proc.shutdown(Duration::from_millis(200)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
