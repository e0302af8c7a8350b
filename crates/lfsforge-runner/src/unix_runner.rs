//! Concrete [`ProcessRunner`]: spawns a real child process in its own
//! process group (`setsid`) so a timeout can terminate the whole tree
//! rather than just the immediate child.

use std::io::{self, Read, Write};
use std::os::unix::process::CommandExt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use crate::process::{ProcessOutput, ProcessRunner};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const TERM_GRACE_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Clone, Copy)]
pub struct UnixProcessRunner;

impl ProcessRunner for UnixProcessRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let mut discard = io::sink();
        self.run_tee(cmd, timeout, &mut discard, &mut discard)
    }
}

impl UnixProcessRunner {
    /// Like [`ProcessRunner::run`], but also writes stdout/stderr into
    /// the given sinks as captured.
    pub fn run_tee(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        stdout_sink: &mut dyn Write,
        stderr_sink: &mut dyn Write,
    ) -> Result<ProcessOutput, RunnerError> {
        let mut std_cmd = cmd.to_command();
        std_cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        unsafe {
            std_cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(io::Error::from)?;
                Ok(())
            });
        }

        let mut child = std_cmd.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: format!("{:?}", cmd.program),
            reason: e.to_string(),
        })?;
        let pgid = Pid::from_raw(child.id() as i32);

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let stdout_buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let stdout_thread = spawn_drain(stdout, stdout_buf.clone());
        let stderr_thread = spawn_drain(stderr, stderr_buf.clone());

        let deadline = Instant::now() + timeout;
        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(RunnerError::Io)? {
                break status;
            }
            if Instant::now() >= deadline {
                timed_out = true;
                let _ = signal::killpg(pgid, Signal::SIGTERM);
                let grace_deadline = Instant::now() + TERM_GRACE_PERIOD;
                let mut sent_kill = false;
                let reaped = loop {
                    if let Some(status) = child.try_wait().map_err(RunnerError::Io)? {
                        break status;
                    }
                    if !sent_kill && Instant::now() >= grace_deadline {
                        let _ = signal::killpg(pgid, Signal::SIGKILL);
                        sent_kill = true;
                    }
                    thread::sleep(POLL_INTERVAL);
                };
                break reaped;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout_bytes = stdout_thread.join().unwrap_or_default();
        let stderr_bytes = stderr_thread.join().unwrap_or_default();
        stdout_sink
            .write_all(&stdout_bytes)
            .map_err(RunnerError::Io)?;
        stderr_sink
            .write_all(&stderr_bytes)
            .map_err(RunnerError::Io)?;

        Ok(ProcessOutput::new(
            stdout_bytes,
            stderr_bytes,
            status.code(),
            timed_out,
        ))
    }
}

/// Drain a child stream into a shared buffer on its own thread, so
/// stdout and stderr are each read without blocking on the other
/// (classic pipe-deadlock avoidance) and preserve their own ordering.
fn spawn_drain<R: Read + Send + 'static>(
    mut reader: R,
    buf: Arc<Mutex<Vec<u8>>>,
) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut local = Vec::new();
        let _ = reader.read_to_end(&mut local);
        buf.lock().unwrap().extend_from_slice(&local);
        local
    })
}
