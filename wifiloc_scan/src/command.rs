//! Subprocess-backed scan source.
//!
//! Runs the platform scan command once per call, capturing stdout and
//! stderr on helper threads so a chatty child can never fill its pipe and
//! stall. The child is killed when the timeout expires.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use wifiloc_traits::ScanSource;

use crate::error::{Result, ScanError};
use crate::util::wait_until_some_with_timeout;

/// Command used on macOS to produce the Wi-Fi report.
pub const DEFAULT_COMMAND: &str = "system_profiler";
pub const DEFAULT_ARGS: &[&str] = &["SPAirPortDataType"];

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct CommandScanSource {
    program: String,
    args: Vec<String>,
}

impl Default for CommandScanSource {
    fn default() -> Self {
        Self::new(
            DEFAULT_COMMAND,
            DEFAULT_ARGS.iter().map(|s| (*s).to_string()),
        )
    }
}

impl CommandScanSource {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Run the command to completion (or timeout) and return its stdout.
    pub fn run(&self, timeout: Duration) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScanError::Spawn {
                command: self.describe(),
                reason: e.to_string(),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_for_exit(&mut child, timeout) {
            Ok(status) => status,
            Err(e) => {
                if let Err(kill_err) = child.kill() {
                    tracing::debug!(error = %kill_err, "scan command already exited");
                }
                if let Err(wait_err) = child.wait() {
                    tracing::debug!(error = %wait_err, "could not reap killed scan command");
                }
                tracing::warn!(command = %self.describe(), ?timeout, "scan command killed");
                return Err(e);
            }
        };

        let out = join_output(stdout)?;
        let err = join_output(stderr)?;
        if !status.success() {
            return Err(ScanError::Exit {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&err).trim().to_string(),
            });
        }
        tracing::trace!(bytes = out.len(), "scan command output captured");
        String::from_utf8(out).map_err(|_| ScanError::Encoding)
    }
}

impl ScanSource for CommandScanSource {
    fn scan(
        &self,
        timeout: Duration,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.run(timeout)?)
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    wait_until_some_with_timeout(|| Ok(child.try_wait()?), timeout, POLL_INTERVAL)
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut p| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            p.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_output(handle: Drain) -> Result<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(h) => match h.join() {
            Ok(res) => Ok(res?),
            Err(_) => Err(ScanError::Io(std::io::Error::other(
                "scan output reader panicked",
            ))),
        },
    }
}
