//! Batch request/reply transport over a child process's stdio.

use crate::error::{ChannelError, Result};
use async_trait::async_trait;
use cortex_qc_protocol::{Message, Reply};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, ChildStdout, Command};

/// Wall-clock budget for one batch, from spawn to child exit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Subcommand that puts the server into stdio MCP mode.
pub const SERVER_SUBCOMMAND: &str = "mcp";

/// Sends one batch of messages and returns the replies that answer it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, batch: &[Message]) -> Result<Vec<Reply>>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn exchange(&self, batch: &[Message]) -> Result<Vec<Reply>> {
        (**self).exchange(batch).await
    }
}

/// One JSON object per line, plus the trailing newline that ends the batch.
pub fn encode_batch(batch: &[Message]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (idx, message) in batch.iter().enumerate() {
        if idx > 0 {
            out.push(b'\n');
        }
        out.extend_from_slice(message.to_line()?.as_bytes());
    }
    out.push(b'\n');
    Ok(out)
}

/// Parses every stdout line on its own. Lines that are not replies, and
/// replies to ids outside `batch`, are dropped.
pub fn collect_replies(stdout: &str, batch: &[Message]) -> Vec<Reply> {
    let outstanding: HashSet<i64> = batch.iter().map(|m| m.id).collect();
    let mut replies = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match Reply::parse_line(line) {
            Some(reply) if outstanding.contains(&reply.id) => replies.push(reply),
            Some(reply) => log::debug!("dropping reply for unknown id {}", reply.id),
            None => log::debug!("dropping non-reply line: {}", preview(line)),
        }
    }
    replies
}

fn preview(line: &str) -> String {
    const MAX: usize = 120;
    let trimmed = line.trim();
    if trimmed.chars().count() <= MAX {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX).collect();
    out.push('…');
    out
}

/// Spawns the server once per batch.
#[derive(Debug, Clone)]
pub struct ProcessChannel {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessChannel {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![SERVER_SUBCOMMAND.to_string()],
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

async fn write_batch(mut stdin: ChildStdin, payload: &[u8]) -> io::Result<()> {
    stdin.write_all(payload).await?;
    stdin.flush().await?;
    // Dropping stdin closes the pipe so the server sees EOF and exits.
    Ok(())
}

async fn read_all(mut stdout: ChildStdout) -> io::Result<String> {
    let mut buf = Vec::new();
    stdout.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[async_trait]
impl Transport for ProcessChannel {
    async fn exchange(&self, batch: &[Message]) -> Result<Vec<Reply>> {
        let payload = encode_batch(batch)?;
        let started = Instant::now();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ChannelError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;
        log::debug!(
            "spawned {} {} for {} message(s)",
            self.program.display(),
            self.args.join(" "),
            batch.len()
        );

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdout unavailable"))?;

        let session = async {
            let (written, output) = tokio::join!(write_batch(stdin, &payload), read_all(stdout));
            if let Err(err) = written {
                // A server that exits without draining stdin still may have answered.
                if err.kind() != io::ErrorKind::BrokenPipe {
                    return Err(err);
                }
                log::debug!("server closed stdin early: {err}");
            }
            let output = output?;
            let status = child.wait().await?;
            Ok::<(ExitStatus, String), io::Error>((status, output))
        };
        let outcome = tokio::time::timeout(self.timeout, session).await;

        let (status, output) = match outcome {
            Ok(done) => done?,
            Err(_) => {
                if let Err(err) = child.kill().await {
                    log::warn!("failed to kill timed-out server: {err}");
                }
                return Err(ChannelError::Timeout {
                    after: self.timeout,
                });
            }
        };

        if !status.success() {
            log::debug!("server exited with {status}");
        }
        let replies = collect_replies(&output, batch);
        log::debug!(
            "batch finished in {:?}: {} reply line(s) accepted",
            started.elapsed(),
            replies.len()
        );
        Ok(replies)
    }
}
