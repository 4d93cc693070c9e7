//! Shell Process Spawning
//!
//! Spawns the shell with piped stdio and bridges the pipes to channels with
//! one task per stream, the same way for stdout and stderr.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::streams::{ShellStreams, StreamChunk, Utf8Decoder};
use crate::error::{Error, Result};
use crate::models::ShellProcess;

/// Shells appended to every candidate list, in order
pub const FALLBACK_SHELLS: [&str; 2] = ["pwsh", "powershell"];

const READ_BUFFER_SIZE: usize = 4096;
const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Process spawning configuration
#[derive(Debug, Clone, Default)]
pub struct SpawnConfig {
    /// Arguments passed to the shell
    pub args: Vec<String>,
    /// Working directory for the shell
    pub working_directory: Option<PathBuf>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
}

/// A spawned shell: its record, the OS child and the bridged streams
pub struct SpawnedShell {
    pub process: ShellProcess,
    pub child: Child,
    pub streams: ShellStreams,
}

/// Candidate shell names: the caller's list followed by the fallbacks
pub fn candidate_shells(additional: &[String]) -> Vec<String> {
    additional
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .chain(FALLBACK_SHELLS.iter().map(|s| s.to_string()))
        .collect()
}

/// Spawn the first candidate that starts successfully
pub fn discover_shell(additional: &[String], config: &SpawnConfig) -> Result<SpawnedShell> {
    let candidates = candidate_shells(additional);

    for shell in &candidates {
        match spawn_shell(shell, config) {
            Ok(spawned) => {
                info!("Using shell '{}' (pid {:?})", shell, spawned.process.pid);
                return Ok(spawned);
            }
            Err(e) => {
                debug!("Shell candidate '{}' unavailable: {}", shell, e);
            }
        }
    }

    Err(Error::ShellNotFound { tried: candidates })
}

/// Spawn a shell with piped stdio
///
/// Must be called from within a tokio runtime.
pub fn spawn_shell(shell: &str, config: &SpawnConfig) -> Result<SpawnedShell> {
    let mut command = Command::new(shell);
    command
        .args(&config.args)
        .envs(&config.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &config.working_directory {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| Error::ShellSpawnFailed {
        shell: shell.to_string(),
        reason: e.to_string(),
    })?;

    let mut process = ShellProcess::new(shell.to_string(), config.args.clone());
    process.mark_started(child.id());

    let stdin = child.stdin.take().ok_or_else(|| Error::ShellSpawnFailed {
        shell: shell.to_string(),
        reason: "stdin was not captured".to_string(),
    })?;
    let stdout = child.stdout.take().ok_or_else(|| Error::ShellSpawnFailed {
        shell: shell.to_string(),
        reason: "stdout was not captured".to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| Error::ShellSpawnFailed {
        shell: shell.to_string(),
        reason: "stderr was not captured".to_string(),
    })?;

    let (output_tx, output_rx) = unbounded_channel::<StreamChunk>();
    let (input_tx, input_rx) = unbounded_channel::<Vec<u8>>();

    tokio::spawn(forward_output(stdout, output_tx.clone(), StreamChunk::Stdout));
    tokio::spawn(forward_output(stderr, output_tx, StreamChunk::Stderr));
    tokio::spawn(forward_input(stdin, input_rx));

    Ok(SpawnedShell {
        process,
        child,
        streams: ShellStreams::from_channels(output_rx, input_tx),
    })
}

/// Read from one output pipe and forward decoded chunks
async fn forward_output<R>(
    mut reader: R,
    tx: UnboundedSender<StreamChunk>,
    wrap: fn(String) -> StreamChunk,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut decoder = Utf8Decoder::new();
    let mut consecutive_errors = 0;

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Shell output EOF");
                break;
            }
            Ok(n) => {
                consecutive_errors = 0;
                let text = decoder.decode(&buf[..n]);
                if text.is_empty() {
                    continue;
                }
                if tx.send(wrap(text)).is_err() {
                    debug!("Shell output receiver dropped, stopping reader");
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                consecutive_errors += 1;
                warn!(
                    "Shell read error ({}): {} (attempt {}/{})",
                    e.kind(),
                    e,
                    consecutive_errors,
                    MAX_CONSECUTIVE_ERRORS
                );
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    error!("Too many consecutive read errors, stopping reader");
                    break;
                }
            }
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(wrap(rest));
    }
}

/// Drain the input channel into the shell stdin
async fn forward_input(mut stdin: ChildStdin, mut rx: UnboundedReceiver<Vec<u8>>) {
    while let Some(data) = rx.recv().await {
        if let Err(e) = stdin.write_all(&data).await {
            warn!("Shell write error ({}): {}", e.kind(), e);
            break;
        }
        if let Err(e) = stdin.flush().await {
            debug!("Shell flush error: {}", e);
        }
    }
    debug!("Shell writer exiting");
}
