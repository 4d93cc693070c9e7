//! Shell Streams
//!
//! Bridges the shell's piped stdio to the session driver through channels.
//! Output arrives as [`StreamChunk`]s tagged with the stream they came from;
//! input is handed to a writer task as raw bytes.

use crate::error::{Error, Result};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// One read from the shell's output streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Text read from stdout
    Stdout(String),
    /// Text read from stderr
    Stderr(String),
}

/// Shell I/O streams wrapper
pub struct ShellStreams {
    /// Receiver for output chunks from the shell
    output_rx: UnboundedReceiver<StreamChunk>,
    /// Sender for input bytes to the shell stdin
    input_tx: UnboundedSender<Vec<u8>>,
}

impl ShellStreams {
    /// Create new shell streams from channels
    pub fn from_channels(
        output_rx: UnboundedReceiver<StreamChunk>,
        input_tx: UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            output_rx,
            input_tx,
        }
    }

    /// Create streams together with the far ends of both channels
    ///
    /// The returned sender feeds output into the streams and the returned
    /// receiver observes everything written to the shell. Used to drive a
    /// session without a real process.
    pub fn pair() -> (Self, UnboundedSender<StreamChunk>, UnboundedReceiver<Vec<u8>>) {
        let (output_tx, output_rx) = unbounded_channel();
        let (input_tx, input_rx) = unbounded_channel();
        (Self::from_channels(output_rx, input_tx), output_tx, input_rx)
    }

    /// Write data to the shell stdin
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.input_tx
            .send(data.to_vec())
            .map_err(|e| Error::InputSendFailed {
                reason: e.to_string(),
            })
    }

    /// Wait for the next output chunk; `None` once the shell has gone away
    pub async fn recv(&mut self) -> Option<StreamChunk> {
        self.output_rx.recv().await
    }
}

/// Incremental UTF-8 decoder for pipe reads
///
/// A read can end in the middle of a multi-byte character (the protocol
/// markers are two bytes each), so the incomplete tail is held back until
/// the next read completes it.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` as possible
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is left, replacing an incomplete tail
    pub fn finish(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}
