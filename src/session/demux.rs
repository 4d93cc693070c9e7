//! Output Demultiplexer
//!
//! Single-threaded state machine over raw output chunks. It starts by
//! ignoring everything (the shell banner) until the first prompt, then
//! buffers the text between prompts and emits one frame per prompt.

use crate::protocol::{strip_echo, CONTINUATION_TOKEN, PROMPT_TOKEN};
use crate::shell::StreamChunk;

/// What a chunk completed, if anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemuxEvent {
    /// First prompt seen with no error text: the shell is ready
    Ready,
    /// First prompt seen, but the shell wrote errors before it
    StartupFailed(String),
    /// A prompt closed a frame; the echoed command line is already removed
    Frame {
        text: String,
        stderr: String,
    },
    /// The shell is asking for more input to finish the statement
    Incomplete,
}

/// Prompt-delimited frame accumulator
#[derive(Debug, Default)]
pub struct OutputDemux {
    /// `None` while ignoring the banner
    output: Option<String>,
    errors: String,
}

impl OutputDemux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Go back to ignoring output until the next prompt
    pub fn reset(&mut self) {
        self.output = None;
        self.errors.clear();
    }

    /// Whether the banner has been passed
    pub fn is_buffering(&self) -> bool {
        self.output.is_some()
    }

    /// Text accumulated since the last prompt
    pub fn buffered(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Error text accumulated since the last prompt
    pub fn error_text(&self) -> &str {
        &self.errors
    }

    /// Feed one chunk from either stream
    pub fn feed(&mut self, chunk: &StreamChunk) -> Option<DemuxEvent> {
        match chunk {
            StreamChunk::Stdout(text) => self.feed_stdout(text),
            StreamChunk::Stderr(text) => {
                self.feed_stderr(text);
                None
            }
        }
    }

    /// Feed a stdout chunk
    pub fn feed_stdout(&mut self, text: &str) -> Option<DemuxEvent> {
        if text == PROMPT_TOKEN {
            return Some(self.close_frame());
        }

        if text.starts_with(CONTINUATION_TOKEN) && self.at_line_boundary() {
            self.output = Some(String::new());
            self.errors.clear();
            return Some(DemuxEvent::Incomplete);
        }

        if let Some(output) = self.output.as_mut() {
            output.push_str(text);
        }
        None
    }

    /// Feed a stderr chunk
    pub fn feed_stderr(&mut self, text: &str) {
        self.errors.push_str(text);
    }

    fn at_line_boundary(&self) -> bool {
        self.output
            .as_deref()
            .map(|out| out.is_empty() || out.ends_with('\n'))
            .unwrap_or(false)
    }

    fn close_frame(&mut self) -> DemuxEvent {
        let stderr = std::mem::take(&mut self.errors);
        match self.output.replace(String::new()) {
            Some(frame) => DemuxEvent::Frame {
                text: strip_echo(&frame).to_string(),
                stderr,
            },
            None if stderr.trim().is_empty() => DemuxEvent::Ready,
            None => DemuxEvent::StartupFailed(stderr),
        }
    }
}
