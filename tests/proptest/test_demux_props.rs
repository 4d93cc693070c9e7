//! Property-based tests for the output demultiplexer
//!
//! Frames depend only on where the prompts are, never on how the text
//! between them was chunked.

use pwsh_bridge::protocol::{strip_echo, PROMPT_TOKEN};
use pwsh_bridge::session::{DemuxEvent, OutputDemux};
use proptest::prelude::*;

/// Split `text` into chunks of the given character counts, cycling through them
fn chunk(text: &str, sizes: &[usize]) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while start < chars.len() {
        let end = (start + sizes[i % sizes.len()]).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start = end;
        i += 1;
    }
    chunks
}

// No '>' so that no chunk can look like a prompt or a continuation
const BODY: &str = "[a-zA-Z0-9 {}&¬*\":\n]{0,120}";

proptest! {
    #[test]
    fn test_demux_doesnt_panic(chunks in prop::collection::vec("\\PC{0,20}", 0..40)) {
        let mut demux = OutputDemux::new();
        for chunk in &chunks {
            let _ = demux.feed_stdout(chunk);
            demux.feed_stderr(chunk);
        }
    }

    #[test]
    fn test_banner_never_produces_frames(banner in BODY, sizes in prop::collection::vec(1usize..16, 1..8)) {
        let mut demux = OutputDemux::new();
        for piece in chunk(&banner, &sizes) {
            prop_assert_eq!(demux.feed_stdout(&piece), None);
        }
        prop_assert_eq!(demux.feed_stdout(PROMPT_TOKEN), Some(DemuxEvent::Ready));
    }

    #[test]
    fn test_frames_are_chunking_invariant(
        bodies in prop::collection::vec(BODY, 1..6),
        sizes in prop::collection::vec(1usize..16, 1..8),
    ) {
        let mut demux = OutputDemux::new();
        prop_assert_eq!(demux.feed_stdout(PROMPT_TOKEN), Some(DemuxEvent::Ready));

        for body in &bodies {
            for piece in chunk(body, &sizes) {
                prop_assert_eq!(demux.feed_stdout(&piece), None);
            }
            match demux.feed_stdout(PROMPT_TOKEN) {
                Some(DemuxEvent::Frame { text, stderr }) => {
                    prop_assert_eq!(text.as_str(), strip_echo(body));
                    prop_assert!(stderr.is_empty());
                }
                other => prop_assert!(false, "expected a frame, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_stderr_belongs_to_its_frame(
        errors in prop::collection::vec("[a-zA-Z ]{1,30}", 1..6),
    ) {
        let mut demux = OutputDemux::new();
        demux.feed_stdout(PROMPT_TOKEN);

        for error in &errors {
            demux.feed_stdout("&{x}\n");
            demux.feed_stderr(error);
            match demux.feed_stdout(PROMPT_TOKEN) {
                Some(DemuxEvent::Frame { stderr, .. }) => prop_assert_eq!(&stderr, error),
                other => prop_assert!(false, "expected a frame, got {:?}", other),
            }
        }
    }
}
