//! SSE (Server-Sent Events) stream decoding for the agent chat endpoint.
//!
//! The backend streams its response as newline-delimited blocks over a
//! chunked HTTP POST body. A block carries an event iff it starts with the
//! exact prefix `data: `; the remainder of the block is one JSON document
//! tagged by a `type` field:
//!
//! ```text
//! data: {"type":"token","content":"Hello"}
//!
//! data: {"type":"done"}
//! ```
//!
//! Blank lines, comments and any other prefix are ignored. A `data:` block
//! whose payload is not valid JSON is skipped without aborting the stream.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Source, ToolCallInfo};

/// The exact prefix that marks a data block. Anything else is ignored.
const DATA_PREFIX: &str = "data: ";

/// Typed events carried by the chat stream, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental text fragment for the in-flight assistant message
    Token { content: String },
    /// Full, final list of retrieval citations (replaces, not appends)
    Sources {
        #[serde(default)]
        sources: Vec<Source>,
    },
    /// Full, final list of tool invocations for the in-flight message
    ToolCalls {
        #[serde(default)]
        tool_calls: Vec<ToolCallInfo>,
    },
    /// Server-assigned conversation identifier, typically before the first token
    ConversationId { conversation_id: String },
    /// Recoverable application-level failure; does not terminate the transport
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// End of one assistant turn
    Done,
    /// Any unrecognized `type` value, ignored by consumers
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Event type name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Token { .. } => "token",
            StreamEvent::Sources { .. } => "sources",
            StreamEvent::ToolCalls { .. } => "tool_calls",
            StreamEvent::ConversationId { .. } => "conversation_id",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done => "done",
            StreamEvent::Unknown => "unknown",
        }
    }
}

/// Incremental decoder from network chunks to [`StreamEvent`]s.
///
/// A frame boundary is a newline, never a read boundary: a chunk may end
/// mid-line (even mid-UTF-8-sequence), so incomplete trailing bytes are kept
/// and re-split when the next chunk arrives. Feeding the same logical stream
/// split at any byte offsets yields the same event sequence.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning all events completed by it in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&line[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that arrived without a terminating newline.
    ///
    /// Call once after the underlying read reports completion.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line)
    }
}

/// Decode one line (without its newline) into an event, if it carries one.
///
/// Non-`data:` lines and malformed payloads yield `None`; the caller keeps
/// reading either way.
fn decode_line(line: &[u8]) -> Option<StreamEvent> {
    let line = match std::str::from_utf8(line) {
        Ok(s) => s.trim_end_matches('\r'),
        Err(_) => {
            debug!("skipping non-UTF-8 stream line");
            return None;
        }
    };

    let payload = line.strip_prefix(DATA_PREFIX)?;

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(error = %err, "skipping malformed stream frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = decoder.feed(bytes);
        events.extend(decoder.finish());
        events
    }

    // Event decoding

    #[test]
    fn test_decode_token_event() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"token","content":"Hello"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Token {
                content: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_decode_sources_event() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"sources","sources":[{"document_name":"faq.pdf","content_snippet":"...","score":0.87}]}"#,
        )
        .unwrap();
        match event {
            StreamEvent::Sources { sources } => {
                assert_eq!(sources.len(), 1);
                assert_eq!(sources[0].document_name, "faq.pdf");
            }
            other => panic!("expected sources event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_sources_event_defaults_to_empty() {
        // Defensive: the array field may be absent entirely
        let event: StreamEvent = serde_json::from_str(r#"{"type":"sources"}"#).unwrap();
        assert_eq!(event, StreamEvent::Sources { sources: vec![] });
    }

    #[test]
    fn test_decode_tool_calls_event() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"tool_calls","tool_calls":[{"tool_name":"rag_query","reasoning":"lookup"}]}"#,
        )
        .unwrap();
        match event {
            StreamEvent::ToolCalls { tool_calls } => {
                assert_eq!(tool_calls[0].tool_name, "rag_query");
            }
            other => panic!("expected tool_calls event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_conversation_id_event() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"conversation_id","conversation_id":"c1"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::ConversationId {
                conversation_id: "c1".to_string()
            }
        );
    }

    #[test]
    fn test_decode_error_event_without_message() {
        let event: StreamEvent = serde_json::from_str(r#"{"type":"error"}"#).unwrap();
        assert_eq!(event, StreamEvent::Error { message: None });
    }

    #[test]
    fn test_decode_done_event() {
        let event: StreamEvent = serde_json::from_str(r#"{"type":"done"}"#).unwrap();
        assert_eq!(event, StreamEvent::Done);
    }

    #[test]
    fn test_decode_unknown_event_type() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"heartbeat","ts":123}"#).unwrap();
        assert_eq!(event, StreamEvent::Unknown);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(StreamEvent::Done.name(), "done");
        assert_eq!(StreamEvent::Unknown.name(), "unknown");
        assert_eq!(
            StreamEvent::Token {
                content: String::new()
            }
            .name(),
            "token"
        );
    }

    // Frame decoding

    #[test]
    fn test_single_frame() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(b"data: {\"type\":\"token\",\"content\":\"a\"}\n\n");
        assert_eq!(
            events,
            vec![StreamEvent::Token {
                content: "a".to_string()
            }]
        );
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut decoder = FrameDecoder::new();
        let stream = b": keep-alive\nevent: message\n\ndata: {\"type\":\"done\"}\n\n";
        let events = decoder.feed(stream);
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn test_prefix_must_match_exactly() {
        // No space after the colon: not a data block
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(b"data:{\"type\":\"done\"}\n\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_malformed_frame_skipped() {
        let mut decoder = FrameDecoder::new();
        let stream = b"data: {\"type\":\"token\",\"content\":\"a\"}\n\ndata: {not json}\n\ndata: {\"type\":\"token\",\"content\":\"b\"}\n\n";
        let events = decoder.feed(stream);
        assert_eq!(
            events,
            vec![
                StreamEvent::Token {
                    content: "a".to_string()
                },
                StreamEvent::Token {
                    content: "b".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(b"data: {\"type\":\"done\"}\r\n\r\n");
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"token\",").is_empty());
        let events = decoder.feed(b"\"content\":\"hi\"}\n\n");
        assert_eq!(
            events,
            vec![StreamEvent::Token {
                content: "hi".to_string()
            }]
        );
    }

    #[test]
    fn test_finish_flushes_unterminated_tail() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder
            .feed(b"data: {\"type\":\"token\",\"content\":\"tail\"}")
            .is_empty());
        assert_eq!(
            decoder.finish(),
            Some(StreamEvent::Token {
                content: "tail".to_string()
            })
        );
        // Second finish is a no-op
        assert_eq!(decoder.finish(), None);
    }

    /// Splitting the logical stream at any byte offset must not change the
    /// decoded event sequence, even when the split lands inside a multi-byte
    /// UTF-8 sequence.
    #[test]
    fn test_chunking_independence() {
        let stream = "data: {\"type\":\"conversation_id\",\"conversation_id\":\"c1\"}\n\n\
                      data: {\"type\":\"token\",\"content\":\"退貨政策 \"}\n\n\
                      data: {\"type\":\"token\",\"content\":\"is 30 days.\"}\n\n\
                      data: {\"type\":\"done\"}\n\n"
            .as_bytes();

        let expected = feed_all(&mut FrameDecoder::new(), stream);
        assert_eq!(expected.len(), 4);

        for split in 1..stream.len() {
            let mut decoder = FrameDecoder::new();
            let mut events = decoder.feed(&stream[..split]);
            events.extend(decoder.feed(&stream[split..]));
            events.extend(decoder.finish());
            assert_eq!(events, expected, "split at byte {} diverged", split);
        }
    }

    #[test]
    fn test_byte_at_a_time_delivery() {
        let stream = b"data: {\"type\":\"token\",\"content\":\"ab\"}\n\ndata: {\"type\":\"done\"}\n\n";

        let mut decoder = FrameDecoder::new();
        let mut events = Vec::new();
        for byte in stream.iter() {
            events.extend(decoder.feed(std::slice::from_ref(byte)));
        }
        events.extend(decoder.finish());

        assert_eq!(
            events,
            vec![
                StreamEvent::Token {
                    content: "ab".to_string()
                },
                StreamEvent::Done,
            ]
        );
    }
}
