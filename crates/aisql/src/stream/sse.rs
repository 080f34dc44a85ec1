//! Server-sent event decoding for streamed completions
//!
//! Turns the provider's SSE body into fragments for the reassembler:
//! - Frames events over arbitrary network chunk boundaries
//! - Extracts the text fragment from OpenAI-compatible and DashScope payloads
//! - Surfaces in-band error events as provider errors

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};
use serde_json::Value;
use tracing::trace;

use crate::provider::ProviderError;
use crate::stream::{DeliveryMode, StreamReassembler};

/// Represents a parsed SSE event
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Data event containing the payload
    Data(String),
    /// Terminal [DONE] marker
    Done,
}

/// Parse raw SSE data and extract all events
///
/// SSE format:
/// ```text
/// data: {"json": "content"}
///
/// data: more content
///
/// data: [DONE]
/// ```
///
/// Lines may end in `\n`, `\r\n` or a bare `\r`.
pub fn parse_sse_events(raw: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut current_data = String::new();

    for line in normalize_line_endings(raw).lines() {
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            if data == "[DONE]" {
                if !current_data.is_empty() {
                    events.push(SseEvent::Data(std::mem::take(&mut current_data)));
                }
                events.push(SseEvent::Done);
            } else if !current_data.is_empty() {
                current_data.push('\n');
                current_data.push_str(data);
            } else {
                current_data = data.to_string();
            }
        } else if line.is_empty() && !current_data.is_empty() {
            events.push(SseEvent::Data(std::mem::take(&mut current_data)));
        }
    }

    if !current_data.is_empty() {
        events.push(SseEvent::Data(current_data));
    }

    events
}

fn normalize_line_endings(raw: &str) -> Cow<'_, str> {
    if raw.contains('\r') {
        Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Incremental SSE framer.
///
/// Network chunks do not respect event boundaries, and may split a UTF-8
/// sequence or a `\r\n` pair in two. Line endings are normalized to `\n`
/// as bytes arrive, and bytes are buffered until a blank line closes an event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    /// Prefix of `buffer` already searched for a blank line
    scanned: usize,
    /// Last byte fed was a CR, so a leading LF completes that line ending
    pending_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every event it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.reserve(chunk.len());
        for &byte in chunk {
            match byte {
                b'\n' if self.pending_cr => self.pending_cr = false,
                b'\r' => {
                    self.buffer.put_u8(b'\n');
                    self.pending_cr = true;
                }
                _ => {
                    self.buffer.put_u8(byte);
                    self.pending_cr = false;
                }
            }
        }

        let mut events = Vec::new();
        loop {
            // a boundary can straddle the end of the previous scan
            let start = self.scanned.saturating_sub(1);
            match self.buffer[start..].windows(2).position(|w| w == b"\n\n") {
                Some(pos) => {
                    let block = self.buffer.split_to(start + pos + 2);
                    self.scanned = 0;
                    events.extend(parse_sse_events(&String::from_utf8_lossy(&block)));
                }
                None => {
                    self.scanned = self.buffer.len();
                    break;
                }
            }
        }
        events
    }

    /// Flush whatever is left once the body has ended
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let rest = self.buffer.split();
        self.scanned = 0;
        self.pending_cr = false;
        parse_sse_events(&String::from_utf8_lossy(&rest))
    }
}

/// Text of a message `content` field: a plain string, or the concatenated
/// `text` parts of a multimodal content array.
pub(crate) fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect(),
        ),
        _ => None,
    }
}

/// Extract the text fragment carried by one data event.
///
/// Accepted payloads:
/// ```json
/// {"choices":[{"delta":{"content":"Hello"}}]}
/// {"choices":[{"message":{"content":"Hello"}}]}
/// {"output":{"choices":[{"message":{"content":"Hello"}}]}}
/// {"output":{"text":"Hello"}}
/// ```
/// Returns `Ok(None)` for events without content (role announcements,
/// usage records, non-JSON keep-alives).
pub fn fragment_from_event(data: &str) -> Result<Option<String>, ProviderError> {
    let Ok(value) = serde_json::from_str::<Value>(data) else {
        trace!("skipping non-JSON event: {}", data);
        return Ok(None);
    };

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ProviderError::Stream(message));
    }

    if value.get("output").is_none() && value.get("choices").is_none() {
        if let (Some(code), Some(message)) = (
            value.get("code").and_then(Value::as_str),
            value.get("message").and_then(Value::as_str),
        ) {
            return Err(ProviderError::Stream(format!("{code}: {message}")));
        }
    }

    if let Some(choice) = value.get("choices").and_then(|c| c.get(0)) {
        let content = choice
            .get("delta")
            .and_then(|d| d.get("content"))
            .or_else(|| choice.get("message").and_then(|m| m.get("content")));
        return Ok(content.and_then(content_text));
    }

    let Some(output) = value.get("output") else {
        return Ok(None);
    };

    if let Some(content) = output
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
    {
        return Ok(content_text(content));
    }

    Ok(output.get("text").and_then(Value::as_str).map(str::to_string))
}

/// Reassembled content from a complete SSE capture
#[derive(Debug, Clone)]
pub struct ReassembledContent {
    /// The reassembled completion text
    pub content: String,
    /// Whether the stream completed with [DONE]
    pub is_complete: bool,
    /// Number of events parsed
    pub event_count: usize,
    /// How the upstream delivered its fragments
    pub mode: DeliveryMode,
}

/// Reassemble the completion text from a buffered SSE body
pub fn reassemble_sse(raw: &str) -> Result<ReassembledContent, ProviderError> {
    let events = parse_sse_events(raw);
    let mut reassembler = StreamReassembler::new();

    for event in &events {
        if let SseEvent::Data(data) = event {
            if let Some(fragment) = fragment_from_event(data)? {
                reassembler.push(&fragment);
            }
        }
    }

    Ok(ReassembledContent {
        is_complete: events.iter().any(|e| matches!(e, SseEvent::Done)),
        event_count: events.len(),
        mode: reassembler.mode(),
        content: reassembler.into_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_events_basic() {
        let raw = r#"data: {"text":"Hello"}

data: {"text":" world"}

data: [DONE]
"#;

        let events = parse_sse_events(raw);

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SseEvent::Data(r#"{"text":"Hello"}"#.to_string()));
        assert_eq!(events[1], SseEvent::Data(r#"{"text":" world"}"#.to_string()));
        assert_eq!(events[2], SseEvent::Done);
    }

    #[test]
    fn test_parse_sse_with_comments_and_fields() {
        let raw = ": keep-alive\nid: 1\nevent: result\ndata:{\"a\":1}\n\n: another\ndata: [DONE]\n";

        let events = parse_sse_events(raw);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SseEvent::Data(r#"{"a":1}"#.to_string()));
        assert_eq!(events[1], SseEvent::Done);
    }

    #[test]
    fn test_parse_sse_no_trailing_newline() {
        let events = parse_sse_events("data: {\"text\":\"test\"}");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], SseEvent::Data(r#"{"text":"test"}"#.to_string()));
    }

    #[test]
    fn test_decoder_waits_for_blank_line() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(b"data: {\"a\"").is_empty());
        assert!(decoder.feed(b":1}\n").is_empty());

        let events = decoder.feed(b"\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data(r#"{"a":1}"#.to_string()), SseEvent::Done]
        );
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_decoder_handles_crlf_and_split_utf8() {
        let body = "data: {\"t\":\"人工智能\"}\r\n\r\n".as_bytes();
        // split inside the first multi-byte character
        let split = body.iter().position(|b| *b >= 0x80).unwrap() + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&body[..split]).is_empty());
        let events = decoder.feed(&body[split..]);

        assert_eq!(events, vec![SseEvent::Data(r#"{"t":"人工智能"}"#.to_string())]);
    }

    #[test]
    fn test_decoder_bare_cr_line_endings() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.feed(b"data: a\r\rdata: b\r\r");
        events.extend(decoder.finish());

        assert_eq!(
            events,
            vec![SseEvent::Data("a".to_string()), SseEvent::Data("b".to_string())]
        );
    }

    #[test]
    fn test_decoder_crlf_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: a\r").is_empty());
        assert_eq!(decoder.feed(b"\n\r"), vec![SseEvent::Data("a".to_string())]);
        assert_eq!(
            decoder.feed(b"\ndata: b\r\n\r\n"),
            vec![SseEvent::Data("b".to_string())]
        );
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_decoder_resumes_scan_where_it_stopped() {
        let body = format!("data: {}\n\n", "x".repeat(512));
        let mut decoder = SseDecoder::new();

        let mut events = Vec::new();
        for byte in body.as_bytes() {
            events.extend(decoder.feed(std::slice::from_ref(byte)));
            assert_eq!(decoder.scanned, decoder.buffer.len());
        }

        assert_eq!(events, vec![SseEvent::Data("x".repeat(512))]);
        assert!(decoder.buffer.is_empty());
    }

    #[test]
    fn test_done_after_pending_data_line() {
        let events = parse_sse_events("data: tail\ndata: [DONE]\n");
        assert_eq!(events, vec![SseEvent::Data("tail".to_string()), SseEvent::Done]);

        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"a\":1}\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data(r#"{"a":1}"#.to_string()), SseEvent::Done]
        );
    }

    #[test]
    fn test_parse_sse_bare_cr() {
        let events = parse_sse_events("data: a\r\rdata: b\r\rdata: [DONE]\r");
        assert_eq!(
            events,
            vec![
                SseEvent::Data("a".to_string()),
                SseEvent::Data("b".to_string()),
                SseEvent::Done
            ]
        );
    }

    #[test]
    fn test_decoder_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec![SseEvent::Data("tail".to_string())]);
    }

    #[test]
    fn test_fragment_openai_delta() {
        let json = r#"{"id":"chatcmpl-123","choices":[{"index":0,"delta":{"content":"test"}}]}"#;
        assert_eq!(fragment_from_event(json).unwrap(), Some("test".to_string()));
    }

    #[test]
    fn test_fragment_role_only_delta() {
        let json = r#"{"id":"chatcmpl-123","choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(fragment_from_event(json).unwrap(), None);
    }

    #[test]
    fn test_fragment_dashscope_native() {
        let json = r#"{"output":{"choices":[{"message":{"role":"assistant","content":"你好"},"finish_reason":"null"}]},"request_id":"r1"}"#;
        assert_eq!(fragment_from_event(json).unwrap(), Some("你好".to_string()));

        let json = r#"{"output":{"text":"你好","finish_reason":"null"}}"#;
        assert_eq!(fragment_from_event(json).unwrap(), Some("你好".to_string()));
    }

    #[test]
    fn test_fragment_multimodal_content_parts() {
        let json = r#"{"output":{"choices":[{"message":{"content":[{"text":"一只"},{"text":"猫"}]}}]}}"#;
        assert_eq!(fragment_from_event(json).unwrap(), Some("一只猫".to_string()));
    }

    #[test]
    fn test_fragment_usage_record_has_no_content() {
        let json = r#"{"choices":[],"usage":{"total_tokens":12}}"#;
        assert_eq!(fragment_from_event(json).unwrap(), None);
    }

    #[test]
    fn test_fragment_in_band_errors() {
        let err = fragment_from_event(r#"{"error":{"message":"quota exceeded"}}"#).unwrap_err();
        assert_eq!(err.to_string(), "Stream error: quota exceeded");

        let err = fragment_from_event(
            r#"{"code":"InvalidApiKey","message":"Invalid API-key provided.","request_id":"r1"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("InvalidApiKey"));
    }

    #[test]
    fn test_reassemble_sse_incremental() {
        let raw = r#"data: {"id":"1","choices":[{"index":0,"delta":{"role":"assistant"}}]}

data: {"id":"1","choices":[{"index":0,"delta":{"content":"Hello"}}]}

data: {"id":"1","choices":[{"index":0,"delta":{"content":" World"}}]}

data: [DONE]
"#;

        let reassembled = reassemble_sse(raw).unwrap();

        assert_eq!(reassembled.content, "Hello World");
        assert!(reassembled.is_complete);
        assert_eq!(reassembled.event_count, 4);
        assert_eq!(reassembled.mode, DeliveryMode::Incremental);
    }

    #[test]
    fn test_reassemble_sse_cumulative() {
        let raw = r#"data: {"output":{"choices":[{"message":{"content":"人工智能"}}]}}

data: {"output":{"choices":[{"message":{"content":"人工智能是计算机科学"}}]}}

data: {"output":{"choices":[{"message":{"content":"人工智能是计算机科学的一个分支。"}}]}}
"#;

        let reassembled = reassemble_sse(raw).unwrap();

        assert_eq!(reassembled.content, "人工智能是计算机科学的一个分支。");
        assert!(!reassembled.is_complete);
        assert_eq!(reassembled.mode, DeliveryMode::Cumulative);
    }
}
