// AI search streaming translation (upstream `data:` lines -> TranslatedChunk)
// Corresponds to LineDecoder + ThinkingState + StreamingState

use bytes::BytesMut;
use serde_json::Value;

use super::card::render_card;
use super::models::{AnswerEvent, ContentType};
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::mappers::openai::ConversationMeta;

pub const DATA_PREFIX: &str = "data:";

const THINK_OPEN: &[&str] = &["<think>\n\n"];
const THINK_CLOSE: &[&str] = &["\n", "</think>", "\n\n"];
const NO_FRAMING: &[&str] = &[];

/// One unit of translator output.
#[derive(Debug)]
pub enum TranslatedChunk {
    Content(String),
    Meta(ConversationMeta),
    /// Terminal: nothing follows an error.
    Error(ProxyError),
}

impl TranslatedChunk {
    pub fn content(s: impl Into<String>) -> Self {
        TranslatedChunk::Content(s.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TranslatedChunk::Error(_))
    }
}

/// Splits an arbitrarily chunked byte stream into complete lines.
///
/// Lines are cut on the raw `\n` byte before decoding, so a multi-byte
/// character split across reads is reassembled intact. A trailing partial
/// line is held until more bytes arrive.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// Prefix of `buffer` already known to contain no `\n`.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            let line_raw = self.buffer.split_to(pos + 1);
            let line = &line_raw[..pos];
            lines.push(String::from_utf8_lossy(line).into_owned());
            self.scanned = 0;
        }
        self.scanned = self.buffer.len();
        lines
    }

    /// Bytes of the incomplete trailing line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Position inside the reasoning block. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingState {
    NotStarted,
    Open,
    Closed,
}

impl ThinkingState {
    /// Next state for an incoming content type and the framing chunks to emit
    /// before the event's own content.
    pub fn advance(self, content_type: ContentType) -> (Self, &'static [&'static str]) {
        match (self, content_type) {
            (ThinkingState::NotStarted, ContentType::Thinking) => (ThinkingState::Open, THINK_OPEN),
            (ThinkingState::Open, ContentType::Text) => (ThinkingState::Closed, THINK_CLOSE),
            (state, _) => (state, NO_FRAMING),
        }
    }
}

/// Streaming State Machine
pub struct StreamingState {
    thinking: ThinkingState,
    cards: Vec<String>,
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingState {
    pub fn new() -> Self {
        Self {
            thinking: ThinkingState::NotStarted,
            cards: Vec::new(),
        }
    }

    pub fn thinking(&self) -> ThinkingState {
        self.thinking
    }

    /// Process one complete line. Lines without the `data:` prefix produce
    /// nothing; a malformed payload is a terminal error.
    pub fn process_line(&mut self, line: &str) -> ProxyResult<Vec<TranslatedChunk>> {
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Ok(Vec::new());
        };

        let value: Value = serde_json::from_str(payload)
            .map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;

        match AnswerEvent::from_value(&value) {
            Some(event) => self.process_answer(event),
            None => Ok(Vec::new()),
        }
    }

    fn process_answer(&mut self, event: AnswerEvent) -> ProxyResult<Vec<TranslatedChunk>> {
        let mut chunks = Vec::new();

        let (next, framing) = self.thinking.advance(event.content_type);
        self.thinking = next;
        chunks.extend(framing.iter().map(|s| TranslatedChunk::content(*s)));

        match event.content_type {
            ContentType::Card => {
                let raw = event.content.as_deref().unwrap_or("null");
                self.cards.push(render_card(raw)?);
            }
            ContentType::Text | ContentType::Thinking => {
                if let Some(content) = event.content.filter(|c| !c.is_empty()) {
                    chunks.push(TranslatedChunk::Content(content));
                }
            }
            ContentType::Other => {}
        }

        Ok(chunks)
    }

    /// Chunks emitted after a clean upstream close: buffered cards (if any)
    /// then the metadata chunk.
    pub fn finish(self, meta: ConversationMeta) -> Vec<TranslatedChunk> {
        let mut chunks = Vec::new();
        if !self.cards.is_empty() {
            chunks.push(TranslatedChunk::Content(self.cards.concat()));
        }
        chunks.push(TranslatedChunk::Meta(meta));
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_line(v: Value) -> String {
        format!("data:{}", v)
    }

    fn contents(chunks: &[TranslatedChunk]) -> Vec<String> {
        chunks
            .iter()
            .filter_map(|c| match c {
                TranslatedChunk::Content(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn meta() -> ConversationMeta {
        ConversationMeta {
            device_id: "dev".into(),
            conversation_id: "conv".into(),
        }
    }

    #[test]
    fn test_line_decoder_holds_partial_line() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data:{\"a\"").is_empty());
        assert_eq!(decoder.pending(), 9);
        let lines = decoder.push(b":1}\ndata:{}\nrest");
        assert_eq!(lines, vec!["data:{\"a\":1}", "data:{}"]);
        assert_eq!(decoder.pending(), 4);
    }

    #[test]
    fn test_line_decoder_multibyte_split() {
        let text = "data:{\"content\":\"你好\"}\n";
        let bytes = text.as_bytes();
        // split inside the first CJK character
        let cut = text.find('你').unwrap() + 1;

        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&bytes[..cut]).is_empty());
        let lines = decoder.push(&bytes[cut..]);
        assert_eq!(lines, vec!["data:{\"content\":\"你好\"}"]);
    }

    #[test]
    fn test_line_decoder_resumes_scan_after_partial_reads() {
        let mut decoder = LineDecoder::new();
        for _ in 0..1000 {
            assert!(decoder.push(b"ab").is_empty());
        }
        assert_eq!(decoder.scanned, 2000);
        let lines = decoder.push(b"c\nnext");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 2001);
        assert!(lines[0].ends_with("abc"));
        assert_eq!(decoder.pending(), 4);
        assert_eq!(decoder.scanned, 4);
        assert_eq!(decoder.push(b"\n"), vec!["next"]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_line_decoder_byte_at_a_time() {
        let text = "event: x\ndata:{\"k\":\"é\"}\n\n";
        let mut decoder = LineDecoder::new();
        let mut lines = Vec::new();
        for b in text.as_bytes() {
            lines.extend(decoder.push(std::slice::from_ref(b)));
        }
        assert_eq!(lines, vec!["event: x", "data:{\"k\":\"é\"}", ""]);
    }

    #[test]
    fn test_thinking_transitions() {
        use ContentType::*;
        let s = ThinkingState::NotStarted;
        assert_eq!(s.advance(Text), (ThinkingState::NotStarted, &[][..]));
        let (s, framing) = s.advance(Thinking);
        assert_eq!(s, ThinkingState::Open);
        assert_eq!(framing, &["<think>\n\n"]);
        assert_eq!(s.advance(Thinking).0, ThinkingState::Open);
        let (s, framing) = s.advance(Text);
        assert_eq!(s, ThinkingState::Closed);
        assert_eq!(framing, &["\n", "</think>", "\n\n"]);
        assert_eq!(s.advance(Thinking), (ThinkingState::Closed, &[][..]));
    }

    #[test]
    fn test_thinking_then_text_sequence() {
        let mut state = StreamingState::new();
        let mut out = Vec::new();
        for v in [
            json!({"type": "answer", "content_type": "thinking", "content": "let me see"}),
            json!({"type": "answer", "content_type": "thinking", "content": " more"}),
            json!({"type": "answer", "content_type": "text", "content": "Answer"}),
            json!({"type": "answer", "content_type": "text", "content": "!"}),
        ] {
            out.extend(state.process_line(&data_line(v)).unwrap());
        }
        out.extend(state.finish(meta()));

        assert_eq!(
            contents(&out),
            vec!["<think>\n\n", "let me see", " more", "\n", "</think>", "\n\n", "Answer", "!"]
        );
        assert!(matches!(out.last(), Some(TranslatedChunk::Meta(m)) if m == &meta()));
    }

    #[test]
    fn test_framing_emitted_at_most_once() {
        let mut state = StreamingState::new();
        let mut out = Vec::new();
        for ct in ["text", "thinking", "text", "thinking", "text", "thinking"] {
            let line = data_line(json!({"type": "answer", "content_type": ct, "content": "x"}));
            out.extend(state.process_line(&line).unwrap());
        }
        let all = contents(&out);
        assert_eq!(all.iter().filter(|c| *c == "<think>\n\n").count(), 1);
        assert_eq!(all.iter().filter(|c| *c == "</think>").count(), 1);
        let open = all.iter().position(|c| c == "<think>\n\n").unwrap();
        let close = all.iter().position(|c| c == "</think>").unwrap();
        assert!(open < close);
    }

    #[test]
    fn test_ignores_non_data_and_non_answer_lines() {
        let mut state = StreamingState::new();
        assert!(state.process_line("").unwrap().is_empty());
        assert!(state.process_line("event: message").unwrap().is_empty());
        assert!(state.process_line(": keepalive").unwrap().is_empty());
        let line = data_line(json!({"type": "follow_up", "content": "x"}));
        assert!(state.process_line(&line).unwrap().is_empty());
        let line = data_line(json!({"type": "answer", "content_type": "text", "content": ""}));
        assert!(state.process_line(&line).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_data_line() {
        let mut state = StreamingState::new();
        let err = state.process_line("data:{oops").err().unwrap();
        assert!(err.to_string().starts_with("JSONDecodeError: "));
    }

    #[test]
    fn test_cards_are_deferred_and_concatenated() {
        let card = json!({"cardInfo": {"cardItems": [
            {"type": "2002", "content": "[]"}
        ]}})
        .to_string();

        let mut state = StreamingState::new();
        let line = data_line(json!({"type": "answer", "content_type": "card", "content": card}));
        assert!(state.process_line(&line).unwrap().is_empty());
        assert!(state.process_line(&line).unwrap().is_empty());
        let text = data_line(json!({"type": "answer", "content_type": "text", "content": "hi"}));
        assert_eq!(contents(&state.process_line(&text).unwrap()), vec!["hi"]);

        let tail = state.finish(meta());
        assert_eq!(tail.len(), 2);
        let one = "\n\n---\n\nFound 0 search results:\n";
        assert!(matches!(&tail[0], TranslatedChunk::Content(s) if s == &format!("{one}{one}")));
        assert!(matches!(&tail[1], TranslatedChunk::Meta(_)));
    }

    #[test]
    fn test_finish_without_cards_is_meta_only() {
        let tail = StreamingState::new().finish(meta());
        assert_eq!(tail.len(), 1);
        assert!(matches!(&tail[0], TranslatedChunk::Meta(_)));
    }
}
