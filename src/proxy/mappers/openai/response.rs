// TranslatedChunk stream -> aggregated chat.completion

use futures::{Stream, StreamExt};

use super::models::*;
use super::streaming::ChunkEnvelope;
use crate::error::ProxyResult;
use crate::proxy::mappers::aisearch::TranslatedChunk;

/// Separator between reasoning and final answer in the concatenated output.
///
/// Positional heuristic kept for client compatibility: if the answer itself
/// contains three consecutive newlines the split lands in the wrong place.
pub const REASONING_SEPARATOR: &str = "\n\n\n";

#[derive(Debug, Default)]
pub struct AggregatedOutput {
    pub content: String,
    pub meta: Option<ConversationMeta>,
}

/// Drain the translator output. The first error chunk aborts aggregation.
pub async fn collect_chunks<S>(mut chunks: S) -> ProxyResult<AggregatedOutput>
where
    S: Stream<Item = TranslatedChunk> + Unpin,
{
    let mut out = AggregatedOutput::default();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            TranslatedChunk::Content(s) => out.content.push_str(&s),
            TranslatedChunk::Meta(meta) => out.meta = Some(meta),
            TranslatedChunk::Error(e) => return Err(e),
        }
    }
    Ok(out)
}

/// `(reasoning_content, content)`; everything is reasoning when the
/// separator is absent.
pub fn split_reasoning(content: &str) -> (String, String) {
    let mut parts = content.splitn(2, REASONING_SEPARATOR);
    let reasoning = parts.next().unwrap_or_default().to_string();
    let answer = parts.next().unwrap_or_default().to_string();
    (reasoning, answer)
}

pub fn transform_openai_response(output: AggregatedOutput, envelope: &ChunkEnvelope) -> OpenAIResponse {
    let (reasoning_content, content) = split_reasoning(&output.content);

    OpenAIResponse {
        id: envelope.id.clone(),
        object: "chat.completion".to_string(),
        created: envelope.created,
        model: envelope.model.clone(),
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: "assistant".to_string(),
                reasoning_content,
                content,
                meta: output.meta,
            },
            finish_reason: Some("stop".to_string()),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyError;

    #[test]
    fn test_split_reasoning() {
        assert_eq!(
            split_reasoning("thinking\n\n\nanswer"),
            ("thinking".to_string(), "answer".to_string())
        );
        assert_eq!(
            split_reasoning("a\n\n\nb\n\n\nc"),
            ("a".to_string(), "b\n\n\nc".to_string())
        );
        assert_eq!(split_reasoning("no separator"), ("no separator".to_string(), String::new()));
        assert_eq!(split_reasoning(""), (String::new(), String::new()));
    }

    #[test]
    fn test_collect_and_transform() {
        let chunks = futures::stream::iter(vec![
            TranslatedChunk::content("<think>\n\n"),
            TranslatedChunk::content("hmm\n"),
            TranslatedChunk::content("\n\n"),
            TranslatedChunk::content("done"),
            TranslatedChunk::Meta(ConversationMeta {
                device_id: "d".into(),
                conversation_id: "c".into(),
            }),
        ]);
        let output = futures::executor::block_on(collect_chunks(chunks)).unwrap();
        assert_eq!(output.content, "<think>\n\nhmm\n\n\ndone");

        let resp = transform_openai_response(output, &ChunkEnvelope::new("deepseek-r1"));
        assert_eq!(resp.object, "chat.completion");
        assert_eq!(resp.model, "deepseek-r1");
        let msg = &resp.choices[0].message;
        assert_eq!(msg.reasoning_content, "<think>\n\nhmm");
        assert_eq!(msg.content, "done");
        assert_eq!(msg.meta.as_ref().unwrap().conversation_id, "c");
        assert_eq!(resp.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_collect_stops_on_error() {
        let chunks = futures::stream::iter(vec![
            TranslatedChunk::content("partial"),
            TranslatedChunk::Error(ProxyError::UpstreamParse("bad".into())),
        ]);
        let err = futures::executor::block_on(collect_chunks(chunks)).unwrap_err();
        assert_eq!(err.to_string(), "JSONDecodeError: bad");
    }
}
