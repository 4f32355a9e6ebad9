// TranslatedChunk -> OpenAI SSE frames

use std::convert::Infallible;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::json;

use super::models::*;
use crate::proxy::mappers::aisearch::TranslatedChunk;

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Per-response envelope fields shared by every chunk of one stream.
#[derive(Debug, Clone)]
pub struct ChunkEnvelope {
    pub id: String,
    pub created: u64,
    pub model: String,
}

impl ChunkEnvelope {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp() as u64,
            model: model.into(),
        }
    }

    fn chunk(&self, delta: Delta) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: None,
            }],
        }
    }

    /// JSON body of one SSE frame.
    pub fn to_json(&self, chunk: &TranslatedChunk) -> serde_json::Value {
        let delta = match chunk {
            TranslatedChunk::Error(e) => return json!({ "error": e.to_string() }),
            TranslatedChunk::Content(content) => Delta {
                content: Some(content.clone()),
                meta: None,
            },
            TranslatedChunk::Meta(meta) => Delta {
                content: None,
                meta: Some(meta.clone()),
            },
        };
        serde_json::to_value(self.chunk(delta)).unwrap_or_else(|_| json!({}))
    }

    pub fn frame(&self, chunk: &TranslatedChunk) -> Bytes {
        Bytes::from(format!("data: {}\n\n", self.to_json(chunk)))
    }
}

/// Frame every chunk as `data: <json>\n\n` and terminate with `[DONE]`.
pub fn create_openai_sse_stream<S>(
    mut chunks: S,
    envelope: ChunkEnvelope,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = TranslatedChunk> + Send + Unpin + 'static,
{
    async_stream::stream! {
        while let Some(chunk) = chunks.next().await {
            yield Ok(envelope.frame(&chunk));
        }
        yield Ok(Bytes::from_static(DONE_FRAME.as_bytes()));
    }
}
