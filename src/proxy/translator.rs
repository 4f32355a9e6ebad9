// Stream translator
// OpenAI request -> session ids -> conversation -> upstream chat stream -> TranslatedChunk

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::error::{ProxyError, ProxyResult};
use crate::proxy::config::ProxyConfig;
use crate::proxy::mappers::aisearch::{
    build_chat_payload, resolve_model_route, validate_model, LineDecoder, StreamingState,
    TranslatedChunk,
};
use crate::proxy::mappers::openai::{ConversationMeta, OpenAIRequest};
use crate::proxy::session_manager::SessionManager;
use crate::proxy::upstream::client::UpstreamClient;

/// Runs one translation per request on its own task and hands the chunks to
/// the HTTP layer through a bounded channel.
pub struct Translator {
    sessions: Arc<SessionManager>,
    upstream: Arc<UpstreamClient>,
    reuse_conversation: bool,
    idle_read_timeout: Duration,
    channel_capacity: usize,
}

impl Translator {
    pub fn new(
        config: &ProxyConfig,
        sessions: Arc<SessionManager>,
        upstream: Arc<UpstreamClient>,
    ) -> Self {
        Self {
            sessions,
            upstream,
            reuse_conversation: config.reuse_conversation,
            idle_read_timeout: Duration::from_secs(config.idle_read_timeout.max(1)),
            channel_capacity: config.channel_capacity.max(1),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Start translating `request`. The stream ends after the metadata chunk
    /// or after the first error chunk. Dropping it stops the producer and
    /// releases the upstream connection.
    pub fn translate(self: &Arc<Self>, request: OpenAIRequest) -> ReceiverStream<TranslatedChunk> {
        self.spawn(request).0
    }

    /// Like [`Translator::translate`], also returning the producer task.
    pub fn spawn(
        self: &Arc<Self>,
        request: OpenAIRequest,
    ) -> (ReceiverStream<TranslatedChunk>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let translator = Arc::clone(self);

        let handle = tokio::spawn(async move {
            if let Err(e) = translator.produce(&request, &tx).await {
                warn!(error = %e, "Translation ended with error");
                let _ = tx.send(TranslatedChunk::Error(e)).await;
            }
        });

        (ReceiverStream::new(rx), handle)
    }

    /// Await an upstream step, bounded by the idle timeout and abandoned as
    /// soon as the consumer goes away (`Ok(None)`).
    async fn guarded<T, F>(
        &self,
        tx: &mpsc::Sender<TranslatedChunk>,
        step: F,
    ) -> ProxyResult<Option<T>>
    where
        F: Future<Output = ProxyResult<T>>,
    {
        tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!("Client disconnected, stopping translation");
                Ok(None)
            }
            res = tokio::time::timeout(self.idle_read_timeout, step) => match res {
                Ok(out) => out.map(Some),
                Err(_) => Err(ProxyError::IdleTimeout(self.idle_read_timeout.as_secs())),
            }
        }
    }

    async fn produce(
        &self,
        request: &OpenAIRequest,
        tx: &mpsc::Sender<TranslatedChunk>,
    ) -> ProxyResult<()> {
        let model = request.model_name();
        validate_model(&model)?;

        let ids = self.sessions.get_or_create_ids(false).await;
        let conversation_id = match ids.conversation_id.filter(|_| self.reuse_conversation) {
            Some(id) => id,
            None => {
                let id = self.upstream.create_conversation(&ids.device_id).await?;
                if self.reuse_conversation {
                    self.sessions.record_conversation(&ids.device_id, &id).await;
                }
                id
            }
        };

        let route = resolve_model_route(&model);
        let payload = build_chat_payload(&route, &conversation_id, &request.messages);
        info!(
            model = %model,
            upstream_model = %route.transport_model,
            user_action = %route.user_action,
            "Opening upstream chat stream"
        );

        let open = self.upstream.open_chat_stream(&ids.device_id, &payload);
        let Some(response) = self.guarded(tx, open).await? else {
            return Ok(());
        };
        let mut body = Box::pin(response.bytes_stream());
        let mut decoder = LineDecoder::new();
        let mut state = StreamingState::new();

        loop {
            let read = async { Ok::<_, ProxyError>(body.next().await) };
            let Some(next) = self.guarded(tx, read).await? else {
                return Ok(());
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| ProxyError::network(&e))?;

            for line in decoder.push(&chunk) {
                for out in state.process_line(&line)? {
                    if !emit(tx, out).await {
                        return Ok(());
                    }
                }
            }
        }

        if decoder.pending() > 0 {
            debug!(bytes = decoder.pending(), "Discarding unterminated trailing line");
        }

        let meta = ConversationMeta {
            device_id: ids.device_id,
            conversation_id,
        };
        for out in state.finish(meta) {
            if !emit(tx, out).await {
                return Ok(());
            }
        }
        Ok(())
    }
}

/// `false` once the consumer is gone.
async fn emit(tx: &mpsc::Sender<TranslatedChunk>, chunk: TranslatedChunk) -> bool {
    if tx.send(chunk).await.is_err() {
        debug!("Client disconnected, stopping translation");
        return false;
    }
    true
}
