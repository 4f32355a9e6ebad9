// OpenAI Handler
use axum::{
    body::Body,
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{ProxyError, ProxyResult};
use crate::proxy::mappers::aisearch::SUPPORTED_MODELS;
use crate::proxy::mappers::openai::{
    collect_chunks, create_openai_sse_stream, transform_openai_response, ChunkEnvelope, ModelInfo,
    ModelList, OpenAIRequest,
};
use crate::proxy::server::AppState;

pub async fn handle_chat_completions(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ProxyResult<Response> {
    let openai_req: OpenAIRequest = serde_json::from_value(body)
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

    let model = openai_req.model_name();
    let stream = openai_req.is_stream();
    debug!(
        model = %model,
        stream,
        messages = openai_req.messages.len(),
        "Received OpenAI request"
    );

    let envelope = ChunkEnvelope::new(model);
    let chunks = state.translator.translate(openai_req);

    if stream {
        let body = Body::from_stream(create_openai_sse_stream(chunks, envelope));
        return Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
            .map_err(|e| {
                error!("Failed to build SSE response: {}", e);
                ProxyError::InvalidRequest(e.to_string())
            });
    }

    let output = collect_chunks(chunks).await?;
    Ok(Json(transform_openai_response(output, &envelope)).into_response())
}

pub async fn handle_list_models() -> impl IntoResponse {
    let created = chrono::Utc::now().timestamp();
    Json(ModelList {
        object: "list".to_string(),
        data: SUPPORTED_MODELS
            .iter()
            .map(|id| ModelInfo {
                id: id.to_string(),
                object: "model".to_string(),
                created,
                owned_by: "deepseek".to_string(),
            })
            .collect(),
    })
}
