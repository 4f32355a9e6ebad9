#![allow(dead_code)]

use std::sync::Arc;

use aisearch_proxy_lib::proxy::mappers::aisearch::TranslatedChunk;
use aisearch_proxy_lib::proxy::{ProxyConfig, SessionManager, Translator, UpstreamClient};
use serde_json::{json, Value};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const CREATE_PATH: &str = "/ai-search/conversationApi/v1/create";
pub const CHAT_PATH: &str = "/ai-search/chatApi/v1/chat";
pub const API_KEY: &str = "sk-test";

pub fn config_for(server: &MockServer) -> ProxyConfig {
    ProxyConfig {
        api_key: API_KEY.to_string(),
        api_domain: server.uri(),
        request_timeout: 5,
        idle_read_timeout: 5,
        ..ProxyConfig::default()
    }
}

pub fn translator_for(config: &ProxyConfig) -> Arc<Translator> {
    let sessions = Arc::new(SessionManager::new(config.max_conversation_count));
    let upstream = Arc::new(UpstreamClient::new(config).unwrap());
    Arc::new(Translator::new(config, sessions, upstream))
}

/// Signed POST to `p`.
pub fn signed_post(p: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(p))
        .and(header_exists("deviceid"))
        .and(header_exists("nonce"))
        .and(header_exists("sign"))
        .and(header_exists("timestamp"))
}

pub fn create_ok(conversation_id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": { "conversationId": conversation_id }
    }))
}

pub fn answer(content_type: &str, content: &str) -> Value {
    json!({ "type": "answer", "content_type": content_type, "content": content })
}

/// Upstream SSE body from raw lines.
pub fn sse_body(lines: &[String]) -> ResponseTemplate {
    let mut body = String::new();
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

pub fn data(v: Value) -> String {
    format!("data:{}", v)
}

pub fn contents(chunks: &[TranslatedChunk]) -> Vec<String> {
    chunks
        .iter()
        .filter_map(|c| match c {
            TranslatedChunk::Content(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}
