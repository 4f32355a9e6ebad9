// Upstream client implementation
// Signed calls to the AI search conversation and chat endpoints

use reqwest::{header, Client, Response};
use tokio::time::Duration;

use super::signer::SignedEnvelope;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::config::ProxyConfig;
use crate::proxy::mappers::aisearch::{ChatPayload, CreateConversationPayload, CreateConversationResponse};

const ORIGIN: &str = "https://ai.dangbei.com";
const REFERER: &str = "https://ai.dangbei.com/";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

const CREATE_CONVERSATION_PATH: &str = "/ai-search/conversationApi/v1/create";
const CHAT_PATH: &str = "/ai-search/chatApi/v1/chat";

pub struct UpstreamClient {
    http_client: Client,
    api_domain: String,
    request_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> ProxyResult<Self> {
        let request_timeout = Duration::from_secs(config.request_timeout);
        let mut builder = Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(USER_AGENT);

        let proxy_config = &config.upstream_proxy;
        if proxy_config.enabled && !proxy_config.url.is_empty() {
            match reqwest::Proxy::all(&proxy_config.url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy);
                    tracing::info!("UpstreamClient enabled proxy: {}", proxy_config.url);
                }
                Err(e) => {
                    tracing::error!("Invalid proxy address: {}, error: {}", proxy_config.url, e);
                }
            }
        }

        let http_client = builder
            .build()
            .map_err(|e| ProxyError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_domain: config.api_domain_trimmed().to_string(),
            request_timeout,
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.api_domain, path)
    }

    fn build_headers(device_id: &str, envelope: &SignedEnvelope) -> ProxyResult<header::HeaderMap> {
        let value = |s: &str| {
            header::HeaderValue::from_str(s)
                .map_err(|e| ProxyError::InvalidRequest(format!("invalid header value: {}", e)))
        };

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ORIGIN, header::HeaderValue::from_static(ORIGIN));
        headers.insert(header::REFERER, header::HeaderValue::from_static(REFERER));
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert("deviceid", value(device_id)?);
        headers.insert("nonce", value(&envelope.nonce)?);
        headers.insert("sign", value(&envelope.signature)?);
        headers.insert("timestamp", value(&envelope.timestamp)?);
        Ok(headers)
    }

    /// Open a new upstream conversation for `device_id`.
    ///
    /// Every failure collapses to `ConversationCreationFailed`; no retry.
    pub async fn create_conversation(&self, device_id: &str) -> ProxyResult<String> {
        let envelope = SignedEnvelope::new(&CreateConversationPayload::default())?;
        let headers = Self::build_headers(device_id, &envelope)?;

        let response = self
            .http_client
            .post(self.build_url(CREATE_CONVERSATION_PATH))
            .headers(headers)
            .timeout(self.request_timeout)
            .body(envelope.body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error creating conversation: {}", e);
                ProxyError::ConversationCreationFailed
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %text, "Create conversation rejected");
            return Err(ProxyError::ConversationCreationFailed);
        }

        let parsed: CreateConversationResponse = response.json().await.map_err(|e| {
            tracing::error!("Create conversation returned malformed JSON: {}", e);
            ProxyError::ConversationCreationFailed
        })?;

        let success = parsed.success;
        match parsed.data.and_then(|d| d.conversation_id) {
            Some(id) if success => {
                tracing::debug!(conversation_id = %id, "Conversation created");
                Ok(id)
            }
            _ => {
                tracing::error!("Create conversation reported success=false");
                Err(ProxyError::ConversationCreationFailed)
            }
        }
    }

    /// Start the chat stream. The returned response is 2xx and its body is
    /// the raw `data:` line stream.
    pub async fn open_chat_stream(
        &self,
        device_id: &str,
        payload: &ChatPayload,
    ) -> ProxyResult<Response> {
        let envelope = SignedEnvelope::new(payload)?;
        let headers = Self::build_headers(device_id, &envelope)?;

        let response = self
            .http_client
            .post(self.build_url(CHAT_PATH))
            .headers(headers)
            .body(envelope.body)
            .send()
            .await
            .map_err(|e| ProxyError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "Upstream chat HTTP error");
            return Err(ProxyError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}
