// AI search upstream data models

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const BOT_CODE: &str = "AI_SEARCH";

/// `conversationApi/v1/create` payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationPayload {
    pub bot_code: &'static str,
}

impl Default for CreateConversationPayload {
    fn default() -> Self {
        Self { bot_code: BOT_CODE }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConversationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<ConversationData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationData {
    pub conversation_id: Option<String>,
}

/// `chatApi/v1/chat` payload. Field order is part of the signature.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub stream: bool,
    pub bot_code: &'static str,
    pub user_action: String,
    pub model: String,
    pub conversation_id: String,
    pub question: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Thinking,
    Text,
    Card,
    Other,
}

impl ContentType {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("thinking") => ContentType::Thinking,
            Some("text") => ContentType::Text,
            Some("card") => ContentType::Card,
            _ => ContentType::Other,
        }
    }
}

/// An upstream event with `type == "answer"`.
#[derive(Debug, Clone)]
pub struct AnswerEvent {
    pub content_type: ContentType,
    pub content: Option<String>,
}

impl AnswerEvent {
    /// `None` for any event that is not an answer.
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("type").and_then(|t| t.as_str()) != Some("answer") {
            return None;
        }
        Some(Self {
            content_type: ContentType::parse(value.get("content_type").and_then(|c| c.as_str())),
            content: value
                .get("content")
                .and_then(|c| c.as_str())
                .map(|s| s.to_string()),
        })
    }
}

// ========== Card payload ==========

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardContent {
    pub card_info: CardInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    #[serde(default)]
    pub card_items: Vec<CardItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardItem {
    #[serde(rename = "type", default)]
    pub item_type: Value,
    #[serde(default)]
    pub content: String,
}

impl CardItem {
    /// Item tag; upstream sends it as a string but numbers are accepted too.
    pub fn tag(&self) -> String {
        value_to_plain(&self.item_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub id_index: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub url: Value,
    #[serde(default)]
    pub site_name: Value,
}

/// Strings render bare, everything else as JSON.
pub fn value_to_plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
