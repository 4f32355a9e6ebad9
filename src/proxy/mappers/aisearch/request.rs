// OpenAI request -> AI search chat payload

use super::models::{ChatPayload, BOT_CODE};
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::mappers::openai::OpenAIMessage;

/// 支持的模型列表
pub const SUPPORTED_MODELS: [&str; 8] = [
    "deepseek-v3",
    "deepseek-v3-search",
    "deepseek-r1",
    "deepseek-r1-search",
    "doubao",
    "doubao-search",
    "qwen",
    "qwen-search",
];

/// Upstream model plus the actions implied by the public model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub transport_model: String,
    pub user_action: String,
}

pub fn validate_model(model: &str) -> ProxyResult<()> {
    if SUPPORTED_MODELS.contains(&model) {
        Ok(())
    } else {
        Err(ProxyError::UnsupportedModel(model.to_string()))
    }
}

/// `deepseek-r1-search` -> model `deepseek`, action `deep,online`
pub fn resolve_model_route(model: &str) -> ModelRoute {
    let mut segments = model.split('-');
    let transport_model = segments.next().unwrap_or_default().to_string();

    let mut actions = Vec::new();
    if segments.next().is_some_and(|s| s.starts_with("r1")) {
        actions.push("deep");
    }
    if model.ends_with("-search") {
        actions.push("online");
    }

    ModelRoute {
        transport_model,
        user_action: actions.join(","),
    }
}

/// Fold the message list into one prompt with optional `[System Prompt]`,
/// `[Chat History]` and a `[Question]` section.
pub fn build_full_prompt(messages: &[OpenAIMessage]) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let mut system_prompt = String::new();
    let mut history: Vec<String> = Vec::new();
    let mut last_user_message = String::new();

    for msg in messages {
        match msg.role.as_str() {
            "system" if system_prompt.is_empty() => system_prompt = msg.text(),
            "user" => {
                let text = msg.text();
                history.push(format!("user: {}", text));
                last_user_message = text;
            }
            "assistant" => history.push(format!("assistant: {}", msg.text())),
            _ => {}
        }
    }

    let mut parts = Vec::new();
    if !system_prompt.is_empty() {
        parts.push(format!("[System Prompt]\n{}", system_prompt));
    }
    if history.len() > 1 {
        parts.push(format!(
            "[Chat History]\n{}",
            history[..history.len() - 1].join("\n")
        ));
    }
    parts.push(format!("[Question]\n{}", last_user_message));

    parts.join("\n\n")
}

pub fn build_chat_payload(
    route: &ModelRoute,
    conversation_id: &str,
    messages: &[OpenAIMessage],
) -> ChatPayload {
    ChatPayload {
        stream: true,
        bot_code: BOT_CODE,
        user_action: route.user_action.clone(),
        model: route.transport_model.clone(),
        conversation_id: conversation_id.to_string(),
        question: build_full_prompt(messages),
    }
}
