use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChatId, ChatMode},
    error::TerminateResult,
};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8123/api";

pub const HEALTH_PATH: &str = "/health";
pub const LOVE_APP_SSE_PATH: &str = "/ai/loveApp/chat/sse";
pub const LOVE_APP_SYNC_PATH: &str = "/ai/loveApp/chat/sync";
pub const LITE_MIND_SSE_PATH: &str = "/ai/liteMind/chat";
pub const SIMPLE_CHAT_SSE_PATH: &str = "/ai/chat/simple";
pub const TERMINATE_PATH: &str = "/ai/chat/terminate";

/// Prefix of the first frame the agent endpoints send to announce the conversation id.
pub const CHAT_ID_PREFIX: &str = "__CHAT_ID__:";
pub const DONE_MARKER: &str = "[DONE]";

pub fn stream_path(mode: ChatMode) -> &'static str {
    match mode {
        ChatMode::LoveApp => LOVE_APP_SSE_PATH,
        ChatMode::LiteMind => LITE_MIND_SSE_PATH,
        ChatMode::Simple => SIMPLE_CHAT_SSE_PATH,
    }
}

/// One `data` payload of a chat stream, classified by its in-band markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    ChatId(ChatId),
    Text(String),
    Done,
}

impl StreamMessage {
    pub fn classify(data: &str) -> Self {
        if data.trim() == DONE_MARKER {
            return Self::Done;
        }
        if let Some(raw) = data.strip_prefix(CHAT_ID_PREFIX) {
            if let Ok(chat_id) = ChatId::parse(raw) {
                return Self::ChatId(chat_id);
            }
        }
        Self::Text(data.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateResponse {
    pub chat_id: String,
    pub ok: bool,
    pub result: TerminateResult,
}
