use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, RequestBuilder, Response};
use shared::{
    domain::{ChatId, ChatMode},
    protocol::{
        stream_path, TerminateResponse, HEALTH_PATH, LOVE_APP_SYNC_PATH, TERMINATE_PATH,
    },
};
use tracing::{debug, error, info, warn};
use url::Url;

pub mod error;
pub mod transport;
pub mod types;

pub use error::ApiClientError;
pub use reqwest::StatusCode;
pub use transport::{ChatConnection, SseDecoder, SseEvent};
pub use types::ServerStatus;

const EVENT_STREAM_MIME: &str = "text/event-stream";

/// The backend calls the shell's views depend on.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn open_chat_stream(
        &self,
        mode: ChatMode,
        message: &str,
        chat_id: Option<&ChatId>,
    ) -> Result<ChatConnection, ApiClientError>;
    async fn probe_server(&self) -> ServerStatus;
    async fn terminate_chat(
        &self,
        chat_id: &ChatId,
        hard: bool,
    ) -> Result<TerminateResponse, ApiClientError>;
}

/// Thin wrapper over the chat backend's HTTP and server-push endpoints.
#[derive(Debug, Clone)]
pub struct ApiService {
    http: Client,
    base_url: String,
}

impl ApiService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiClientError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Result<Self, ApiClientError> {
        let raw = base_url.into();
        let trimmed = raw.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|source| ApiClientError::InvalidBaseUrl {
            url: raw.clone(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiClientError::UnsupportedScheme {
                scheme: parsed.scheme().to_string(),
                url: raw,
            });
        }
        // Endpoint paths are appended verbatim, so the base must end in a path.
        let misplaced = if parsed.cannot_be_a_base() {
            Some("an opaque path")
        } else if parsed.query().is_some() {
            Some("a query")
        } else if parsed.fragment().is_some() {
            Some("a fragment")
        } else {
            None
        };
        if let Some(part) = misplaced {
            return Err(ApiClientError::BaseUrlShape { url: raw, part });
        }

        Ok(Self {
            http,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chat_stream_url(&self, mode: ChatMode, message: &str, chat_id: Option<&ChatId>) -> String {
        let mut query = vec![("message", message)];
        if let Some(chat_id) = chat_id {
            query.push(("chatId", chat_id.as_str()));
        }
        self.endpoint(stream_path(mode), &query)
    }

    pub fn love_app_chat_url(&self, message: &str, chat_id: Option<&ChatId>) -> String {
        self.chat_stream_url(ChatMode::LoveApp, message, chat_id)
    }

    pub fn lite_mind_chat_url(&self, message: &str) -> String {
        self.chat_stream_url(ChatMode::LiteMind, message, None)
    }

    pub fn simple_chat_url(&self, message: &str, chat_id: Option<&ChatId>) -> String {
        self.chat_stream_url(ChatMode::Simple, message, chat_id)
    }

    pub fn health_url(&self) -> String {
        self.endpoint(HEALTH_PATH, &[])
    }

    pub async fn create_love_app_connection(
        &self,
        message: &str,
        chat_id: Option<&ChatId>,
    ) -> Result<ChatConnection, ApiClientError> {
        self.open_chat_stream(ChatMode::LoveApp, message, chat_id)
            .await
    }

    pub async fn create_lite_mind_connection(
        &self,
        message: &str,
    ) -> Result<ChatConnection, ApiClientError> {
        self.open_chat_stream(ChatMode::LiteMind, message, None)
            .await
    }

    pub async fn create_simple_chat_connection(
        &self,
        message: &str,
        chat_id: Option<&ChatId>,
    ) -> Result<ChatConnection, ApiClientError> {
        self.open_chat_stream(ChatMode::Simple, message, chat_id)
            .await
    }

    pub async fn open_chat_stream(
        &self,
        mode: ChatMode,
        message: &str,
        chat_id: Option<&ChatId>,
    ) -> Result<ChatConnection, ApiClientError> {
        let url = self.chat_stream_url(mode, message, chat_id);
        debug!(?mode, %url, "api: opening chat stream");
        let response = self
            .send_checked(self.http.get(&url).header(ACCEPT, EVENT_STREAM_MIME), &url)
            .await?;
        info!(
            ?mode,
            chat_id = chat_id.map(ChatId::as_str),
            "api: chat stream established"
        );
        Ok(ChatConnection::from_response(url, response))
    }

    /// Whole-reply variant of the love-app chat.
    pub async fn love_app_chat_sync(
        &self,
        message: &str,
        chat_id: Option<&ChatId>,
    ) -> Result<String, ApiClientError> {
        let mut query = vec![("message", message)];
        if let Some(chat_id) = chat_id {
            query.push(("chatId", chat_id.as_str()));
        }
        let url = self.endpoint(LOVE_APP_SYNC_PATH, &query);
        let response = self.send_checked(self.http.get(&url), &url).await?;
        response
            .text()
            .await
            .map_err(|source| ApiClientError::Decode { url, source })
    }

    /// Asks the backend to stop the agent bound to `chat_id`. A 404 is decoded
    /// like a 200 since the body reports `not_found`.
    pub async fn terminate_chat(
        &self,
        chat_id: &ChatId,
        hard: bool,
    ) -> Result<TerminateResponse, ApiClientError> {
        let hard_flag = if hard { "true" } else { "false" };
        let url = self.endpoint(
            TERMINATE_PATH,
            &[("chatId", chat_id.as_str()), ("final", hard_flag)],
        );
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|source| ApiClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            warn!(%url, %status, "api: terminate rejected");
            return Err(ApiClientError::Status { url, status });
        }

        let body: TerminateResponse = response
            .json()
            .await
            .map_err(|source| ApiClientError::Decode { url, source })?;
        info!(
            chat_id = chat_id.as_str(),
            hard,
            result = ?body.result,
            "api: terminate requested"
        );
        Ok(body)
    }

    pub async fn probe_server(&self) -> ServerStatus {
        let url = self.health_url();
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => ServerStatus::Online,
            Ok(response) => {
                warn!(%url, status = %response.status(), "api: health check returned failure status");
                ServerStatus::Unhealthy {
                    status: response.status(),
                }
            }
            Err(err) => {
                error!(%url, error = %err, "api: server connection failed");
                ServerStatus::Unreachable {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// `true` iff the health endpoint answers with a 2xx status.
    pub async fn check_server_status(&self) -> bool {
        self.probe_server().await.is_online()
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        for (idx, (key, value)) in query.iter().enumerate() {
            url.push(if idx == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn send_checked(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<Response, ApiClientError> {
        let response = request
            .send()
            .await
            .map_err(|source| ApiClientError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "api: request rejected");
            return Err(ApiClientError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for ApiService {
    async fn open_chat_stream(
        &self,
        mode: ChatMode,
        message: &str,
        chat_id: Option<&ChatId>,
    ) -> Result<ChatConnection, ApiClientError> {
        ApiService::open_chat_stream(self, mode, message, chat_id).await
    }

    async fn probe_server(&self) -> ServerStatus {
        ApiService::probe_server(self).await
    }

    async fn terminate_chat(
        &self,
        chat_id: &ChatId,
        hard: bool,
    ) -> Result<TerminateResponse, ApiClientError> {
        ApiService::terminate_chat(self, chat_id, hard).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
