use std::io::BufReader;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use super::sse::SseChunks;
use super::wire::{ChatCompletion, ChatCompletionChunk, ChatCompletionRequest};
use crate::error::{ProviderError, Result};

pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking iterator over streamed chunks
pub type ChunkIter =
    Box<dyn Iterator<Item = std::result::Result<ChatCompletionChunk, ProviderError>> + Send>;

/// Vendor chat-completion endpoint.
///
/// Calls block the current thread. The adapter only ever invokes them from
/// `spawn_blocking` workers, and shares one client between concurrent requests.
pub trait ChatClient: Send + Sync {
    fn create(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion>;

    /// Start a streaming completion; the request must have `stream` set
    fn create_stream(&self, request: &ChatCompletionRequest) -> Result<ChunkIter>;
}

/// GLM chat-completions over HTTP
pub struct HttpChatClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    /// Built on first use, which is always on a blocking worker
    http: OnceLock<Client>,
}

impl HttpChatClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            http: OnceLock::new(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn http(&self) -> std::result::Result<&Client, ProviderError> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(self.http.get_or_init(|| client))
    }

    fn send(
        &self,
        request: &ChatCompletionRequest,
    ) -> std::result::Result<reqwest::blocking::Response, ProviderError> {
        let response = self
            .http()?
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl ChatClient for HttpChatClient {
    fn create(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        debug!(url = %self.api_url(), model = %request.model, "POST chat completion");
        let response = self.send(request)?;
        let bytes = response.bytes().map_err(ProviderError::from)?;
        let completion = serde_json::from_slice(&bytes).map_err(ProviderError::from)?;
        Ok(completion)
    }

    fn create_stream(&self, request: &ChatCompletionRequest) -> Result<ChunkIter> {
        debug!(url = %self.api_url(), model = %request.model, "POST chat completion (stream)");
        let response = self.send(request)?;
        Ok(Box::new(SseChunks::new(BufReader::new(response))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        let client = HttpChatClient::new("key");
        assert_eq!(
            client.api_url(),
            "https://open.bigmodel.cn/api/paas/v4/chat/completions"
        );
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let client = HttpChatClient::new("key").with_base_url("http://localhost:11434/v1/");
        assert_eq!(client.api_url(), "http://localhost:11434/v1/chat/completions");
    }
}
