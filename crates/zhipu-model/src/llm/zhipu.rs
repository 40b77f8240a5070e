use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::assemble::process_response;
use super::client::{ChatClient, HttpChatClient};
use super::provider::Model;
use super::streaming::StreamedResponse;
use super::translate::build_request;
use super::types::*;
use crate::error::Result;

const SYSTEM: &str = "zhipuai";

/// Zhipu GLM chat model.
///
/// Wraps a blocking [`ChatClient`]; every vendor call runs on a
/// `spawn_blocking` worker so the calling task is never blocked.
#[derive(Clone)]
pub struct ZhipuModel {
    model_name: String,
    client: Arc<dyn ChatClient>,
}

impl ZhipuModel {
    /// Model talking to the default GLM endpoint
    pub fn new(model_name: &str, api_key: &str) -> Self {
        Self::with_client(model_name, Arc::new(HttpChatClient::new(api_key)))
    }

    /// Model over an existing (possibly shared) client
    pub fn with_client(model_name: &str, client: Arc<dyn ChatClient>) -> Self {
        Self {
            model_name: model_name.to_string(),
            client,
        }
    }

    /// Model talking to a custom endpoint
    pub fn with_endpoint(
        model_name: &str,
        api_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Self {
        let client = HttpChatClient::new(api_key)
            .with_base_url(base_url)
            .with_timeout(timeout);
        Self::with_client(model_name, Arc::new(client))
    }

    pub fn client(&self) -> Arc<dyn ChatClient> {
        Arc::clone(&self.client)
    }
}

#[async_trait]
impl Model for ZhipuModel {
    async fn request(
        &self,
        messages: &[ModelMessage],
        settings: Option<&ModelSettings>,
        params: &ModelRequestParameters,
    ) -> Result<(ModelResponse, Usage)> {
        let payload = build_request(&self.model_name, messages, settings, params, false);
        debug!(
            model = %self.model_name,
            messages = payload.messages.len(),
            tools = payload.tools.as_ref().map_or(0, Vec::len),
            "Sending chat completion request"
        );

        let client = self.client();
        let completion = tokio::task::spawn_blocking(move || client.create(&payload)).await??;

        let (response, usage) = process_response(completion)?;
        info!(
            model = %self.model_name,
            parts = response.parts.len(),
            request_tokens = usage.request_tokens,
            response_tokens = usage.response_tokens,
            "Chat completion received"
        );
        Ok((response, usage))
    }

    async fn request_stream(
        &self,
        messages: &[ModelMessage],
        settings: Option<&ModelSettings>,
        params: &ModelRequestParameters,
    ) -> Result<StreamedResponse> {
        let payload = build_request(&self.model_name, messages, settings, params, true);
        debug!(
            model = %self.model_name,
            messages = payload.messages.len(),
            tools = payload.tools.as_ref().map_or(0, Vec::len),
            "Opening chat completion stream"
        );

        let client = self.client();
        let chunks = tokio::task::spawn_blocking(move || client.create_stream(&payload)).await??;

        Ok(StreamedResponse::new(&self.model_name, chunks))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn system(&self) -> &str {
        SYSTEM
    }
}

impl std::fmt::Debug for ZhipuModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZhipuModel")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}
