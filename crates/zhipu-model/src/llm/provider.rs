use async_trait::async_trait;

use super::streaming::StreamedResponse;
use super::types::{ModelMessage, ModelRequestParameters, ModelResponse, ModelSettings, Usage};
use crate::error::Result;

/// Uniform chat model interface handed to the orchestration layer
#[async_trait]
pub trait Model: Send + Sync {
    /// Issue one request and wait for the complete response
    async fn request(
        &self,
        messages: &[ModelMessage],
        settings: Option<&ModelSettings>,
        params: &ModelRequestParameters,
    ) -> Result<(ModelResponse, Usage)>;

    /// Issue a streaming request. The returned session releases the
    /// underlying connection when closed or dropped.
    async fn request_stream(
        &self,
        messages: &[ModelMessage],
        settings: Option<&ModelSettings>,
        params: &ModelRequestParameters,
    ) -> Result<StreamedResponse>;

    /// Model name for logging/tracking
    fn model_name(&self) -> &str;

    /// Provider identifier
    fn system(&self) -> &str;
}
