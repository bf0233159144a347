use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GenerationParams;
use crate::error::UpstreamError;

/// External text-generation service.
///
/// The engine only ever needs "prompt in, raw text out"; parsing and repair
/// happen downstream.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// False when the credential is missing, so no call should be attempted
    fn is_configured(&self) -> bool;

    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, UpstreamError>;
}

#[async_trait]
impl TextGenerator for Arc<dyn TextGenerator> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }

    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, UpstreamError> {
        (**self).generate_text(prompt, params).await
    }
}
