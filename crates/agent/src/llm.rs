//! Completion seam behind the assistant runtime.
//!
//! The runtime composes prompts and trims answers; everything about how a
//! completion is actually produced lives behind this trait, so the HTTP
//! providers stay in the server crate and tests script completions inline.

use anyhow::Result;
use async_trait::async_trait;

/// One prompt in, one completion out. Retries and provider selection are the
/// implementation's concern.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
