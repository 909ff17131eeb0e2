//! Image model trait.

use crate::error::Result;
use crate::image::types::{EffectRequest, EffectResponse};
use async_trait::async_trait;

/// A hosted model that edits an image according to a text instruction.
///
/// Implementations make exactly one upstream call per invocation and never
/// retry; the caller decides what to do with failures.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Sends `request` authenticated with `api_key` and returns the parts the
    /// model produced, in the order it produced them.
    async fn generate(&self, api_key: &str, request: &EffectRequest) -> Result<EffectResponse>;

    /// Returns the name of this model for display.
    fn name(&self) -> &str;
}
