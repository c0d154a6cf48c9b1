use {async_trait::async_trait, relay_common::Params};

use crate::outcome::{PostFailure, PostSuccess};

/// Performs exactly one outbound delivery to a channel.
///
/// The dispatcher calls this once per postable fragment and awaits it before
/// moving on. Implementations must not retry internally in a way that would
/// reorder deliveries.
#[async_trait]
pub trait PostAdapter: Send + Sync {
    async fn post(&self, params: Params) -> Result<PostSuccess, PostFailure>;
}
