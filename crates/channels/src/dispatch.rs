//! Sequential multi-message dispatch.

use std::{sync::Arc, time::Duration};

use {
    relay_common::Params,
    tracing::{debug, info, warn},
};

use crate::{
    adapter::PostAdapter,
    fragment::{Fragment, ReplyPayload},
    outcome::{Attempt, DispatchLog, PostOutcome},
};

/// What to do with one fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Post `params`, then wait `delay` before the next fragment.
    Post {
        params: Params,
        delay: Option<Duration>,
    },
    /// Post nothing; wait before the next fragment.
    Sleep(Duration),
}

/// Channel-specific classification of fragments into post parameters.
pub trait FragmentShaper: Send + Sync {
    /// Channel label used in logs.
    fn channel(&self) -> &'static str;

    /// Classify `fragment` exactly once. `metadata` is the reply's
    /// pass-through routing and auth data.
    fn shape(&self, metadata: &Params, fragment: Fragment) -> Step;
}

/// Copy of `metadata` with `fields` laid over it.
#[must_use]
pub fn merge_fields(metadata: &Params, fields: &Params) -> Params {
    let mut merged = metadata.clone();
    for (key, value) in fields {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Delivers a reply's fragments one at a time, in order.
pub struct Dispatcher<S> {
    adapter: Arc<dyn PostAdapter>,
    shaper: S,
}

impl<S: FragmentShaper> Dispatcher<S> {
    pub fn new(adapter: Arc<dyn PostAdapter>, shaper: S) -> Self {
        Self { adapter, shaper }
    }

    /// Walk every fragment of `payload`, stopping after the first failed post.
    ///
    /// Posts and delays never overlap: each post is awaited, then its delay,
    /// before the next fragment is looked at.
    pub async fn dispatch(&self, payload: ReplyPayload) -> DispatchLog {
        let channel = self.shaper.channel();
        let ReplyPayload { message, metadata } = payload;
        let mut log = DispatchLog::new(message.len());

        for (index, fragment) in message.into_fragments().into_iter().enumerate() {
            match self.shaper.shape(&metadata, fragment) {
                Step::Sleep(delay) => {
                    debug!(
                        channel,
                        index,
                        delay_ms = delay.as_millis() as u64,
                        "pause fragment"
                    );
                    tokio::time::sleep(delay).await;
                },
                Step::Post { params, delay } => {
                    let outcome = PostOutcome::from(self.adapter.post(params).await);
                    let failed = !outcome.is_success();
                    if let PostOutcome::Failure(failure) = &outcome {
                        warn!(
                            channel,
                            index,
                            error = %failure.error,
                            "post failed, skipping remaining fragments"
                        );
                    } else {
                        debug!(channel, index, "posted fragment");
                    }
                    log.attempts.push(Attempt { index, outcome });
                    if failed {
                        break;
                    }
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        info!(
            channel,
            fragments = log.fragment_count,
            posted = log.successes().count(),
            failed = log.has_failure(),
            "dispatch finished"
        );
        log
    }
}
