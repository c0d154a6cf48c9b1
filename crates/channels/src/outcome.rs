use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// A delivered fragment: the adapter's response and the id of the call
/// that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSuccess {
    pub result: Value,
    pub invocation_id: String,
}

/// A failed delivery. The error payload is reported verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("post failed: {error}")]
pub struct PostFailure {
    pub error: Value,
}

impl PostFailure {
    #[must_use]
    pub fn new(error: impl Into<Value>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Failure carrying a plain message string.
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self {
            error: Value::String(message.to_string()),
        }
    }
}

/// Result of posting one fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Success(PostSuccess),
    Failure(PostFailure),
}

impl PostOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<PostSuccess, PostFailure>> for PostOutcome {
    fn from(res: Result<PostSuccess, PostFailure>) -> Self {
        match res {
            Ok(success) => Self::Success(success),
            Err(failure) => Self::Failure(failure),
        }
    }
}

/// One post attempt, tagged with the index of the fragment it delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub index: usize,
    pub outcome: PostOutcome,
}

/// Ordered record of every post a dispatch attempted.
///
/// Sleep-only fragments leave no entry. At most one failure is ever
/// recorded and it is always the last entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchLog {
    pub fragment_count: usize,
    pub attempts: Vec<Attempt>,
}

impl DispatchLog {
    #[must_use]
    pub fn new(fragment_count: usize) -> Self {
        Self {
            fragment_count,
            attempts: Vec::new(),
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &PostSuccess> {
        self.attempts.iter().filter_map(|a| match &a.outcome {
            PostOutcome::Success(s) => Some(s),
            PostOutcome::Failure(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &PostFailure> {
        self.attempts.iter().filter_map(|a| match &a.outcome {
            PostOutcome::Failure(f) => Some(f),
            PostOutcome::Success(_) => None,
        })
    }

    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.attempts.iter().any(|a| !a.outcome.is_success())
    }
}

/// Why a multi-post entry point rejected.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError<R> {
    /// The payload could not be dispatched at all.
    #[error(transparent)]
    Invalid(#[from] crate::error::Error),

    /// At least one post failed. Earlier fragments were already delivered.
    #[error("delivery stopped after a failed post")]
    Undelivered(R),
}
