//! Retrying wrapper around any [`ModelClient`].

use async_trait::async_trait;

use super::{CompletionRequest, ModelClient};
use crate::error::ScouterError;
use crate::types::ModelCompletion;
use crate::util::retry::RetryPolicy;

/// Applies a [`RetryPolicy`] to every completion of the inner client.
///
/// Transient failures are retried with backoff; permanent ones surface on the
/// first attempt.
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: ModelClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C: ModelClient> ModelClient for RetryingClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ModelCompletion, ScouterError> {
        self.policy.execute(|| self.inner.complete(request)).await
    }
}
