use async_trait::async_trait;
use tracing::{info, warn};

use crate::provider::{ChatBackend, ChatRequest, ImageRequest, ProviderError};

/// One backend inside the [`ProviderRouter`].
pub struct ProviderSlot {
    pub backend: Box<dyn ChatBackend>,
    /// Extra attempts on this backend before moving to the next one.
    pub max_retries: u32,
}

impl ProviderSlot {
    pub fn new(backend: Box<dyn ChatBackend>, max_retries: u32) -> Self {
        Self {
            backend,
            max_retries,
        }
    }
}

/// Tries backends in priority order (index 0 first), retrying each up to its
/// `max_retries` before failing over to the next.
///
/// A rate limit skips the remaining retries of that slot. `Unsupported`
/// skips the slot without retrying, so image description lands on the first
/// backend that has a vision model.
pub struct ProviderRouter {
    slots: Vec<ProviderSlot>,
}

impl ProviderRouter {
    /// Returns `None` when `slots` is empty.
    pub fn new(slots: Vec<ProviderSlot>) -> Option<Self> {
        (!slots.is_empty()).then_some(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    async fn route<'a, T, F, Fut>(&'a self, op: &str, call: F) -> Result<T, ProviderError>
    where
        F: Fn(&'a dyn ChatBackend) -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut last_err: Option<ProviderError> = None;

        for slot in &self.slots {
            let backend_name = slot.backend.name();

            for attempt in 0..=slot.max_retries {
                match call(slot.backend.as_ref()).await {
                    Ok(value) => {
                        if attempt > 0 {
                            info!(provider = %backend_name, attempt, op, "request succeeded after retry");
                        }
                        return Ok(value);
                    }
                    Err(e) => {
                        let skip_slot = matches!(
                            e,
                            ProviderError::RateLimited { .. } | ProviderError::Unsupported(_)
                        );
                        if !matches!(e, ProviderError::Unsupported(_)) {
                            warn!(provider = %backend_name, attempt, op, err = %e, "provider call failed");
                        }
                        last_err = Some(e);
                        if skip_slot {
                            break;
                        }

                        if attempt < slot.max_retries {
                            tokio::time::sleep(tokio::time::Duration::from_millis(
                                200 * (attempt as u64 + 1),
                            ))
                            .await;
                        }
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| ProviderError::Unavailable("all providers failed".to_string())))
    }
}

#[async_trait]
impl ChatBackend for ProviderRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn complete(&self, req: &ChatRequest) -> Result<String, ProviderError> {
        self.route("complete", |backend| backend.complete(req)).await
    }

    async fn describe_image(&self, req: &ImageRequest) -> Result<String, ProviderError> {
        self.route("describe_image", |backend| backend.describe_image(req))
            .await
    }
}
