use crate::backend::AdminBackend;
use crate::config::Config;
use crate::model::{ActionBatchResult, ActionKind, ActionOutcome, ActionRequest, EntityId};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Fans a batch out to the backend, one call per target id.
///
/// Never touches the entity store; callers apply the returned result.
#[derive(Clone)]
pub struct ActionExecutor {
    backend: Arc<dyn AdminBackend>,
    kind: String,
    call_timeout: Duration,
    max_in_flight: usize,
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("kind", &self.kind)
            .field("call_timeout", &self.call_timeout)
            .field("max_in_flight", &self.max_in_flight)
            .finish_non_exhaustive()
    }
}

impl ActionExecutor {
    pub fn new(
        backend: Arc<dyn AdminBackend>,
        kind: impl Into<String>,
        call_timeout: Duration,
        max_in_flight: usize,
    ) -> Self {
        Self {
            backend,
            kind: kind.into(),
            call_timeout,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn from_config(backend: Arc<dyn AdminBackend>, kind: impl Into<String>, cfg: &Config) -> Self {
        Self::new(backend, kind, cfg.call_timeout(), cfg.executor.max_in_flight)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Run every call in the batch and wait for all of them. Outcomes come
    /// back in `target_ids` order whatever order the calls finish in.
    #[instrument(skip_all, fields(batch = %request.batch_id, action = %request.kind, size = request.target_ids.len()))]
    pub async fn execute(&self, request: &ActionRequest) -> ActionBatchResult {
        let outcomes: Vec<ActionOutcome> = stream::iter(request.target_ids.iter())
            .map(|id| self.call_one(request.kind, id))
            .buffered(self.max_in_flight)
            .collect()
            .await;

        let result = ActionBatchResult::from_outcomes(request.batch_id, request.kind, outcomes);
        info!(
            succeeded = result.success_count,
            failed = result.failure_count,
            "batch finished"
        );
        result
    }

    async fn call_one(&self, action: ActionKind, id: &EntityId) -> ActionOutcome {
        let call = self.backend.call(&self.kind, action, id);
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(reply)) if reply.succeeded => ActionOutcome::success(id.clone(), reply.message),
            Ok(Ok(reply)) => {
                let message = reply
                    .message
                    .unwrap_or_else(|| format!("{} refused by backend", action));
                warn!(%id, %message, "action refused");
                ActionOutcome::failure(id.clone(), message)
            }
            Ok(Err(err)) => {
                warn!(%id, ?err, "action call failed");
                ActionOutcome::failure(id.clone(), format!("{:#}", err))
            }
            Err(_) => {
                warn!(%id, timeout_ms = self.call_timeout.as_millis() as u64, "action call timed out");
                ActionOutcome::failure(id.clone(), "timeout")
            }
        }
    }
}
