//! Page controller owning the store, view, selection and review queue for one
//! entity kind. One workspace per page/session; nothing here is global.
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::backend::AdminBackend;
use crate::executor::ActionExecutor;
use crate::model::{ActionBatchResult, ActionKind, ActionOutcome, ActionRequest, Entity, EntityId};
use crate::projector::{project, Filters, SearchFields};
use crate::queue::{QueueController, QueueError, Resolution};
use crate::selection::{SelectionError, SelectionSet};
use crate::store::EntityStore;

/// Identifies the workspace generation a batch was started against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTicket(u64);

/// A batch snapshot taken from the selection, ready to hand to the executor.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    pub ticket: BatchTicket,
    pub request: ActionRequest,
    /// Selected ids the action does not apply to; they never reach the backend.
    pub skipped: Vec<ActionOutcome>,
    selected: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchApplication {
    Applied(ActionBatchResult),
    /// The workspace was refreshed or closed while the batch was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    /// The backend confirmed; the item left the queue.
    Resolved { entity: Entity, outcome: ActionOutcome },
    /// The call failed; focus stays on the item.
    Failed(ActionOutcome),
}

pub struct Workspace {
    backend: Arc<dyn AdminBackend>,
    executor: ActionExecutor,
    fields: SearchFields,
    filters: Filters,
    store: EntityStore,
    view: Vec<Entity>,
    selection: SelectionSet,
    queue: QueueController,
    generation: u64,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("kind", &self.kind())
            .field("filters", &self.filters)
            .field("entities", &self.store.len())
            .field("visible", &self.view.len())
            .field("selected", &self.selection.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn new(backend: Arc<dyn AdminBackend>, executor: ActionExecutor, fields: SearchFields) -> Self {
        Self {
            backend,
            executor,
            fields,
            filters: Filters::default(),
            store: EntityStore::default(),
            view: Vec::new(),
            selection: SelectionSet::new(),
            queue: QueueController::new(),
            generation: 0,
        }
    }

    pub fn kind(&self) -> &str {
        self.executor.kind()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn visible(&self) -> &[Entity] {
        &self.view
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn queue(&self) -> &QueueController {
        &self.queue
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Reload the page from the backend. Outstanding batch tickets go stale.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> Result<()> {
        let entities = self
            .backend
            .list(self.kind())
            .await
            .with_context(|| format!("failed to list {}", self.kind()))?;
        info!(kind = self.kind(), count = entities.len(), "refreshed entities");
        self.generation += 1;
        self.store.replace(entities);
        self.reproject();
        Ok(())
    }

    /// Seed the store directly, e.g. from a listing fetched elsewhere.
    pub fn load(&mut self, entities: Vec<Entity>) {
        self.generation += 1;
        self.store.replace(entities);
        self.reproject();
    }

    pub fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
        self.reproject();
    }

    fn reproject(&mut self) {
        self.view = project(self.store.entities(), &self.filters, &self.fields);
        self.selection
            .set_visible(self.view.iter().map(|e| e.id.clone()));
    }

    pub fn toggle(&mut self, id: &EntityId) -> Result<bool, SelectionError> {
        self.selection.toggle(id)
    }

    pub fn select_all_visible(&mut self) {
        let ids: Vec<EntityId> = self.view.iter().map(|e| e.id.clone()).collect();
        self.selection.select_all_visible(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_fully_selected(&self) -> bool {
        self.selection
            .is_fully_selected(self.view.iter().map(|e| &e.id))
    }

    /// Snapshot the selection into a batch request. Selected ids whose status
    /// rules the action out become failed outcomes without a remote call.
    pub fn begin_batch(&self, kind: ActionKind) -> PendingBatch {
        let selected = self.selection.selected_in_view_order();
        let mut targets = Vec::new();
        let mut skipped = Vec::new();
        for id in selected.iter().cloned() {
            match self.store.get(&id) {
                Some(entity) if !kind.applies_to(entity.status) => skipped.push(ActionOutcome::failure(
                    id,
                    format!("{} not applicable to {}", kind, entity.status),
                )),
                _ => targets.push(id),
            }
        }
        PendingBatch {
            ticket: BatchTicket(self.generation),
            request: ActionRequest::new(kind, targets),
            skipped,
            selected,
        }
    }

    /// Apply an executed batch unless the workspace moved on since it began.
    pub fn complete_batch(&mut self, pending: PendingBatch, result: ActionBatchResult) -> BatchApplication {
        if pending.ticket.0 != self.generation {
            warn!(batch = %result.batch_id, "discarding result of abandoned batch");
            return BatchApplication::Discarded;
        }

        let changed = self.store.apply(&result);
        self.selection.deselect(result.succeeded_ids());
        self.reproject();

        // Report in selection order, skipped ids included.
        let mut by_id: HashMap<EntityId, ActionOutcome> = result
            .outcomes
            .into_iter()
            .chain(pending.skipped)
            .map(|o| (o.id.clone(), o))
            .collect();
        let outcomes = pending
            .selected
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        let merged = ActionBatchResult::from_outcomes(result.batch_id, result.kind, outcomes);
        info!(
            batch = %merged.batch_id,
            changed,
            succeeded = merged.success_count,
            failed = merged.failure_count,
            "batch applied"
        );
        BatchApplication::Applied(merged)
    }

    /// Run `kind` over the current selection and apply the result.
    pub async fn run_batch(&mut self, kind: ActionKind) -> BatchApplication {
        let pending = self.begin_batch(kind);
        let result = self.executor.execute(&pending.request).await;
        self.complete_batch(pending, result)
    }

    /// Queue the current view for one-at-a-time review.
    pub fn load_queue(&mut self) {
        self.queue.load(self.view.clone());
    }

    pub fn focus(&mut self, id: &EntityId) -> Result<(), QueueError> {
        self.queue.focus(id)
    }

    /// Send the focused item's decision to the backend and advance on success.
    pub async fn resolve_focused(&mut self, resolution: Resolution) -> Result<ReviewOutcome, QueueError> {
        let Some(focused) = self.queue.focused() else {
            return Err(QueueError::InvalidState { operation: "resolve" });
        };
        let action = resolution.action();
        if !action.applies_to(focused.status) {
            return Ok(ReviewOutcome::Failed(ActionOutcome::failure(
                focused.id.clone(),
                format!("{} not applicable to {}", action, focused.status),
            )));
        }
        let request = ActionRequest::new(action, [focused.id.clone()]);
        let result = self.executor.execute(&request).await;

        let Some(outcome) = result.outcomes.first().cloned() else {
            return Err(QueueError::InvalidState { operation: "resolve" });
        };
        if !outcome.succeeded {
            return Ok(ReviewOutcome::Failed(outcome));
        }
        let resolved = self.queue.resolve(resolution)?;
        self.store.apply(&result);
        self.reproject();
        Ok(ReviewOutcome::Resolved {
            entity: resolved.entity,
            outcome,
        })
    }

    /// Teardown: results of batches still in flight will be discarded.
    pub fn close(&mut self) {
        self.generation += 1;
        self.selection.clear();
        self.queue.load(Vec::new());
    }
}
