//! Selectable work-queue core for marketplace back-office tooling: a page of
//! entities, a filtered view over it, a selection scoped to that view, bulk
//! actions fanned out to an admin backend, and a one-at-a-time review queue.

pub mod backend;
pub mod config;
pub mod executor;
pub mod model;
pub mod projector;
pub mod queue;
pub mod selection;
pub mod store;
pub mod workspace;

pub use backend::{AdminBackend, HttpBackend, RemoteReply};
pub use executor::ActionExecutor;
pub use model::{
    ActionBatchResult, ActionKind, ActionOutcome, ActionRequest, Entity, EntityId, EntityStatus,
    Scalar,
};
pub use projector::{project, Filters, SearchFields, SortKey, StatusFilter};
pub use queue::{QueueController, QueueError, QueueState, Resolution};
pub use selection::{SelectionError, SelectionSet};
pub use store::EntityStore;
pub use workspace::{BatchApplication, PendingBatch, ReviewOutcome, Workspace};
