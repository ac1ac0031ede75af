//! Single-item review flow: one queued entity is under review at a time.
use crate::model::{ActionKind, Entity, EntityId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("cannot {operation} while the queue is idle")]
    InvalidState { operation: &'static str },
    #[error("entity {0} is not queued")]
    NotQueued(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Focused(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Approved,
    Rejected,
}

impl Resolution {
    pub fn action(&self) -> ActionKind {
        match self {
            Resolution::Approved => ActionKind::Validate,
            Resolution::Rejected => ActionKind::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub entity: Entity,
    pub resolution: Resolution,
}

/// Items keep the order they were loaded in; the controller never re-sorts.
#[derive(Debug, Clone, Default)]
pub struct QueueController {
    items: Vec<Entity>,
    focused: Option<EntityId>,
}

impl QueueController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> QueueState {
        match &self.focused {
            Some(id) => QueueState::Focused(id.clone()),
            None => QueueState::Idle,
        }
    }

    pub fn items(&self) -> &[Entity] {
        &self.items
    }

    pub fn focused(&self) -> Option<&Entity> {
        let id = self.focused.as_ref()?;
        self.items.iter().find(|e| &e.id == id)
    }

    /// Replace the queued items. A focus that survives the reload is kept,
    /// otherwise focus moves to the head.
    pub fn load(&mut self, items: Vec<Entity>) {
        self.items = items;
        let keep = self
            .focused
            .as_ref()
            .is_some_and(|id| self.items.iter().any(|e| &e.id == id));
        if !keep {
            self.focused = self.items.first().map(|e| e.id.clone());
        }
    }

    pub fn focus(&mut self, id: &EntityId) -> Result<(), QueueError> {
        if !self.items.iter().any(|e| &e.id == id) {
            return Err(QueueError::NotQueued(id.clone()));
        }
        self.focused = Some(id.clone());
        Ok(())
    }

    /// Remove the focused item and move focus to the new head.
    pub fn resolve(&mut self, resolution: Resolution) -> Result<Resolved, QueueError> {
        let id = self.focused.take().ok_or(QueueError::InvalidState {
            operation: "resolve",
        })?;
        let Some(pos) = self.items.iter().position(|e| e.id == id) else {
            self.focused = self.items.first().map(|e| e.id.clone());
            return Err(QueueError::NotQueued(id));
        };
        let entity = self.items.remove(pos);
        self.focused = self.items.first().map(|e| e.id.clone());
        Ok(Resolved { entity, resolution })
    }
}
