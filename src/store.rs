use crate::model::{ActionBatchResult, Entity, EntityId};
use tracing::debug;

/// The current page of entities as last reported by the backend.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Vec<Entity>,
}

impl EntityStore {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    pub fn replace(&mut self, entities: Vec<Entity>) {
        self.entities = entities;
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Patch entities from confirmed outcomes. Failed outcomes leave their
    /// entity untouched; a confirmed delete removes it. Returns how many
    /// entities changed.
    pub fn apply(&mut self, result: &ActionBatchResult) -> usize {
        let mut changed = 0;
        for id in result.succeeded_ids() {
            match result.kind.resulting_status() {
                Some(status) => {
                    if let Some(entity) = self.entities.iter_mut().find(|e| &e.id == id) {
                        entity.status = status;
                        changed += 1;
                    }
                }
                None => {
                    let before = self.entities.len();
                    self.entities.retain(|e| &e.id != id);
                    changed += before - self.entities.len();
                }
            }
        }
        debug!(kind = %result.kind, changed, "applied batch result to store");
        changed
    }
}
