use crate::models::PersistentId;
use std::collections::HashMap;

/// First sequential ID handed out in a run.
pub const FIRST_ENTITY_ID: u64 = 1;

/// Hands out small sequential IDs for persistent IDs, memoized for one export run.
#[derive(Debug, Clone)]
pub struct EntityIdRepository {
    next_id: u64,
    ids: HashMap<PersistentId, u64>,
}

impl EntityIdRepository {
    pub fn new() -> Self {
        Self {
            next_id: FIRST_ENTITY_ID,
            ids: HashMap::new(),
        }
    }

    /// Returns the ID already recorded for `persistent_id`, allocating the next one on first use.
    pub fn id_for(&mut self, persistent_id: PersistentId) -> u64 {
        if let Some(id) = self.ids.get(&persistent_id) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(persistent_id, id);
        id
    }

    pub fn get(&self, persistent_id: PersistentId) -> Option<u64> {
        self.ids.get(&persistent_id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for EntityIdRepository {
    fn default() -> Self {
        Self::new()
    }
}
