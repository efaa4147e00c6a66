use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use log::debug;

use super::{Entity, EntityStore, Key};
use crate::errors::WikiError;

/// Largest entity the store accepts, matching the usual hosted datastore cap.
pub const DEFAULT_MAX_ENTITY_SIZE: usize = 1024 * 1024;

/// Process-local [`EntityStore`].
pub struct MemoryStore {
    entities: RwLock<BTreeMap<Key, Entity>>,
    next_id: AtomicI64,
    max_entity_size: usize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_max_entity_size(DEFAULT_MAX_ENTITY_SIZE)
    }

    /// Create an empty store that rejects entities larger than `max_entity_size` bytes
    pub fn with_max_entity_size(max_entity_size: usize) -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            max_entity_size,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.read().map(|entities| entities.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> WikiError {
    WikiError::Store("entity table lock poisoned".to_string())
}

impl EntityStore for MemoryStore {
    fn get_by_id(&self, kind: &str, id: i64, parent: Option<&Key>) -> Result<Option<Entity>, WikiError> {
        let key = match parent {
            Some(parent) => Key::with_parent(kind, id, parent),
            None => Key::new(kind, id),
        };
        let entities = self.entities.read().map_err(poisoned)?;
        Ok(entities.get(&key).cloned())
    }

    fn query_all(&self, kind: &str, ancestor: Option<&Key>) -> Result<Vec<Entity>, WikiError> {
        let entities = self.entities.read().map_err(poisoned)?;
        Ok(entities
            .iter()
            .filter(|(key, _)| key.kind() == kind)
            .filter(|(key, _)| ancestor.is_none_or(|ancestor| key.has_ancestor(ancestor)))
            .map(|(_, entity)| entity.clone())
            .collect())
    }

    fn put(&self, entity: &mut Entity) -> Result<Key, WikiError> {
        let size = entity.size();
        if size > self.max_entity_size {
            return Err(WikiError::Store(format!(
                "{} entity of {} bytes exceeds the {} byte limit",
                entity.kind(),
                size,
                self.max_entity_size
            )));
        }

        if entity.id().is_none() {
            entity.assign_id(self.next_id.fetch_add(1, Ordering::SeqCst));
        }
        let key = entity
            .key()
            .ok_or_else(|| WikiError::Store("entity has no id after allocation".to_string()))?;

        let mut entities = self.entities.write().map_err(poisoned)?;
        entities.insert(key.clone(), entity.clone());
        debug!("Stored entity {} ({} bytes)", key, size);
        Ok(key)
    }

    fn delete(&self, key: &Key) -> Result<(), WikiError> {
        let mut entities = self.entities.write().map_err(poisoned)?;
        entities.remove(key);
        debug!("Deleted entity {}", key);
        Ok(())
    }
}
