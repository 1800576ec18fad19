//! Concurrent tag registry.
//!
//! All mutations go through one `RwLock` around the tag map, so two writes
//! to the same id apply in some serial order and a concurrent read observes
//! either the pre-write or the post-write record, never a torn one.

use crate::error::RegistryError;
use crate::tag::{Tag, TagValue};
use parking_lot::RwLock;
use std::collections::HashMap;

/// The registry surface consumed by command handlers.
///
/// Handlers only need lookup and value update; administrative operations
/// (insert, remove, list) live on the concrete [`TagRegistry`]. Tests can
/// hand handlers any other implementation.
pub trait TagStore: Send + Sync {
    /// Returns a snapshot of the tag with the given id.
    fn get(&self, id: u16) -> Option<Tag>;

    /// Replaces the value of an existing tag.
    ///
    /// The new value must match the tag's data type; a tag's type is fixed
    /// for its lifetime.
    fn update_value(&self, id: u16, value: TagValue) -> Result<(), RegistryError>;
}

/// In-memory tag registry.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tags: RwLock<HashMap<u16, Tag>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag; an existing tag with the same id is replaced.
    pub fn insert(&self, tag: Tag) {
        self.tags.write().insert(tag.id, tag);
    }

    /// Removes a tag. Removing an absent id is a no-op.
    pub fn remove(&self, id: u16) {
        self.tags.write().remove(&id);
    }

    /// Returns all tags, ordered by id.
    pub fn list(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.tags.read().values().cloned().collect();
        tags.sort_by_key(|t| t.id);
        tags
    }

    /// Returns the number of registered tags.
    pub fn len(&self) -> usize {
        self.tags.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.read().is_empty()
    }
}

impl TagStore for TagRegistry {
    fn get(&self, id: u16) -> Option<Tag> {
        self.tags.read().get(&id).cloned()
    }

    fn update_value(&self, id: u16, value: TagValue) -> Result<(), RegistryError> {
        let mut tags = self.tags.write();
        let tag = tags.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        if value.data_type() != tag.data_type() {
            return Err(RegistryError::InvalidValue {
                expected: tag.data_type(),
                got: value.data_type(),
            });
        }
        tag.value = value;
        Ok(())
    }
}
