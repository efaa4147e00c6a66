//! Entity store contract.
//!
//! Entities live under hierarchical keys: a key names a kind and a numeric id
//! and may hang below a parent key. Lookups by id are exact on the whole key
//! path, so the same id under two different parents names two different
//! entities.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::WikiError;

pub use memory::MemoryStore;

/// Fully resolved entity key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    kind: String,
    id: i64,
    parent: Option<Box<Key>>,
}

impl Key {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self { kind: kind.into(), id, parent: None }
    }

    pub fn with_parent(kind: impl Into<String>, id: i64, parent: &Key) -> Self {
        Self { kind: kind.into(), id, parent: Some(Box::new(parent.clone())) }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }

    /// True when `ancestor` appears anywhere on this key's parent chain.
    pub fn has_ancestor(&self, ancestor: &Key) -> bool {
        let mut current = self.parent();
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = key.parent();
        }
        false
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent() {
            write!(f, "{}/", parent)?;
        }
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Scalar property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Text(String),
    Bytes(Vec<u8>),
}

impl Property {
    fn size(&self) -> usize {
        match self {
            Property::Text(text) => text.len(),
            Property::Bytes(bytes) => bytes.len(),
        }
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::Text(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Property {
    fn from(value: Vec<u8>) -> Self {
        Property::Bytes(value)
    }
}

/// A stored record: a kind, an id once it has been put, an optional parent and
/// a bag of named properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    kind: String,
    id: Option<i64>,
    parent: Option<Key>,
    properties: BTreeMap<String, Property>,
}

impl Entity {
    /// Create an entity that has not been stored yet
    pub fn new(kind: impl Into<String>, parent: Option<&Key>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            parent: parent.cloned(),
            properties: BTreeMap::new(),
        }
    }

    /// An entity that overwrites whatever is stored under `key` when put
    pub fn from_key(key: &Key) -> Self {
        Self {
            kind: key.kind.clone(),
            id: Some(key.id),
            parent: key.parent().cloned(),
            properties: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The complete key, available once the entity has an id.
    pub fn key(&self) -> Option<Key> {
        let id = self.id?;
        Some(match &self.parent {
            Some(parent) => Key::with_parent(self.kind.clone(), id, parent),
            None => Key::new(self.kind.clone(), id),
        })
    }

    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_ref()
    }

    pub fn set(&mut self, name: &str, value: impl Into<Property>) {
        self.properties.insert(name.to_string(), value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<Property>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.properties.get(name) {
            Some(Property::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match self.properties.get(name) {
            Some(Property::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Approximate stored size, used by stores that cap entity size.
    pub fn size(&self) -> usize {
        self.properties
            .iter()
            .map(|(name, value)| name.len() + value.size())
            .sum()
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub(crate) fn id(&self) -> Option<i64> {
        self.id
    }
}

/// Typed view over an [`Entity`] of one kind.
pub trait Model: Sized {
    const KIND: &'static str;

    fn from_entity(entity: &Entity) -> Result<Self, WikiError>;
}

/// Key-value entity store with parent/child keys.
///
/// Every method may fail with [`WikiError::Store`]; such failures are fatal
/// for the current request.
pub trait EntityStore: Send + Sync {
    /// Look up one entity by kind and id, scoped under `parent` when given.
    fn get_by_id(&self, kind: &str, id: i64, parent: Option<&Key>) -> Result<Option<Entity>, WikiError>;

    /// Every entity of `kind`, restricted to descendants of `ancestor` when given.
    fn query_all(&self, kind: &str, ancestor: Option<&Key>) -> Result<Vec<Entity>, WikiError>;

    /// Insert or overwrite. Entities without an id are allocated one.
    fn put(&self, entity: &mut Entity) -> Result<Key, WikiError>;

    fn delete(&self, key: &Key) -> Result<(), WikiError>;
}
