use crate::errors::WikiError;
use crate::rest::Locatable;
use crate::store::{Entity, EntityStore, Key, Model};

pub const PAGE_KIND: &str = "Page";
pub const PHOTO_KIND: &str = "Photo";

/// A wiki page. The body is Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    key: Key,
    pub name: Option<String>,
    pub body: Option<String>,
}

impl Page {
    /// Store a new page
    pub fn create(store: &dyn EntityStore, name: &str, body: &str) -> Result<Self, WikiError> {
        let mut entity = Entity::new(PAGE_KIND, None)
            .with("name", name)
            .with("body", body);
        let key = store.put(&mut entity)?;
        Ok(Self { key, name: Some(name.to_string()), body: Some(body.to_string()) })
    }

    /// Every page, in key order
    pub fn all(store: &dyn EntityStore) -> Result<Vec<Self>, WikiError> {
        store
            .query_all(PAGE_KIND, None)?
            .iter()
            .map(Page::from_entity)
            .collect()
    }

    /// Write the current name and body back
    pub fn save(&self, store: &dyn EntityStore) -> Result<(), WikiError> {
        let mut entity = Entity::from_key(&self.key);
        if let Some(name) = &self.name {
            entity.set("name", name.as_str());
        }
        if let Some(body) = &self.body {
            entity.set("body", body.as_str());
        }
        store.put(&mut entity)?;
        Ok(())
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn id(&self) -> i64 {
        self.key.id()
    }

    pub fn photos(&self, store: &dyn EntityStore) -> Result<Vec<Photo>, WikiError> {
        store
            .query_all(PHOTO_KIND, Some(&self.key))?
            .iter()
            .map(Photo::from_entity)
            .collect()
    }
}

impl Model for Page {
    const KIND: &'static str = PAGE_KIND;

    fn from_entity(entity: &Entity) -> Result<Self, WikiError> {
        let key = entity.key().ok_or_else(|| WikiError::property(PAGE_KIND, "key"))?;
        Ok(Self {
            key,
            name: entity.text("name").map(str::to_string),
            body: entity.text("body").map(str::to_string),
        })
    }
}

impl Locatable for Page {
    fn locate(&self) -> String {
        format!("/pages/{}", self.key.id())
    }
}

/// An image attached to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    key: Key,
    pub data: Vec<u8>,
    pub content_type: String,
}

impl Photo {
    pub fn create(
        store: &dyn EntityStore,
        page: &Page,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<Self, WikiError> {
        let mut entity = Entity::new(PHOTO_KIND, Some(page.key()))
            .with("data", data.clone())
            .with("content_type", content_type);
        let key = store.put(&mut entity)?;
        Ok(Self { key, data, content_type: content_type.to_string() })
    }

    pub fn delete(&self, store: &dyn EntityStore) -> Result<(), WikiError> {
        store.delete(&self.key)
    }

    pub fn key(&self) -> &Key {
        &self.key
    }
}

impl Model for Photo {
    const KIND: &'static str = PHOTO_KIND;

    fn from_entity(entity: &Entity) -> Result<Self, WikiError> {
        let key = entity.key().ok_or_else(|| WikiError::property(PHOTO_KIND, "key"))?;
        if key.parent().is_none() {
            return Err(WikiError::property(PHOTO_KIND, "parent"));
        }
        let data = entity
            .bytes("data")
            .ok_or_else(|| WikiError::property(PHOTO_KIND, "data"))?;
        let content_type = entity
            .text("content_type")
            .ok_or_else(|| WikiError::property(PHOTO_KIND, "content_type"))?;
        Ok(Self { key, data: data.to_vec(), content_type: content_type.to_string() })
    }
}

impl Locatable for Photo {
    fn locate(&self) -> String {
        let page = self.key.parent().map(Key::id).unwrap_or_default();
        format!("/pages/{}/photos/{}", page, self.key.id())
    }
}
