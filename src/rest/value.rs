use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::html::{Markup, escape};

/// Entities with a canonical URL.
pub trait Locatable {
    fn locate(&self) -> String;
}

/// A value substituted into a template placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Plain text, escaped on output.
    Text(String),
    /// Pre-rendered markup, inserted verbatim.
    Markup(Markup),
    /// The canonical URL of an entity, escaped on output.
    Location(String),
}

impl Value {
    pub fn location(target: &impl Locatable) -> Self {
        Value::Location(target.locate())
    }

    /// The text that replaces the placeholder.
    pub fn to_html(&self) -> String {
        match self {
            Value::Markup(markup) => markup.as_str().to_string(),
            Value::Text(text) | Value::Location(text) => escape(text),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Markup> for Value {
    fn from(value: Markup) -> Self {
        Value::Markup(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Text(value.to_string())
    }
}

/// Per-render variable set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables(BTreeMap<String, Value>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
