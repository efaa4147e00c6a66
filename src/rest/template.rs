//! Placeholder substitution and layout wrapping.
//!
//! A template is a named text resource containing `{{name}}` placeholders.
//! Rendering is two explicit stages: the content template is substituted,
//! then, unless it is the layout itself, the result is substituted into the
//! layout as the `content` variable. The layout is never wrapped again.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use super::cache::Cache;
use super::html::Markup;
use super::value::{Value, Variables};
use crate::errors::WikiError;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").unwrap());

/// Cache key template for registry-provided values.
pub const VARIABLE_CACHE_KEY: &str = "template-variable:{}";

/// Source of raw template markup.
pub trait TemplateStore: Send + Sync {
    fn load(&self, name: &str) -> Result<String, WikiError>;
}

/// Templates read from `<dir>/<name>.html`.
pub struct FsTemplates {
    dir: PathBuf,
}

impl FsTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TemplateStore for FsTemplates {
    fn load(&self, name: &str) -> Result<String, WikiError> {
        if name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(WikiError::template(name, "invalid template name"));
        }
        let path = self.dir.join(format!("{}.html", name));
        fs::read_to_string(&path).map_err(|e| {
            warn!("Failed to read template {:?}: {}", path, e);
            WikiError::template(name, e)
        })
    }
}

/// Templates held in memory, keyed by name.
#[derive(Default)]
pub struct MemoryTemplates {
    templates: HashMap<String, String>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, markup: &str) -> Self {
        self.templates.insert(name.to_string(), markup.to_string());
        self
    }
}

impl TemplateStore for MemoryTemplates {
    fn load(&self, name: &str) -> Result<String, WikiError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| WikiError::template(name, "no such template"))
    }
}

pub type Provider = Box<dyn Fn() -> Result<Option<Value>, WikiError> + Send + Sync>;

/// Named zero-argument providers consulted for placeholders that the
/// per-render variables do not cover.
///
/// Populated once at startup and shared read-only afterwards.
#[derive(Default)]
pub struct Registry {
    providers: HashMap<String, Provider>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, provider: F) -> &mut Self
    where
        F: Fn() -> Result<Option<Value>, WikiError> + Send + Sync + 'static,
    {
        if self.providers.insert(name.to_string(), Box::new(provider)).is_some() {
            warn!("Template variable '{}' registered twice; keeping the latest", name);
        }
        self
    }

    pub fn with<F>(mut self, name: &str, provider: F) -> Self
    where
        F: Fn() -> Result<Option<Value>, WikiError> + Send + Sync + 'static,
    {
        self.register(name, provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}

/// The template renderer.
#[derive(Clone)]
pub struct Templates {
    store: Arc<dyn TemplateStore>,
    registry: Arc<Registry>,
    cache: Cache,
    layout: String,
}

impl Templates {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        registry: Arc<Registry>,
        cache: Cache,
        layout: impl Into<String>,
    ) -> Self {
        Self { store, registry, cache, layout: layout.into() }
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Render `name` with `variables`, wrapped in the layout, as UTF-8 bytes.
    pub fn render(&self, name: &str, variables: &Variables) -> Result<Vec<u8>, WikiError> {
        let content = self.render_content(name, variables)?;
        if name == self.layout {
            return Ok(content.into_bytes());
        }
        Ok(self.render_layout(content)?.into_bytes())
    }

    /// First stage: substitute one template without any wrapping.
    pub fn render_content(&self, name: &str, variables: &Variables) -> Result<String, WikiError> {
        let markup = self.store.load(name)?;
        self.substitute(name, &markup, variables)
    }

    /// Second stage: place already-rendered content into the layout.
    pub fn render_layout(&self, content: String) -> Result<String, WikiError> {
        let variables = Variables::new().with("content", Markup::new(content));
        self.render_content(&self.layout, &variables)
    }

    fn substitute(&self, template: &str, markup: &str, variables: &Variables) -> Result<String, WikiError> {
        let mut out = String::with_capacity(markup.len());
        let mut last = 0;
        let mut placeholders = 0;

        for captures in PLACEHOLDER.captures_iter(markup) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if name.as_str().contains('{') {
                return Err(WikiError::template(
                    template,
                    format!("malformed placeholder at byte {}", whole.start()),
                ));
            }

            out.push_str(&markup[last..whole.start()]);
            if let Some(value) = self.lookup(name.as_str(), variables)? {
                out.push_str(&value.to_html());
            }
            last = whole.end();
            placeholders += 1;
        }
        out.push_str(&markup[last..]);

        if markup.matches("{{").count() != placeholders {
            return Err(WikiError::template(template, "unterminated placeholder"));
        }

        debug!("Rendered template '{}' ({} placeholders)", template, placeholders);
        Ok(out)
    }

    fn lookup(&self, name: &str, variables: &Variables) -> Result<Option<Value>, WikiError> {
        if let Some(value) = variables.get(name) {
            return Ok(Some(value.clone()));
        }
        let Some(provider) = self.registry.get(name) else {
            return Ok(None);
        };
        self.cache.memoize(VARIABLE_CACHE_KEY).call(&[&name], || provider())
    }
}
