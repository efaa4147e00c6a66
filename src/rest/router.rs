//! Ordered route table.
//!
//! Routes are tried in registration order. The first route whose anchored
//! pattern matches the path and whose method set accepts the method is the
//! only one invoked; whatever its handler returns is final. A handler that
//! returns no response (including a resource binder that failed to resolve)
//! yields a 404 without consulting later routes, so more specific patterns
//! must be registered before broader ones.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use log::{debug, info, warn};
use regex::Regex;

use super::request::Request;
use super::response::{Rendered, Response};
use super::template::Templates;
use crate::errors::WikiError;
use crate::store::{Entity, Model};

/// A positional handler argument: a raw path capture, or an entity that a
/// resource binder has already resolved from one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Raw(String),
    Entity(Entity),
}

impl Arg {
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Arg::Entity(entity) => Some(entity),
            Arg::Raw(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new(args: Vec<Arg>) -> Self {
        Self(args)
    }

    /// Raw arguments, in order. Groups that did not participate become empty.
    pub fn from_captures(captures: &regex::Captures<'_>) -> Self {
        Self(
            captures
                .iter()
                .skip(1)
                .map(|group| Arg::Raw(group.map(|m| m.as_str().to_string()).unwrap_or_default()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.0.get(index)
    }

    pub fn raw(&self, index: usize) -> Option<&str> {
        match self.0.get(index) {
            Some(Arg::Raw(raw)) => Some(raw),
            _ => None,
        }
    }

    pub fn entity(&self, index: usize) -> Option<&Entity> {
        self.0.get(index).and_then(Arg::as_entity)
    }

    /// The resolved entity at `index`, converted to its model.
    pub fn model<M: Model>(&self, index: usize) -> Result<M, WikiError> {
        match self.entity(index) {
            Some(entity) if entity.kind() == M::KIND => M::from_entity(entity),
            _ => Err(WikiError::Binding { index, kind: M::KIND.to_string() }),
        }
    }

    pub(crate) fn replace(&mut self, index: usize, arg: Arg) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = arg;
        }
    }
}

/// `Ok(None)` means "no response": the request ends in a 404.
pub type HandlerResult = Result<Option<Response>, WikiError>;

pub type Handler = Arc<dyn Fn(&Request, Args) -> HandlerResult + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Request, Args) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Methods a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Methods {
    Any,
    Only(Vec<Method>),
}

impl Methods {
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            Methods::Any => true,
            Methods::Only(methods) => methods.contains(method),
        }
    }
}

impl From<Method> for Methods {
    fn from(method: Method) -> Self {
        Methods::Only(vec![method])
    }
}

impl From<Vec<Method>> for Methods {
    fn from(methods: Vec<Method>) -> Self {
        if methods.is_empty() { Methods::Any } else { Methods::Only(methods) }
    }
}

impl<const N: usize> From<[Method; N]> for Methods {
    fn from(methods: [Method; N]) -> Self {
        Methods::from(methods.to_vec())
    }
}

struct Route {
    source: String,
    pattern: Regex,
    methods: Methods,
    handler: Handler,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.source)
            .field("methods", &self.methods)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. `pattern` is a regular expression matched against the
    /// whole path; its capture groups become the handler's arguments.
    pub fn route(
        mut self,
        pattern: &str,
        methods: impl Into<Methods>,
        handler: Handler,
    ) -> Result<Self, WikiError> {
        let compiled = Regex::new(&format!("^(?:{})$", pattern))?;
        self.routes.push(Route {
            source: pattern.to_string(),
            pattern: compiled,
            methods: methods.into(),
            handler,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Invoke the first matching route. `Ok(None)` when nothing matched or
    /// the matched handler produced no response.
    pub fn dispatch(&self, request: &Request) -> HandlerResult {
        for route in &self.routes {
            let Some(captures) = route.pattern.captures(request.path()) else {
                continue;
            };
            if !route.methods.accepts(request.method()) {
                continue;
            }
            debug!("{} {} matched route '{}'", request.method(), request.path(), route.source);
            return (route.handler)(request, Args::from_captures(&captures));
        }
        Ok(None)
    }

    /// Dispatch and render, converging every non-match on the 404 page.
    pub fn handle(&self, request: &Request, templates: &Templates) -> Result<Rendered, WikiError> {
        let rendered = match self.dispatch(request)? {
            Some(response) => response.render(templates, request)?,
            None => {
                warn!("No response for {} {}", request.method(), request.path());
                Rendered::not_found()
            }
        };
        info!("{} {} -> {}", request.method(), request.path(), rendered.status.as_u16());
        Ok(rendered)
    }
}
