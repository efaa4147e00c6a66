//! HTTP boundary: axum in front of the route table.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path as AxumPath, Query, State};
use axum::http::{HeaderMap, Method, header};
use axum::routing::get;
use axum::{Form, Router as AxumRouter};
use cookie::Cookie;
use log::debug;

use crate::config::Config;
use crate::errors::WikiError;
use crate::rest::{
    Cache, FsTemplates, Rendered, Request, Response, Router, Session, Templates, UploadedFile, content_type_for,
};
use crate::store::EntityStore;
use crate::wiki::Wiki;

pub const SESSION_COOKIE: &str = "rialto_session";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub templates: Templates,
    pub static_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(router: Router, templates: Templates, static_dir: PathBuf) -> Self {
        Self { router: Arc::new(router), templates, static_dir: Arc::new(static_dir) }
    }

    /// Wire the wiki over `store` and `cache` with file-system templates.
    pub fn build(config: &Config, store: Arc<dyn EntityStore>, cache: Cache) -> Result<Self, WikiError> {
        let wiki = Wiki::new(store, cache.clone());
        let templates = Templates::new(
            Arc::new(FsTemplates::new(config.theme_dir.as_ref().clone())),
            Arc::new(wiki.registry()),
            cache,
            config.layout.clone(),
        );
        Ok(Self::new(wiki.router()?, templates, config.static_dir.as_ref().clone()))
    }
}

pub fn app(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/static/*path", get(handle_static))
        .fallback(handle_request)
        .with_state(state)
}

/// Convert, dispatch, render.
pub async fn handle_request(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<Rendered, WikiError> {
    let request = read_request(request).await?;
    state.router.handle(&request, &state.templates)
}

fn rejected(rejection: impl std::fmt::Display) -> WikiError {
    WikiError::Request(rejection.to_string())
}

/// Build the framework's view of an HTTP request, reading the form body.
pub async fn read_request(request: axum::extract::Request) -> Result<Request, WikiError> {
    let method = request.method().clone();
    let session = Session::new(session_id(request.headers()));
    let mut rest = Request::new(method.clone(), request.uri().path()).with_session(session);

    let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(request.uri()).map_err(rejected)?;
    for (name, value) in &query {
        rest = rest.with_query(name, value);
    }

    if method == Method::GET || method == Method::HEAD {
        return Ok(rest);
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &()).await.map_err(rejected)?;
        while let Some(field) = multipart.next_field().await.map_err(rejected)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await.map_err(rejected)?.to_vec();
                    debug!("Received upload '{}' ({}, {} bytes)", filename, content_type, data.len());
                    rest = rest.with_file(&name, UploadedFile { filename: Some(filename), content_type, data });
                }
                None => {
                    let text = field.text().await.map_err(rejected)?;
                    rest = rest.with_text(&name, &text);
                }
            }
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(rejected)?;
        for (name, value) in &fields {
            rest = rest.with_text(name, value);
        }
    }

    Ok(rest)
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
}

/// Handle static theme asset requests
pub async fn handle_static(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Rendered, WikiError> {
    let relative = Path::new(&path);
    let safe = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    let requested = state.static_dir.join(relative);

    if !safe || !requested.is_file() {
        debug!("Static asset not found: '{}'", path);
        return Ok(Rendered::not_found());
    }

    let bytes = std::fs::read(&requested)?;
    let request = Request::get(format!("/static/{}", path));
    Response::raw(bytes, content_type_for(&requested)).render(&state.templates, &request)
}
