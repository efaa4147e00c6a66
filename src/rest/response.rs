use std::path::Path;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::request::Request;
use super::template::Templates;
use super::value::{Locatable, Value, Variables};
use crate::errors::WikiError;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Dotted JavaScript identifier path; other callback values are ignored.
static CALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").unwrap());

/// What a handler hands back to the dispatcher. Rendered exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Template { name: String, variables: Variables },
    Redirect { location: String },
    Json { value: serde_json::Value },
    Raw { body: Vec<u8>, content_type: String },
}

impl Response {
    pub fn template(name: &str) -> Self {
        Response::Template { name: name.to_string(), variables: Variables::new() }
    }

    /// Add a template variable.
    ///
    /// Only template responses carry variables; on a redirect, JSON or raw
    /// response the call is a no-op and `value` is dropped.
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        match self {
            Response::Template { name: template, variables } => Response::Template {
                name: template,
                variables: variables.with(name, value),
            },
            other => other,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Response::Redirect { location: location.into() }
    }

    pub fn redirect_to(target: &impl Locatable) -> Self {
        Response::Redirect { location: target.locate() }
    }

    pub fn json(value: &impl Serialize) -> Result<Self, WikiError> {
        Ok(Response::Json { value: serde_json::to_value(value)? })
    }

    pub fn raw(body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Response::Raw { body, content_type: content_type.into() }
    }

    /// Produce status, headers and body against the live request.
    pub fn render(&self, templates: &Templates, request: &Request) -> Result<Rendered, WikiError> {
        match self {
            Response::Template { name, variables } => Ok(Rendered::ok(
                HTML_CONTENT_TYPE,
                templates.render(name, variables)?,
            )),
            Response::Redirect { location } => Ok(Rendered {
                status: StatusCode::FOUND,
                headers: vec![(header::LOCATION, location.clone())],
                body: Vec::new(),
            }),
            Response::Json { value } => {
                let json = serde_json::to_string(value)?;
                let mut callbacks = request.query_values("callback");
                match (callbacks.next(), callbacks.next()) {
                    (Some(callback), None) if CALLBACK.is_match(callback) => Ok(Rendered::ok(
                        HTML_CONTENT_TYPE,
                        format!("<script type=\"text/javascript\">{}({})</script>", callback, json)
                            .into_bytes(),
                    )),
                    _ => Ok(Rendered::ok(JSON_CONTENT_TYPE, json.into_bytes())),
                }
            }
            Response::Raw { body, content_type } => Ok(Rendered::ok(content_type, body.clone())),
        }
    }
}

/// Media type for a static asset, picked from its file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => HTML_CONTENT_TYPE,
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => JSON_CONTENT_TYPE,
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Final output handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub status: StatusCode,
    pub headers: Vec<(header::HeaderName, String)>,
    pub body: Vec<u8>,
}

impl Rendered {
    fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![(header::CONTENT_TYPE, content_type.to_string())],
            body,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            headers: vec![(header::CONTENT_TYPE, HTML_CONTENT_TYPE.to_string())],
            body: b"<h1>404 Object Not Found</h1>".to_vec(),
        }
    }

    pub fn header(&self, name: &header::HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        for (name, value) in self.headers {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    response.headers_mut().insert(name, value);
                }
                Err(_) => log::warn!("Dropping unencodable {} header '{}'", name, value),
            }
        }
        response
    }
}
