use std::io;
use axum::{http::StatusCode, response::{Html, IntoResponse, Response}};
use thiserror::Error;

/// Errors that abort the current request.
///
/// Route misses and resource misses are not errors; they travel as `Ok(None)`
/// through the dispatcher and end up as a 404.
#[derive(Debug, Error)]
pub enum WikiError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("template `{name}` could not be loaded: {reason}")]
    Template { name: String, reason: String },
    #[error("invalid route pattern: {0}")]
    Route(#[from] regex::Error),
    #[error("entity store failure: {0}")]
    Store(String),
    /// Raised by [`CacheBackend`](crate::rest::CacheBackend) implementations
    /// that talk to an external store. The in-process backend never fails.
    #[error("cache failure: {0}")]
    Cache(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed request: {0}")]
    Request(String),
    #[error("handler argument {index} is not a resolved {kind}")]
    Binding { index: usize, kind: String },
    #[error("property `{property}` of {kind} is missing or has the wrong type")]
    Property { kind: String, property: String },
}

impl WikiError {
    pub fn template(name: &str, reason: impl ToString) -> Self {
        WikiError::Template { name: name.to_string(), reason: reason.to_string() }
    }

    pub fn property(kind: &str, property: &str) -> Self {
        WikiError::Property { kind: kind.to_string(), property: property.to_string() }
    }
}

impl IntoResponse for WikiError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>500 Internal Server Error</h1>"),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_is_a_generic_server_error() {
        let errors = vec![
            WikiError::Store("down".into()),
            WikiError::Cache("gone".into()),
            WikiError::template("index", "missing"),
            WikiError::property("Page", "name"),
        ];
        for err in errors {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn template_error_names_the_template() {
        let err = WikiError::template("view_page", "No such file");
        assert_eq!(err.to_string(), "template `view_page` could not be loaded: No such file");
    }
}
