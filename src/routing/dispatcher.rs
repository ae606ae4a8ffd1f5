//! Request dispatch.
//!
//! Maps an inbound path to a redirect or a backend forward. Pure with respect
//! to the registry; no I/O happens here.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::backend::BackendEntry;
use crate::routing::registry::Registry;

/// Outcome of dispatching a request.
#[derive(Debug)]
pub enum Dispatch<'a> {
    /// Answer with `303 See Other` to the given location.
    Redirect(String),
    /// Relay the exchange to a backend.
    Forward(Forward<'a>),
}

/// A resolved backend and the path and query to request from it.
#[derive(Debug)]
pub struct Forward<'a> {
    pub backend: &'a BackendEntry,
    pub path_and_query: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no backend registered for label '{0}'")]
    UnknownRoute(String),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, self.to_string()).into_response()
    }
}

/// Resolves inbound paths against a shared [`Registry`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Decide what to do with a request for `path` and `query`.
    ///
    /// The query is never used for routing; it is carried into redirects and
    /// forwarded paths unchanged.
    pub fn dispatch(
        &self,
        path: &str,
        query: Option<&str>,
    ) -> Result<Dispatch<'_>, DispatchError> {
        if path == "/" {
            return match self.registry.root_redirect() {
                Some(target) => Ok(Dispatch::Redirect(format!("/{}", target))),
                None => Err(DispatchError::UnknownRoute(String::new())),
            };
        }

        // Second '/' separates the label from the remainder.
        let Some(index) = path.get(1..).and_then(|rest| rest.find('/')).map(|i| i + 1) else {
            return Ok(Dispatch::Redirect(build_uri(&format!("{}/", path), query)));
        };

        let label = &path[1..index];
        let remainder = &path[index..];
        let backend = self
            .registry
            .resolve(label)
            .ok_or_else(|| DispatchError::UnknownRoute(label.to_string()))?;

        Ok(Dispatch::Forward(Forward {
            backend,
            path_and_query: build_uri(&backend.rewrite_path(remainder), query),
        }))
    }
}

/// Join a path and an optional query, omitting `?` for an empty query.
pub fn build_uri(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    }
}
