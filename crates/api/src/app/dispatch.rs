//! Request dispatcher: turns a raw HTTP request into a [`RequestContext`],
//! runs the matching handler and renders its [`Reply`].
//!
//! Mounted as the router's fallback, so every request passes through here and
//! the route table alone decides what exists.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{self, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value as JsonValue, json};

use crate::app::errors::{Reply, json_error};
use crate::app::router::{Method, RouteTable, normalize_path};
use crate::context::RequestContext;

/// Largest request body buffered for a handler (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub struct Dispatcher<S> {
    routes: RouteTable<S>,
    state: S,
}

impl<S: Clone> Dispatcher<S> {
    pub fn new(routes: RouteTable<S>, state: S) -> Self {
        Self { routes, state }
    }

    pub fn routes(&self) -> &RouteTable<S> {
        &self.routes
    }

    /// Route one request. Unmatched routes answer 404 `{}` whether or not the
    /// body could be read; a matched route with an unreadable body answers
    /// with the rejection's status and a JSON error.
    pub async fn dispatch(
        &self,
        method: &http::Method,
        uri: &Uri,
        headers: HeaderMap,
        body: Result<Bytes, BytesRejection>,
    ) -> Reply {
        let path = normalize_path(uri.path());

        let handler = Method::parse(method.as_str()).and_then(|m| Some((m, self.routes.lookup(&path, m)?)));
        let Some((method, handler)) = handler else {
            tracing::debug!(method = %method, path = %uri.path(), "no route");
            return Reply::not_found();
        };

        let body = match body {
            Ok(body) => body,
            Err(rejection) => return unreadable_body(&rejection),
        };

        let ctx = RequestContext {
            path,
            query: parse_query(uri),
            method,
            headers,
            payload: decode_payload(&body),
        };
        handler(self.state.clone(), ctx).await
    }
}

impl<S: Clone + Send + Sync + 'static> Dispatcher<S> {
    /// Mount the dispatcher as the fallback of an otherwise empty router.
    pub fn into_router(self) -> Router {
        Router::new()
            .fallback(serve::<S>)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(Arc::new(self))
    }
}

fn unreadable_body(rejection: &BytesRejection) -> Reply {
    let status = rejection.status();
    tracing::debug!(status = status.as_u16(), error = %rejection, "request body rejected");
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        json_error(status, "The request body is too large.")
    } else {
        json_error(status, "The request body could not be read.")
    }
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(query)| query)
        .unwrap_or_default()
}

/// Best-effort JSON decoding; an empty or malformed body is `{}`.
fn decode_payload(body: &[u8]) -> JsonValue {
    serde_json::from_slice(body).unwrap_or_else(|_| json!({}))
}

/// Router fallback handler.
///
/// The body is taken as a `Result` so that a rejected body (e.g. over
/// [`MAX_BODY_BYTES`]) still gets a JSON reply from the dispatcher.
pub async fn serve<S>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
    method: http::Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    S: Clone + Send + Sync + 'static,
{
    let reply = dispatcher.dispatch(&method, &uri, headers, body).await;
    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = reply.status.as_u16(),
        "request handled"
    );
    reply.into_response()
}
