use std::collections::HashMap;

use axum::http::HeaderMap;
use serde_json::{Value as JsonValue, json};

use crate::app::router::Method;

/// Everything a handler gets to see of an inbound request.
///
/// The body has already been decoded best-effort: anything that is not valid
/// JSON arrives as an empty object.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub path: String,
    pub query: HashMap<String, String>,
    pub method: Method,
    pub headers: HeaderMap,
    pub payload: JsonValue,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: HashMap::new(),
            method,
            headers: HeaderMap::new(),
            payload: json!({}),
        }
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }

    /// Trimmed query parameter, if present and non-empty.
    pub fn query_str(&self, name: &str) -> Option<String> {
        non_empty(self.query.get(name).map(String::as_str))
    }

    /// Trimmed string field of the payload, if present and non-empty.
    ///
    /// Non-string values count as absent.
    pub fn payload_str(&self, name: &str) -> Option<String> {
        non_empty(self.payload.get(name).and_then(JsonValue::as_str))
    }

    /// JSON truthiness of a payload field. Absent, `null`, `false`, `0` and
    /// `""` are false.
    pub fn payload_flag(&self, name: &str) -> bool {
        match self.payload.get(name) {
            None | Some(JsonValue::Null) => false,
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(JsonValue::String(s)) => !s.is_empty(),
            Some(JsonValue::Array(_) | JsonValue::Object(_)) => true,
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
