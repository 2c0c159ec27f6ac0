//! Startup-time route table.
//!
//! Each resource declares `(method, sub-path) -> handler` pairs against its
//! base path. The builder collects every declaration in order, rejects
//! duplicates, and freezes the result into a two-level map
//! (`path -> method -> handler`) before the server starts accepting requests.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::app::errors::{IntoReply, Reply};
use crate::context::RequestContext;

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Case-insensitive parse; anything else has no routes.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Reply> + Send>>;

/// A type-erased endpoint implementation.
pub type Handler<S> = Arc<dyn Fn(S, RequestContext) -> HandlerFuture + Send + Sync>;

/// Strip leading and trailing slashes.
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn join_path(base: &str, sub_path: &str) -> String {
    let base = base.trim_matches('/');
    let sub_path = sub_path.trim_matches('/');
    match (base.is_empty(), sub_path.is_empty()) {
        (_, true) => base.to_string(),
        (true, false) => sub_path.to_string(),
        (false, false) => format!("{base}/{sub_path}"),
    }
}

fn boxed<S, F, Fut, R>(handler: F) -> Handler<S>
where
    S: 'static,
    F: Fn(S, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + 'static,
{
    Arc::new(move |state: S, ctx: RequestContext| -> HandlerFuture {
        let fut = handler(state, ctx);
        Box::pin(async move { fut.await.into_reply() })
    })
}

/// A group of endpoints sharing a base path (e.g. `users`).
pub trait Resource<S> {
    fn base_path(&self) -> &str;

    fn declare(&self, routes: &mut Routes<S>);
}

struct RouteEntry<S> {
    method: Method,
    path: String,
    handler: Handler<S>,
}

/// Registration surface handed to [`Resource::declare`].
///
/// Sub-paths are relative to the resource's base path; `""` is the base path
/// itself.
pub struct Routes<S> {
    base: String,
    entries: Vec<RouteEntry<S>>,
}

impl<S: 'static> Routes<S> {
    fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            entries: Vec::new(),
        }
    }

    fn register<F, Fut, R>(&mut self, method: Method, sub_path: &str, handler: F) -> &mut Self
    where
        F: Fn(S, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.entries.push(RouteEntry {
            method,
            path: join_path(&self.base, sub_path),
            handler: boxed(handler),
        });
        self
    }

    pub fn get<F, Fut, R>(&mut self, sub_path: &str, handler: F) -> &mut Self
    where
        F: Fn(S, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::Get, sub_path, handler)
    }

    pub fn post<F, Fut, R>(&mut self, sub_path: &str, handler: F) -> &mut Self
    where
        F: Fn(S, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::Post, sub_path, handler)
    }

    pub fn put<F, Fut, R>(&mut self, sub_path: &str, handler: F) -> &mut Self
    where
        F: Fn(S, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::Put, sub_path, handler)
    }

    pub fn delete<F, Fut, R>(&mut self, sub_path: &str, handler: F) -> &mut Self
    where
        F: Fn(S, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.register(Method::Delete, sub_path, handler)
    }
}

/// Two routes claimed the same path and method.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("conflicting handlers registered for {method} '/{path}'")]
pub struct RouteConflict {
    pub method: Method,
    pub path: String,
}

/// Collects declarations from every resource, in order.
pub struct RouteTableBuilder<S> {
    entries: Vec<RouteEntry<S>>,
}

impl<S> Default for RouteTableBuilder<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S: 'static> RouteTableBuilder<S> {
    pub fn resource(mut self, resource: &dyn Resource<S>) -> Self {
        let mut routes = Routes::new(resource.base_path());
        resource.declare(&mut routes);
        self.entries.extend(routes.entries);
        self
    }

    /// Validate uniqueness and freeze into a lookup table.
    pub fn build(self) -> Result<RouteTable<S>, RouteConflict> {
        let mut routes: HashMap<String, HashMap<Method, Handler<S>>> = HashMap::new();
        for entry in self.entries {
            let by_method = routes.entry(entry.path.clone()).or_default();
            if by_method.contains_key(&entry.method) {
                return Err(RouteConflict {
                    method: entry.method,
                    path: entry.path,
                });
            }
            by_method.insert(entry.method, entry.handler);
        }
        Ok(RouteTable { routes })
    }
}

/// Frozen `path -> method -> handler` map.
pub struct RouteTable<S> {
    routes: HashMap<String, HashMap<Method, Handler<S>>>,
}

impl<S> RouteTable<S> {
    pub fn builder() -> RouteTableBuilder<S> {
        RouteTableBuilder::default()
    }

    /// `path` must already be normalized (see [`normalize_path`]).
    pub fn lookup(&self, path: &str, method: Method) -> Option<&Handler<S>> {
        self.routes.get(path)?.get(&method)
    }

    /// Every registered `(method, path)`, sorted for stable output.
    pub fn entries(&self) -> Vec<(Method, &str)> {
        let mut out: Vec<(Method, &str)> = self
            .routes
            .iter()
            .flat_map(|(path, by_method)| by_method.keys().map(move |m| (*m, path.as_str())))
            .collect();
        out.sort_by(|a, b| a.1.cmp(b.1).then(a.0.as_str().cmp(b.0.as_str())));
        out
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> fmt::Debug for RouteTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries()).finish()
    }
}
