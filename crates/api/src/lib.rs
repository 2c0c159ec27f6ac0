//! HTTP API: route table, dispatcher, handlers and listeners.

pub mod app;
pub mod context;
pub mod server;
