//! Catalog HTTP API: models, handler traits and routes.

pub mod models;
pub mod server;
