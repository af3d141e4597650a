//! # Adboard Backend Library
//!
//! Core library for Adboard, a classifieds backend: users post ads with an image
//! under a category, and a REST API creates, reads, updates, toggles and deletes them.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server, routing and multipart uploads
//! - **SQLx**: Asynchronous SQLite access; multi-step writes run in one transaction
//! - **Tokio**: Async runtime and file I/O for the image store
//!
//! ## Core Components
//!
//! - [`config`]: Layered configuration (embedded defaults, files, environment)
//! - [`db`]: Schema bootstrap and default categories
//! - [`error`]: Typed persistence failures and their HTTP mapping
//! - [`metrics`]: Operational counters, including failed image cleanups
//! - [`middleware`]: Shared-secret `Key` header check
//! - [`repository`]: Ad, user and category persistence workflows
//! - [`routes`]: HTTP handlers and the router
//! - [`state`]: Shared application state
//! - [`storage`]: Flat-directory image store
//! - [`types`]: Entities, commands and response bodies

pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod state;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;
