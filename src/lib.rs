//! Fulcrum - a declarative control plane and external authorization service for edge proxies.
//!
//! Fulcrum turns a single declarative document into a versioned, internally
//! consistent bundle of proxy-configuration resources and publishes it to a
//! node-keyed discovery store. A companion decision engine answers
//! per-request external-authorization checks: bearer token in, allow/deny
//! plus header-rewrite directives out. This library exposes the building
//! blocks so you can embed the pipeline or compose parts of it inside your
//! own application.
//!
//! # Features
//! - Typed configuration model with semantic validation (duplicate names and
//!   dangling references are errors, not silent overwrites)
//! - Pure resource compiler: listeners, route tables, clusters, endpoint sets
//! - Atomic, monotonically versioned snapshots with referential-integrity
//!   checks before publication
//! - Fail-closed authorization engine with credential translation
//! - Live configuration hot-reload (serial, last-known-good on failure)
//! - Metrics & structured tracing via `tracing`
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use fulcrum::{
//!     adapters::DiscoveryStore,
//!     core::{AuthzEngine, Processor},
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = fulcrum::config::loader::load_config("gateway.toml").await?;
//! let store = Arc::new(DiscoveryStore::new());
//! let engine = Arc::new(AuthzEngine::new());
//! let mut processor = Processor::new("node-1", store.clone(), engine.clone());
//! processor.process(&config).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping the pipeline and the decision engine inside `core`. The
//! discovery wire protocol and file-watching internals stay behind ports;
//! `core` never performs I/O beyond calling them.
//!
//! # Error Handling
//! All fallible APIs return `eyre::Result<T>` or a domain specific error type
//! (`ValidationError`, `CompileError`, `SnapshotError`, `PublishError`).
//!
//! # Concurrency
//! Shared state follows a single-writer, multi-reader discipline: the reload
//! task replaces whole `Arc`s (via `arc-swap` / `scc`), serving tasks only
//! ever read complete values. No field-by-field mutation of live state.
//!
//! # License
//! Apache-2.0.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{DiscoveryStore, FileConfigProvider},
    core::{AuthzEngine, Processor},
    ports::{ConfigProvider, SnapshotSink},
};
