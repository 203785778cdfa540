//! Release tracking layer for pre-release update checks
//!
//! This module fetches the release feed of the tracked component, caches the
//! artifacts derived from it, and decides whether a newer beta or release
//! candidate should be offered to the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Fetcher   │────▶│  Artifact   │◀────│   Engine    │
//! │  (GitHub)   │     │   Cache     │     │  (decide)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   │
//!                            ▼                   ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │    Store    │     │ Classifier  │
//!                     │(SQLite,mem) │     │ Semver, MD  │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`artifact`]: Keyed, time-boxed artifact cache with stale fallback
//! - [`cache`]: SQLite-backed artifact store
//! - [`changelog`]: Markdown rendering and maturity banners
//! - [`classifier`]: Latest pre-release selection and maturity classification
//! - [`engine`]: Update decision for an installed version
//! - [`error`]: Error types for cache and fetch operations
//! - [`fetcher`]: Fetcher trait for reading the release feed
//! - [`fetchers`]: Concrete fetcher implementations
//! - [`semver`]: Tag normalization and version comparison
//! - [`store`]: Storage backend trait and in-memory implementation
//! - [`types`]: Release records, descriptors and maturity levels

pub mod artifact;
pub mod cache;
pub mod changelog;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod fetchers;
pub mod semver;
pub mod store;
pub mod types;
