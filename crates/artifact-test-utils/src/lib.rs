//! Shared test utilities for the artifact-sync workspace.
//!
//! This crate is a dev-dependency only and is never published.
//!
//! # Modules
//!
//! - [`server`]: [`StubServer`], an in-process HTTP server playing the
//!   "latest" and "download" endpoints
//! - [`cache`]: [`TestCache`], a temporary cache root with seeding helpers

pub mod cache;
pub mod server;

pub use cache::TestCache;
pub use server::{StubResponse, StubServer};
