//! Client archive handling: caching, download sources, extraction, and
//! integrity checks.
//!
//! # Sub-modules
//!
//! - [`cache`] - Build-keyed archive cache with corrupt-entry eviction.
//! - [`download`] - HTTP transport trait, `ureq` implementation, and chunked streaming.
//! - [`extraction`] - Zip extraction with path traversal protection and nested-archive handling.
//! - [`github`] - GitHub Actions artifact source (authenticated, slow).
//! - [`mirror`] - Mirror source (unauthenticated, fast).
//! - [`source`] - The [`source::ArchiveSource`] trait and per-source failures.
//! - [`verification`] - Full archive integrity scan.

pub mod cache;
pub mod download;
pub mod extraction;
pub mod github;
pub mod mirror;
pub mod source;
pub mod verification;
