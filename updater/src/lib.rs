//! GT New Horizons daily updater library.
//!
//! This crate updates a MultiMC/Prism instance of the GT New Horizons modpack
//! to a specific daily build. It is used by the `gtnh-updater` binary and can
//! be driven programmatically with injected collaborators for testing.
//!
//! # Modules
//!
//! - [`artefact`] - Archive caching, download sources, extraction, and integrity checks
//! - [`backup`] - Rotating snapshots of the installation root and restore
//! - [`build_id`] - Semantic wrapper for daily build numbers
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - The persisted `config.json` store
//! - [`error`] - Top-level error type with recovery hints
//! - [`fetch`] - Source fallback chain for obtaining a build archive
//! - [`install`] - Rollback-safe replacement of installation subtrees
//! - [`instance`] - Installation root layout and validation
//! - [`mods`] - Injection of additional mods into the staged client
//! - [`output`] - Stderr formatting helpers
//! - [`pipeline`] - End-to-end update run
//! - [`prompt`] - Interactive version prompt
//! - [`resolution`] - Target build resolution
//! - [`status`] - Minecraft server status (MOTD) query
//! - [`storage`] - Storage and temporary directory layout

pub mod artefact;
pub mod backup;
pub mod build_id;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod install;
pub mod instance;
pub mod mods;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod resolution;
pub mod status;
pub mod storage;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
