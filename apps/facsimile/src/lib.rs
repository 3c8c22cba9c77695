//! # facsimile
//!
//! Library side of the Facsimile CLI: the snapshot document codec and the
//! `facsimile.toml` configuration. The cloning engine itself is
//! `facsimile-core`; nothing here copies values.

pub mod config;
pub mod document;

pub use config::{AppConfig, CloneSection, DEFAULT_CONFIG_FILE, OutputSection};
