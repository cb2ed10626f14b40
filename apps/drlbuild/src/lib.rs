//! drlbuild core library.
//!
//! This crate exposes programmatic APIs for building rule projects: every
//! `.drl` rule file and `.xls` decision table is compiled by an external rule
//! compiler, and the compiler's result is turned into problems recorded
//! against that file.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `build`: Full/incremental traversal with cancellation.
//! - `reporter`: Outcome-to-diagnostic translation and problem list updates.
//! - `store`: The persistent problem list.
//! - `compiler`: Seams to the external compiler and spreadsheet converter.
//! - `runtime`: Installed runtime registry.
//! - `models`: Data models for artifacts, diagnostics, outcomes, runtimes.
//! - `output`: Human/JSON printers.
//! - `error`: Error types.
//! - `utils`: Console helpers.
pub mod build;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod reporter;
pub mod runtime;
pub mod store;
pub mod utils;
