//! mercado - install and keep track of command-line tools
//!
//! The binary is a thin layer over [`mercado_core::ToolResolver`]: it loads
//! settings and the catalog, registers the built-in backends and renders
//! results and errors.

// Errors are rendered to stderr through miette
#![allow(clippy::print_stderr)]

/// Built-in catalog and user overlays.
pub mod catalog;
/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;

pub use cli::{CliError, exit_code_for};
