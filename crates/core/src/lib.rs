//! Core types for mercado.
//!
//! This crate holds everything the release backends and the CLI share:
//! errors, settings, the HTTP session, platform normalization, artifact
//! selection, the tool model and catalog, installers, the local version
//! prober and the resolution service.

pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod install;
pub mod platform;
pub mod probe;
pub mod resolve;
pub mod select;
pub mod tools;

pub use catalog::Catalog;
pub use config::Settings;
pub use error::{Error, Result};
pub use http::HttpSession;
pub use platform::Platform;
pub use resolve::{Freshness, ToolRequest, ToolResolver};
