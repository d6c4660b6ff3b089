//! Error types for mercado operations.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for tool resolution and installation.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The requested tool is not part of the catalog, or the upstream
    /// source does not know it.
    #[error("Tool '{name}' was not found")]
    #[diagnostic(code(mercado::tool::not_found))]
    ToolNotFound {
        /// The tool name as requested (without any version pin).
        name: String,
        /// Hint pointing at how to discover supported tools.
        #[help]
        help: Option<String>,
    },

    /// The tool exists but the pinned version does not.
    #[error("Version '{version}' was not found for {tool}")]
    #[diagnostic(
        code(mercado::version::not_found),
        help("Run `mercado latest <tool>` to see the newest release")
    )]
    VersionNotFound {
        /// Tool name.
        tool: String,
        /// The version that was requested.
        version: String,
    },

    /// A version exists but nothing was published for the platform.
    #[error("There is no available artifact for {tool} {version} on {platform}")]
    #[diagnostic(
        code(mercado::artifact::no_platform),
        help("Try a different platform with --os/--arch")
    )]
    NoArtifactForPlatform {
        /// Tool name.
        tool: String,
        /// Resolved version.
        version: String,
        /// Requested platform, formatted as `os-arch`.
        platform: String,
    },

    /// Several artifacts survived selection and none could be preferred.
    #[error("Ambiguous artifacts for {tool} {version}: {}", .candidates.join(", "))]
    #[diagnostic(code(mercado::artifact::ambiguous))]
    AmbiguousArtifact {
        /// Tool name.
        tool: String,
        /// Resolved version.
        version: String,
        /// Every URL that survived the deciding tier.
        candidates: Vec<String>,
    },

    /// No local executable was found for the tool.
    #[error("{tool} is not installed")]
    #[diagnostic(
        code(mercado::local::not_installed),
        help("Install it with `mercado install <tool>`")
    )]
    NotInstalled {
        /// Tool name.
        tool: String,
    },

    /// The executable exists but its version output could not be parsed.
    #[error("Could not parse a version from {}", .path.display())]
    #[diagnostic(code(mercado::local::version_unparseable))]
    VersionUnparseable {
        /// Path of the probed executable.
        path: Box<Path>,
        /// Captured output of the last probe.
        output: String,
    },

    /// An upstream request failed after retries, or answered with an
    /// unexpected status.
    #[error("Upstream unavailable for {url}: {message}")]
    #[diagnostic(code(mercado::http::unavailable))]
    UpstreamUnavailable {
        /// The requested URL.
        url: String,
        /// What went wrong.
        message: String,
    },

    /// An installer failed (script exit status, unpacking, placement).
    #[error("Installation of {tool} failed: {message}")]
    #[diagnostic(code(mercado::install::failed))]
    Installation {
        /// Tool name.
        tool: String,
        /// Error message.
        message: String,
    },

    /// Invalid settings, catalog or request.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(mercado::config::invalid))]
    Configuration {
        /// The error message.
        message: String,
        /// Optional help text.
        #[help]
        help: Option<String>,
    },

    /// I/O error with path context.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(mercado::io::error))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// The path involved, if any.
        path: Option<Box<Path>>,
        /// Description of the operation that failed.
        operation: String,
    },
}

impl Error {
    /// Create a tool-not-found error with the standard discovery hint.
    #[must_use]
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound {
            name: name.into(),
            help: Some("Run `mercado list` to see all supported tools".to_string()),
        }
    }

    /// Create a version-not-found error.
    #[must_use]
    pub fn version_not_found(tool: impl Into<String>, version: impl Into<String>) -> Self {
        Self::VersionNotFound {
            tool: tool.into(),
            version: version.into(),
        }
    }

    /// Create a no-artifact-for-platform error.
    #[must_use]
    pub fn no_artifact(
        tool: impl Into<String>,
        version: impl Into<String>,
        platform: impl ToString,
    ) -> Self {
        Self::NoArtifactForPlatform {
            tool: tool.into(),
            version: version.into(),
            platform: platform.to_string(),
        }
    }

    /// Create an ambiguous-artifact error.
    #[must_use]
    pub fn ambiguous(
        tool: impl Into<String>,
        version: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        Self::AmbiguousArtifact {
            tool: tool.into(),
            version: version.into(),
            candidates,
        }
    }

    /// Create a not-installed error.
    #[must_use]
    pub fn not_installed(tool: impl Into<String>) -> Self {
        Self::NotInstalled { tool: tool.into() }
    }

    /// Create a version-unparseable error.
    #[must_use]
    pub fn version_unparseable(path: &Path, output: impl Into<String>) -> Self {
        Self::VersionUnparseable {
            path: path.into(),
            output: output.into(),
        }
    }

    /// Create an upstream-unavailable error.
    #[must_use]
    pub fn upstream(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an installation error.
    #[must_use]
    pub fn installation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Installation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text.
    #[must_use]
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an I/O error with context.
    #[must_use]
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io(source, None, "unspecified operation")
    }
}

/// Result type for mercado operations.
pub type Result<T> = std::result::Result<T, Error>;
