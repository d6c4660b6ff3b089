use clap::{Parser, Subcommand};
use mercado_core::tools::Label;
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

use crate::tracing::{LogLevel, TracingFormat};

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Tool resolution, installation or other runtime error exit code
pub const EXIT_TOOL: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// User input or configuration error (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(mercado::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Tool resolution or installation error (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(mercado::cli::tool))]
    Tool {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(mercado::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

/// Convert `mercado_core::Error` to the matching `CliError` variant.
///
/// - Unknown tools and versions, bad requests and configuration -> Config (exit code 2)
/// - Everything upstream, on disk or in an installer -> Tool (exit code 3)
///
/// The core error's help text is carried over.
impl From<mercado_core::Error> for CliError {
    fn from(err: mercado_core::Error) -> Self {
        use mercado_core::Error;

        let help = err.help().map(|h| h.to_string());
        let message = match &err {
            // Avoid "Configuration error: Configuration error:"
            Error::Configuration { message, .. } => message.clone(),
            other => other.to_string(),
        };
        match err {
            Error::ToolNotFound { .. }
            | Error::VersionNotFound { .. }
            | Error::Configuration { .. } => Self::Config { message, help },
            Error::NoArtifactForPlatform { .. }
            | Error::AmbiguousArtifact { .. }
            | Error::NotInstalled { .. }
            | Error::VersionUnparseable { .. }
            | Error::UpstreamUnavailable { .. }
            | Error::Installation { .. }
            | Error::Io { .. } => Self::Tool { message, help },
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Tool { .. } | CliError::Other { .. } => EXIT_TOOL,
    }
}

/// Render an error to stderr through miette.
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    eprintln!("{report:?}");
    // Ensure output is flushed before potential process exit
    let _ = io::stderr().flush();
}

/// Install and keep track of command-line tools.
#[derive(Parser, Debug)]
#[command(name = "mercado")]
#[command(about = "Install and keep track of command-line tools")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    /// Directory executables are installed into.
    #[arg(
        long,
        global = true,
        env = "MERCADO_INSTALL_DIR",
        help = "Directory executables are installed into",
        value_name = "DIR"
    )]
    pub install_dir: Option<PathBuf>,

    /// Settings file.
    #[arg(
        long,
        global = true,
        env = "MERCADO_CONFIG",
        help = "Settings file (default: <config dir>/mercado/config.toml)",
        value_name = "FILE"
    )]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tools in the catalog.
    #[command(about = "List the tools in the catalog")]
    List {
        /// Only tools with this label.
        #[arg(long, short = 'l', help = "Only tools with this label")]
        label: Option<Label>,
    },
    /// Install one or more tools.
    #[command(about = "Install one or more tools")]
    Install {
        /// Tools to install, as NAME or NAME@VERSION.
        #[arg(
            required = true,
            value_name = "TOOL",
            help = "Tools to install, as NAME or NAME@VERSION"
        )]
        tools: Vec<String>,
        /// Operating system to install for.
        #[arg(long, help = "Operating system to install for (default: this host)")]
        os: Option<String>,
        /// Architecture to install for.
        #[arg(long, help = "Architecture to install for (default: this host)")]
        arch: Option<String>,
        /// Resolve only, print what would be installed.
        #[arg(long, env = "DRY_RUN", help = "Resolve only, print what would be installed")]
        dry_run: bool,
    },
    /// Print the latest upstream version of a tool.
    #[command(about = "Print the latest upstream version of a tool")]
    Latest {
        /// Tool name.
        #[arg(value_name = "TOOL")]
        name: String,
    },
    /// Print the locally installed version of a tool.
    #[command(about = "Print the locally installed version of a tool")]
    Version {
        /// Tool name.
        #[arg(value_name = "TOOL")]
        name: String,
    },
    /// Compare installed tools with their latest releases.
    #[command(about = "Compare installed tools with their latest releases")]
    Outdated {
        /// Tools to check (default: every installed catalog tool).
        #[arg(value_name = "TOOL")]
        names: Vec<String>,
    },
    /// Remove an installed tool.
    #[command(about = "Remove an installed tool")]
    Uninstall {
        /// Tool name.
        #[arg(value_name = "TOOL")]
        name: String,
    },
}

impl Commands {
    /// Subcommand name, as typed.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Install { .. } => "install",
            Self::Latest { .. } => "latest",
            Self::Version { .. } => "version",
            Self::Outdated { .. } => "outdated",
            Self::Uninstall { .. } => "uninstall",
        }
    }
}

/// Parse command line arguments into a CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
