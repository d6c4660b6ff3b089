//! mercado CLI entry point.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use mercado::cli::{self, CliError, EXIT_OK, exit_code_for, render_error};
use mercado::commands;
use mercado::tracing::{TracingConfig, command_span, init_tracing};
use tracing::Instrument;

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        ..Default::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let exit_code = match run(cli) {
        Ok(output) => {
            print!("{output}");
            EXIT_OK
        }
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: cli::Cli) -> Result<String, CliError> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::other(format!("Failed to create tokio runtime: {e}")))?;
    let span = command_span(cli.command.name());
    rt.block_on(commands::execute(cli).instrument(span))
}
