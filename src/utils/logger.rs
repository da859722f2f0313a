//! Tracing setup for receipt runs.
//!
//! Both initializers honour `RUST_LOG` when it is set. Without it, the crate
//! logs at `info` and the SMTP and TLS stacks stay at `warn`, so a send run
//! does not print a line per SMTP command.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directives when `RUST_LOG` is unset. `-v` raises the crate to
/// `debug`, which logs column mapping, skipped blank rows and omitted fields.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "receipt_mailer=debug,lettre=info,rustls=warn,info"
    } else {
        "receipt_mailer=info,lettre=warn,rustls=warn,warn"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Human-readable output for interactive preview and send runs.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// One JSON object per event, for `--log-json` runs whose output is
/// collected by a scheduler. Per-record failures keep their row and stage
/// in the message.
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .json(),
        )
        .init();
}
