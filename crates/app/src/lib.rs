//! Earmark application layer
//!
//! Ties the viewer, annotation engine, audio companion and reading history
//! into one [`AppState`], with configuration and logging setup for hosts.

pub mod browser;
pub mod config;
pub mod state;

pub use browser::{Breadcrumb, FileBrowser, Selection};
pub use config::{AppConfig, ConfigError};
pub use state::{AppError, AppEvent, AppState};

use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber on stderr, filtered by `RUST_LOG`
/// plus `directives`. Directives that fail to parse are skipped.
pub fn init_logging(directives: &[&str]) {
    let mut filter = EnvFilter::from_default_env();
    for directive in directives {
        match directive.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(err) => eprintln!("ignoring log directive {directive:?}: {err}"),
        }
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
