//! SQL-to-MongoDB translator: a relational `Connection`/`Cursor` surface
//! (blocking and cooperative variants) over a document store, for code that
//! expects a standard relational client protocol but talks to MongoDB.

pub mod config;
mod error;
mod value;
pub mod params;
mod binder;
mod ast;
mod parser;
mod plan;
mod store;
mod executor;
mod core;
pub mod facade;
pub mod url;
pub mod translation;

pub use error::{ErrorCode, MdbError};
pub use facade::{blocking, r#async};

use std::fs;
use std::path;

use tracing_subscriber::prelude::*;

/// Two-layer stdout + non-blocking daily rolling file subscriber, in the
/// shape `rsql`'s own `init_log` sets up. The crate never installs this
/// itself (it's a library, not a binary); call it from a binary or test
/// harness that wants the same setup.
pub fn init_tracing() {
    let log_dir = path::Path::new(config::LOG_PATH).parent().unwrap();
    let log_filename = path::Path::new(config::LOG_PATH)
        .file_name()
        .unwrap()
        .to_str()
        .unwrap();
    fs::create_dir_all(log_dir).unwrap();

    let stdout_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_thread_names(true)
        .with_level(true);

    let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    Box::leak(Box::new(guard));

    let file_log = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_names(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config::LOG_LEVEL))
        .with(stdout_log)
        .with(file_log)
        .init();
}
