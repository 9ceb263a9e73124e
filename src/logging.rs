use std::env;
use std::io;
use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_STDOUT_FILTER: &str = "info,llm_request=info,db_query=warn,sqlx=off";
const DEFAULT_FILE_FILTER: &str = "llm_request=debug,article_filter=debug,viral_detection=debug,info,sqlx=info";

/// Installs the stdout and daily-rolling file layers.
///
/// `RUST_LOG` replaces the stdout filter when set. Files go to `log_dir`, one
/// file per day, prefixed with `app_name`.
pub fn configure_logging(app_name: &str, log_dir: &str) {
    // sqlx logs every slow statement as a warning; keep those out of stdout
    let custom_filter = FilterFn::new(|metadata| {
        !(metadata.level() == &Level::WARN && metadata.target().starts_with("sqlx::query"))
    });

    let stdout_filter = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_STDOUT_FILTER.to_string());
    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(EnvFilter::new(stdout_filter))
        .with_filter(custom_filter);

    let file_appender = rolling::daily(log_dir, format!("{}.log", app_name));
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new(DEFAULT_FILE_FILTER));

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}
