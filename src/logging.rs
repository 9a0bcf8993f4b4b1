use slog::{o, Drain, Level, Logger};

/// Maps the number of `-v` flags to a log level
pub fn level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    }
}

/// Builds the root logger: terminal output on stderr behind an async drain
pub fn build_logger(verbosity: u8) -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(level(verbosity)).fuse();

    Logger::root(drain, o!("app" => env!("CARGO_PKG_NAME")))
}

/// A logger that drops every record
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}
