use std::io;
use tracing_subscriber::EnvFilter;

/// Map the `-v` count onto a filter. `RUST_LOG` wins when set.
pub fn filter_for(verbose_level: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let filter_str = match verbose_level {
        0 => "warn,aegis=info",
        1 => "info,aegis=debug",
        _ => "debug,aegis=trace",
    };
    EnvFilter::new(filter_str)
}

/// Logs always go to stderr so stdout stays machine-readable.
pub fn setup_logging(verbose_level: u8) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose_level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(verbose_level > 1)
        .with_line_number(verbose_level > 1)
        .with_level(true)
        .with_writer(io::stderr)
        .try_init();

    if let Err(e) = result {
        eprintln!("Warning: logging was already initialized: {e}");
    }
}
