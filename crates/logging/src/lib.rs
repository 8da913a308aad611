//! Logging setup shared by the indexer binary and its tests.
//!
//! Everything else in the workspace logs through the `log` facade; this crate only decides where those records go.

/// Filter used when `RUST_LOG` isn't set.
pub const DEFAULT_FILTER: &str = "info";

fn format_now() -> String {
    use time::format_description::well_known::Rfc3339;

    let now = time::OffsetDateTime::now_utc();
    now.format(&Rfc3339).unwrap_or_else(|_| now.to_string())
}

/// Log to stderr, honoring `RUST_LOG` and falling back to [DEFAULT_FILTER].
///
/// If called multiple times in the same process, only applies once.
pub fn log_to_stderr() {
    log_to_stderr_with_filter(DEFAULT_FILTER);
}

/// Like [log_to_stderr], but with a caller-chosen fallback filter.
///
/// Tests use `"debug"` here to see per-batch commit lines.
pub fn log_to_stderr_with_filter(default_filter: &str) {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let env = env_logger::Env::default().default_filter_or(default_filter);
        let res = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                use std::io::Write;

                writeln!(
                    buf,
                    "{} {} time={} target={}",
                    record.level(),
                    record.args(),
                    format_now(),
                    record.target()
                )
            })
            .target(env_logger::Target::Stderr)
            .try_init();

        // Another logger (for example a test harness one) got there first; records still go somewhere.
        if res.is_err() {
            log::debug!("A logger was already installed; keeping it");
        }
    });
}
