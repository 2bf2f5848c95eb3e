use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "winch_bridge=info,winch_watch=info";

pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Log to stderr, or to a daily-rolled file in `log_dir` when given.
pub fn init(log_dir: Option<PathBuf>) -> Option<LoggingGuard> {
    let (writer, guard) = match log_dir {
        Some(dir) => {
            if let Err(err) = std::fs::create_dir_all(&dir) {
                eprintln!("logging disabled: cannot create {}: {err}", dir.display());
                return None;
            }
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "winch-watch.log"))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true),
    );

    if subscriber.try_init().is_err() {
        return None;
    }

    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(panic = %panic_info, "panic");
    }));

    Some(LoggingGuard { _guard: guard })
}
