//! winch-watch: print the terminal size every time it changes.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use winch_bridge::{NotifierConfig, RegisterError, Registration};

const USAGE: &str = "usage: winch-watch [--config <file.json>] [--log-dir <dir>]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    log_dir: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().ok_or("--config needs a path")?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--log-dir" => {
                let value = args.next().ok_or("--log-dir needs a path")?;
                parsed.log_dir = Some(PathBuf::from(value));
            }
            "-h" | "--help" => return Err(String::new()),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }
    Ok(parsed)
}

fn load_config(path: Option<PathBuf>) -> std::io::Result<NotifierConfig> {
    match path {
        Some(path) => Ok(NotifierConfig::load(&path)?.apply_env()),
        None => Ok(NotifierConfig::from_env()),
    }
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("{msg}");
            }
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let _logging = logging::init(args.log_dir);

    let config = match load_config(args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config: {err}");
            return ExitCode::FAILURE;
        }
    };

    run(config)
}

/// Print the current size, then return the callback that prints each change.
fn size_printer() -> impl FnMut() + Send + 'static {
    let mut last = crossterm::terminal::size().ok();
    if let Some((cols, rows)) = last {
        println!("{cols}x{rows}");
    }

    move || match crossterm::terminal::size() {
        Ok(size) if Some(size) != last => {
            let (cols, rows) = size;
            tracing::info!(cols, rows, "terminal resized");
            println!("{cols}x{rows}");
            last = Some(size);
        }
        Ok(_) => tracing::debug!("resize notification without a size change"),
        Err(err) => tracing::warn!(%err, "failed to query terminal size"),
    }
}

/// Either error leaves the layout static; neither is fatal.
fn registration_or_static(result: Result<Registration, RegisterError>) -> Option<Registration> {
    match result {
        Ok(registration) => Some(registration),
        Err(RegisterError::PlatformUnsupported) => {
            tracing::warn!("resize notifications unavailable, layout stays static");
            None
        }
        Err(err) => {
            tracing::warn!(%err, "resize notifications refused, layout stays static");
            None
        }
    }
}

#[cfg(unix)]
fn run(config: NotifierConfig) -> ExitCode {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::sync::Arc;
    use winch_bridge::{ResizeNotifier, SigwinchBackend};

    let notifier = ResizeNotifier::with_backend(Arc::new(SigwinchBackend::default()), config);
    let registration = registration_or_static(notifier.register(size_printer()));

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(err) => {
            tracing::error!(%err, "failed to install termination handlers");
            return ExitCode::FAILURE;
        }
    };
    if let Some(sig) = signals.forever().next() {
        tracing::debug!(signal = sig, "terminating");
    }

    if let Some(registration) = registration {
        registration.unregister();
    }
    let stats = notifier.stats();
    tracing::info!(
        signals = stats.signals,
        invocations = stats.invocations,
        panics = stats.panics,
        "resize watch finished"
    );
    ExitCode::SUCCESS
}

/// Without resize notifications there is nothing to watch: report the size once.
#[cfg(not(unix))]
fn run(config: NotifierConfig) -> ExitCode {
    let _ = config;
    let _ = registration_or_static(winch_bridge::register(size_printer()));
    ExitCode::SUCCESS
}
