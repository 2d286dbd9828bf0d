use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. The terminal belongs to the countdown,
/// so logs go to a file; `RUST_LOG` overrides the level.
pub fn init(verbose: bool) {
    let default = if verbose { "ttimer=debug" } else { "ttimer=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    match open_log_file() {
        Some(file) => builder.with_writer(Mutex::new(file)).init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}

pub fn log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ttimer")
        .join("ttimer.log")
}

fn open_log_file() -> Option<File> {
    let path = log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_ends_with_expected() {
        assert!(log_path().ends_with("ttimer/ttimer.log"));
    }
}
