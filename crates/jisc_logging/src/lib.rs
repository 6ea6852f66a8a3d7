//! Shared logging utilities for JISC Wrangler binaries.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "info";
const DEBUG_LOG_FILTER: &str = "debug";

/// Logging configuration shared by JISC Wrangler binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Log file written for this run (truncated if it already exists).
    pub log_file: PathBuf,
    pub debug: bool,
    /// Keep the console quiet (warnings only) while a progress bar is drawn.
    pub quiet_console: bool,
}

/// Initialize tracing with a per-run file writer and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let file_writer = SharedFileWriter::create(&config.log_file)
        .with_context(|| format!("Failed to open log file: {}", config.log_file.display()))?;

    let file_filter = file_filter(config.debug);
    let console_filter = if config.debug {
        file_filter.clone()
    } else if config.quiet_console {
        EnvFilter::new("warn")
    } else {
        file_filter.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "This log file was generated by {} v{}",
        config.app_name,
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

/// `RUST_LOG` wins when set; otherwise `info`, or `debug` in debug mode.
fn file_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug {
            DEBUG_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    })
}

/// A log file shared between the subscriber's writer handles.
#[derive(Clone)]
pub struct SharedFileWriter {
    inner: Arc<Mutex<File>>,
}

impl SharedFileWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

pub struct SharedFileWriterGuard {
    inner: Arc<Mutex<File>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedFileWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn shared_writer_appends_from_every_handle() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("run").join("jw.log");
        let writer = SharedFileWriter::create(&path).unwrap();

        writer.make_writer().write_all(b"first\n").unwrap();
        let mut second = writer.make_writer();
        second.write_all(b"second\n").unwrap();
        second.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn create_truncates_previous_log() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("jw.log");
        fs::write(&path, "stale content\n").unwrap();

        let writer = SharedFileWriter::create(&path).unwrap();
        writer.make_writer().write_all(b"fresh\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }
}
