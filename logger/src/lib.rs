//! Lightweight diagnostics logger for the emulation core.
//!
//! The whole crate is gated behind the `logger` cargo feature: with the
//! feature off, [`log`] compiles down to nothing, so the core's hot path
//! pays no formatting cost in normal runs.

#[cfg(feature = "logger")]
use chrono::Utc;
#[cfg(feature = "logger")]
use once_cell::sync::OnceCell;
#[cfg(feature = "logger")]
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    sync::Mutex,
};

#[cfg(feature = "logger")]
static LOGGER: OnceCell<Logger> = OnceCell::new();

/// Where log lines end up: the console or a file under the temp directory.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum LogKind {
    STDOUT,

    /// Logs to /tmp/tangerine-<timestamp>.log
    FILE,
}

#[cfg(feature = "logger")]
struct Logger {
    sink: Mutex<Box<dyn Write + Send>>,
}

#[cfg(feature = "logger")]
impl Logger {
    fn new(kind: LogKind) -> Self {
        let sink: Box<dyn Write + Send> = match kind {
            LogKind::STDOUT => Box::new(io::stdout()),
            LogKind::FILE => {
                let filename = format!("tangerine-{}.log", Utc::now().timestamp());
                let path = std::env::temp_dir().join(filename);
                println!("Logging to file: {path:?}");
                // BufWriter batches writes, the file sink would be unusably
                // slow otherwise.
                Box::new(BufWriter::new(File::create(path).unwrap()))
            }
        };

        Self {
            sink: Mutex::new(sink),
        }
    }

    fn log<T>(&self, data: T)
    where
        T: std::fmt::Display,
    {
        if let Ok(mut sink) = self.sink.lock() {
            let now = Utc::now();
            writeln!(sink, "[{}] {data}", now.format("%H:%M:%S%.3f")).unwrap();
        }
    }

    fn flush(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            sink.flush().ok();
        }
    }
}

#[cfg(feature = "logger")]
pub fn init_logger(kind: LogKind) {
    LOGGER.set(Logger::new(kind)).ok();
}

pub fn log<T>(data: T)
where
    T: std::fmt::Display,
{
    let _ = data;
    #[cfg(feature = "logger")]
    if let Some(logger) = LOGGER.get() {
        logger.log(data);
    }
}

/// Forces any buffered lines out to the sink. Useful right before a
/// controlled shutdown or a panic report.
pub fn flush() {
    #[cfg(feature = "logger")]
    if let Some(logger) = LOGGER.get() {
        logger.flush();
    }
}
