use env_logger::Logger;
use log::{Level, Log, Metadata, Record, SetLoggerError};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{LazyLock, Mutex};

const MAX_RETAINED: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Ring buffer of the most recent warnings and errors.
struct WarningHub {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl WarningHub {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(entry);
            while entries.len() > self.capacity {
                entries.pop_front();
            }
        }
    }

    fn recent(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }
}

static WARNINGS: LazyLock<WarningHub> = LazyLock::new(|| WarningHub::new(MAX_RETAINED));

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// env_logger for output, plus retention of everything at warn or above.
struct RetainingLogger {
    inner: Logger,
}

impl Log for RetainingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.inner.log(record);
        if record.level() <= Level::Warn {
            WARNINGS.push(LogEntry {
                timestamp_ms: now_ms(),
                level: record.level().to_string().to_lowercase(),
                target: record.target().to_string(),
                message: record.args().to_string(),
            });
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the logger. `RUST_LOG` wins over `default_filter`.
pub fn init(default_filter: &str) -> Result<(), SetLoggerError> {
    let inner = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).build();
    let max_level = inner.filter();
    log::set_boxed_logger(Box::new(RetainingLogger { inner }))?;
    log::set_max_level(max_level);
    Ok(())
}

/// Warnings and errors logged since startup, oldest first.
pub fn recent_warnings() -> Vec<LogEntry> {
    WARNINGS.recent()
}
