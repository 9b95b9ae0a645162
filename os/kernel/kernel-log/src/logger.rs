use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use kernel_sync::RwSpinLock;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Number of records kept before the oldest is dropped.
pub const LOG_CAPACITY: usize = 256;

/// One captured record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    pub target: String,
    pub message: String,
}

pub struct KernelLogger {
    /// `LevelFilter` as `usize`, so the level can change after install.
    max_level: AtomicUsize,
    lines: RwSpinLock<VecDeque<LogLine>>,
}

static LOGGER: KernelLogger = KernelLogger::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);

impl Default for KernelLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelLogger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_level: AtomicUsize::new(LevelFilter::Trace as usize),
            lines: RwSpinLock::new(VecDeque::new()),
        }
    }

    /// Install the global sink at `max_level`.
    ///
    /// Installing twice keeps the first sink and only updates the level, so
    /// independent callers (e.g. several test binaries' fixtures) may all
    /// call this.
    ///
    /// # Errors
    /// Another logger implementation already owns the `log` facade.
    pub fn init(max_level: LevelFilter) -> Result<&'static Self, SetLoggerError> {
        LOGGER.set_level(max_level);
        if !INSTALLED.swap(true, Ordering::AcqRel)
            && let Err(e) = log::set_logger(&LOGGER)
        {
            INSTALLED.store(false, Ordering::Release);
            return Err(e);
        }
        log::set_max_level(max_level);
        Ok(&LOGGER)
    }

    /// The global sink, whether or not it has been installed.
    #[must_use]
    pub fn global() -> &'static Self {
        &LOGGER
    }

    pub fn set_level(&self, max_level: LevelFilter) {
        self.max_level.store(max_level as usize, Ordering::Relaxed);
    }

    #[must_use]
    pub fn level(&self) -> LevelFilter {
        match self.max_level.load(Ordering::Relaxed) {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Copy of the captured records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<LogLine> {
        self.lines.with_read(|lines| lines.iter().cloned().collect())
    }

    /// Remove and return the captured records, oldest first.
    pub fn take(&self) -> Vec<LogLine> {
        self.lines.with_write(|lines| lines.drain(..).collect())
    }

    pub fn clear(&self) {
        self.lines.with_write(VecDeque::clear);
    }

    fn push(&self, line: LogLine) {
        self.lines.with_write(|lines| {
            if lines.len() == LOG_CAPACITY {
                lines.pop_front();
            }
            lines.push_back(line);
        });
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level()
    }

    fn log(&self, record: &Record) {
        if !cfg!(feature = "enabled") || !self.enabled(record.metadata()) {
            return;
        }

        self.push(LogLine {
            level: record.level(),
            target: record.target().to_string(),
            message: format!("{}", record.args()),
        });
    }

    fn flush(&self) {
        // no-op: records are stored synchronously
    }
}
