use {
    crate::utils::oserror::OsError,
    log::{Level, Log, Metadata, Record},
    std::{
        cell::RefCell,
        io::Write,
        sync::{
            Arc, OnceLock,
            atomic::{AtomicU32, Ordering::Relaxed},
        },
        time::SystemTime,
    },
    uapi::{Fd, OwnedFd},
};

thread_local! {
    static BUFFER: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

static LOGGER: OnceLock<Arc<Logger>> = OnceLock::new();

pub struct Logger {
    level: AtomicU32,
    file: OwnedFd,
}

impl Logger {
    /// Installs a logger that writes to a duplicate of stderr.
    ///
    /// Only the first call installs a logger. Later calls update the level of the
    /// installed logger and return it.
    pub fn install_stderr(level: Level) -> Result<Arc<Self>, OsError> {
        if let Some(logger) = LOGGER.get() {
            logger.set_level(level);
            return Ok(logger.clone());
        }
        let file = uapi::fcntl_dupfd_cloexec(2, 0)?;
        let slf = Arc::new(Self {
            level: AtomicU32::new(level as _),
            file,
        });
        let logger = LOGGER.get_or_init(|| slf.clone()).clone();
        if Arc::ptr_eq(&logger, &slf) {
            let res = log::set_boxed_logger(Box::new(LogWrapper {
                logger: slf.clone(),
            }));
            if res.is_ok() {
                log::set_max_level(level.to_level_filter());
            }
        }
        Ok(logger)
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as _, Relaxed);
        log::set_max_level(level.to_level_filter());
    }

    pub fn level(&self) -> u32 {
        self.level.load(Relaxed)
    }
}

struct LogWrapper {
    logger: Arc<Logger>,
}

impl Log for LogWrapper {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() as u32 <= self.logger.level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        BUFFER.with_borrow_mut(|buffer| {
            buffer.clear();
            let now = humantime::format_rfc3339_millis(SystemTime::now());
            let _ = match record.module_path() {
                Some(mp) => writeln!(
                    buffer,
                    "[{} {:5} {}] {}",
                    now,
                    record.level(),
                    mp,
                    record.args(),
                ),
                None => writeln!(buffer, "[{} {:5}] {}", now, record.level(), record.args()),
            };
            let mut fd = Fd::new(self.logger.file.raw());
            let _ = fd.write_all(buffer);
        });
    }

    fn flush(&self) {
        // nothing
    }
}
