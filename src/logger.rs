use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use time::macros::format_description;

pub enum LogOutput {
    Stdout,
    Stderr,
}

pub struct Logger {
    pub write_to_file: bool,
    pub write_to_std: Option<LogOutput>,
    pub severity: Level,
    pub file: Option<Arc<Mutex<File>>>,
    pub enable_colors: bool,
}

impl Logger {
    /// Create a new logger
    pub fn new(
        file_path: Option<PathBuf>,
        severity: Option<Level>,
        write_to_std: Option<LogOutput>,
        write_to_file: bool,
        enable_colors: bool,
    ) -> Self {
        let path = file_path.unwrap_or_else(default_log_path);

        let mut file = None;
        if write_to_file {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            file = File::create(&path).ok().map(|f| Arc::new(Mutex::new(f)));
        }

        Logger {
            write_to_file,
            write_to_std,
            severity: severity.unwrap_or(Level::Info),
            file,
            enable_colors,
        }
    }

    fn timestamp() -> String {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        OffsetDateTime::now_utc().format(format).unwrap_or_default()
    }

    fn color(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[36m",
            Level::Debug => "\x1b[35m",
            Level::Trace => "\x1b[37m",
        }
    }

    /// Initialize logger from `RIALTO_LOG`/`RUST_LOG`, `RIALTO_LOG_FILE` and `NO_COLOR`
    pub fn init() -> Result<(), log::SetLoggerError> {
        let severity = std::env::var("RIALTO_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string())
            .parse::<Level>()
            .unwrap_or(Level::Info);

        let file_path = std::env::var("RIALTO_LOG_FILE").ok().filter(|p| !p.is_empty());
        let write_to_file = std::env::var("RIALTO_LOG_FILE").is_ok();
        let enable_colors = std::env::var("NO_COLOR").is_err();

        let logger = Logger::new(
            file_path.map(PathBuf::from),
            Some(severity),
            Some(LogOutput::Stderr),
            write_to_file,
            enable_colors,
        );
        log::set_max_level(LevelFilter::Trace);
        log::set_logger(Box::leak(Box::new(logger)))?;
        Ok(())
    }

    fn format(&self, record: &Record, colored: bool) -> String {
        let timestamp = Self::timestamp();
        let level = record.level();
        if colored {
            let color = Self::color(level);
            format!("{color}[{timestamp}] {level}\x1b[0m {} {}\n", record.target(), record.args())
        } else {
            format!("[{timestamp}] {level} {} {}\n", record.target(), record.args())
        }
    }
}

fn default_log_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    let path = "C:\\ProgramData\\rialto\\rialto.log";
    #[cfg(target_os = "macos")]
    let path = "/Library/Logs/rialto/rialto.log";
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let path = "/var/log/rialto/rialto.log";
    PathBuf::from(path)
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.severity
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if let Some(output) = &self.write_to_std {
            let line = self.format(record, self.enable_colors);
            let _ = match output {
                LogOutput::Stdout => std::io::stdout().write_all(line.as_bytes()),
                LogOutput::Stderr => std::io::stderr().write_all(line.as_bytes()),
            };
        }

        if let Some(file) = self.file.as_ref().filter(|_| self.write_to_file) {
            if let Ok(mut guard) = file.lock() {
                let _ = guard.write_all(self.format(record, false).as_bytes());
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                let _ = guard.flush();
            }
        }
    }
}
