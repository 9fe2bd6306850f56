//! Per-endpoint leveled logger.
//!
//! Every record is emitted through `tracing` with an `endpoint` field. When
//! the endpoint has a log file, the record is also appended to it as
//! `[<local time>] [<LEVEL>] [<endpoint>]: <message>`.
//!
//! The file is opened lazily on the first write and closed by
//! [`EndpointLogger::close_file`]; a later write reopens it in append mode.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::Level;

/// Timestamp format for file records.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub struct EndpointLogger {
    name: String,
    file_path: Option<PathBuf>,
    file: Mutex<Option<LineWriter<File>>>,
    closes: AtomicUsize,
}

impl EndpointLogger {
    /// Create a logger for `name`. `file_path` of `None` means no file sink.
    pub fn new(name: impl Into<String>, file_path: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file_path,
            file: Mutex::new(None),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::DEBUG, &message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::INFO, &message);
    }

    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Level::WARN, &message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::ERROR, &message);
    }

    /// Flush and close the log file, if open.
    pub fn close_file(&self) {
        let mut file = self.file.lock();
        if let Some(mut writer) = file.take() {
            if let Err(e) = writer.flush() {
                tracing::warn!(endpoint = %self.name, "failed to flush log file: {e}");
            }
        }
        self.closes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_file_open(&self) -> bool {
        self.file.lock().is_some()
    }

    /// Number of times [`close_file`](Self::close_file) has run.
    pub fn file_close_count(&self) -> usize {
        self.closes.load(Ordering::Relaxed)
    }

    fn log(&self, level: Level, message: &dyn fmt::Display) {
        match level {
            Level::ERROR => tracing::error!(endpoint = %self.name, "{message}"),
            Level::WARN => tracing::warn!(endpoint = %self.name, "{message}"),
            Level::INFO => tracing::info!(endpoint = %self.name, "{message}"),
            Level::DEBUG => tracing::debug!(endpoint = %self.name, "{message}"),
            _ => tracing::trace!(endpoint = %self.name, "{message}"),
        }
        self.write_file(level, message);
    }

    fn write_file(&self, level: Level, message: &dyn fmt::Display) {
        let Some(path) = &self.file_path else {
            return;
        };

        let mut file = self.file.lock();
        if file.is_none() {
            match open_append(path) {
                Ok(writer) => *file = Some(writer),
                Err(e) => {
                    tracing::warn!(
                        endpoint = %self.name,
                        path = %path.display(),
                        "failed to open log file: {e}"
                    );
                    return;
                }
            }
        }

        if let Some(writer) = file.as_mut() {
            let now = chrono::Local::now().format(TIME_FORMAT);
            if let Err(e) = writeln!(writer, "[{now}] [{level}] [{}]: {message}", self.name) {
                tracing::warn!(endpoint = %self.name, "failed to write log file: {e}");
            }
        }
    }
}

impl fmt::Debug for EndpointLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointLogger")
            .field("name", &self.name)
            .field("file_path", &self.file_path)
            .field("file_open", &self.is_file_open())
            .finish()
    }
}

fn open_append(path: &Path) -> std::io::Result<LineWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(LineWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_file_path_never_opens() {
        let logger = EndpointLogger::new("node", None);
        logger.info("hello");
        assert!(!logger.is_file_open());
        assert!(logger.file_path().is_none());
    }

    #[test]
    fn writes_formatted_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("Node.log");
        let logger = EndpointLogger::new("node-A", Some(path.clone()));

        logger.info("first");
        logger.warning(format_args!("second {}", 2));
        assert!(logger.is_file_open());
        logger.close_file();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] [node-A]: first"));
        assert!(lines[1].ends_with("[WARN] [node-A]: second 2"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn close_then_write_reopens_in_append_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Node.log");
        let logger = EndpointLogger::new("node", Some(path.clone()));

        logger.error("before");
        logger.close_file();
        assert!(!logger.is_file_open());

        logger.debug("after");
        assert!(logger.is_file_open());
        logger.close_file();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("[ERROR] [node]: before"));
        assert!(contents.contains("[DEBUG] [node]: after"));
    }

    #[test]
    fn close_file_counts_every_call() {
        let logger = EndpointLogger::new("node", None);
        assert_eq!(logger.file_close_count(), 0);
        logger.close_file();
        logger.close_file();
        assert_eq!(logger.file_close_count(), 2);
    }

    #[test]
    fn unopenable_path_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a log file.
        let logger = EndpointLogger::new("node", Some(dir.path().to_path_buf()));
        logger.info("dropped");
        assert!(!logger.is_file_open());
    }
}
