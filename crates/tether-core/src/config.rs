use std::path::{Path, PathBuf};

/// Environment variable naming the default log directory.
pub const LOG_DIR_ENV: &str = "TETHER_LOG_DIR";

/// Configuration for a [`Supervisor`](crate::Supervisor).
///
/// All fields have sensible defaults. Use the builder pattern:
///
/// ```rust
/// use tether_core::SupervisorConfig;
///
/// let config = SupervisorConfig::new()
///     .log_dir("logs")
///     .worker_stack_size(512 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Directory holding per-endpoint log files. `None` disables file logging.
    pub(crate) log_dir: Option<PathBuf>,
    /// Stack size for every spawned worker thread (platform default if unset).
    pub(crate) worker_stack_size: Option<usize>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisorConfig {
    /// Create a new config with defaults.
    ///
    /// If the `TETHER_LOG_DIR` environment variable is set, endpoint log
    /// files are written there. This can be overridden with [`.log_dir()`]
    /// or [`.no_log_file()`].
    ///
    /// [`.log_dir()`]: SupervisorConfig::log_dir
    /// [`.no_log_file()`]: SupervisorConfig::no_log_file
    pub fn new() -> Self {
        let log_dir = std::env::var_os(LOG_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        Self {
            log_dir,
            worker_stack_size: None,
        }
    }

    /// Write endpoint log files into `dir` (created on first write).
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Disable file logging; records still go to `tracing`.
    pub fn no_log_file(mut self) -> Self {
        self.log_dir = None;
        self
    }

    /// Set the stack size, in bytes, of spawned worker threads.
    pub fn worker_stack_size(mut self, bytes: usize) -> Self {
        self.worker_stack_size = Some(bytes);
        self
    }

    /// Configured log directory, if any.
    pub fn log_directory(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Resolve `<log_dir>/<file_name>.log`, or `None` when either side opts out.
    pub(crate) fn log_file_path(&self, file_name: Option<&str>) -> Option<PathBuf> {
        let dir = self.log_dir.as_ref()?;
        let file_name = file_name?;
        Some(dir.join(format!("{file_name}.log")))
    }
}
