use std::time::Duration;

use super::cancel::CancelToken;
use super::Supervisor;
use crate::{Cryptor, EndpointLogger, TetherError};

/// Thread name of the main-loop worker unless an endpoint overrides it.
pub const DEFAULT_MAIN_LOOP_NAME: &str = "MainLoop";

/// Hooks a concrete client or server supplies to its [`Supervisor`].
///
/// Every method has a default, so `impl Endpoint for Foo {}` is a valid
/// endpoint whose main loop returns immediately.
pub trait Endpoint: Send + Sync + Sized + 'static {
    /// Name used for log records. Defaults to the supervisor's instance name.
    fn identity_name(&self, instance_name: &str) -> String {
        instance_name.to_string()
    }

    /// Log file stem, or `None` for no file. Defaults to the type's name.
    fn log_file_name(&self) -> Option<String> {
        Some(short_type_name::<Self>().to_string())
    }

    /// Thread name of the main-loop worker.
    fn main_loop_name(&self) -> String {
        DEFAULT_MAIN_LOOP_NAME.to_string()
    }

    /// The endpoint's receive/process cycle. Runs on the main-loop worker.
    ///
    /// Should return soon after `ctx.is_cancelled()` turns true. An `Err` is
    /// logged; cleanup runs either way.
    fn main_loop(&self, ctx: &RunContext<Self>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// What a main loop sees of its supervisor during one run.
pub struct RunContext<E: Endpoint> {
    pub(crate) supervisor: Supervisor<E>,
    pub(crate) cancel: CancelToken,
}

impl<E: Endpoint> RunContext<E> {
    pub fn supervisor(&self) -> &Supervisor<E> {
        &self.supervisor
    }

    pub fn cryptor(&self) -> &Cryptor {
        self.supervisor.cryptor()
    }

    pub fn logger(&self) -> &EndpointLogger {
        self.supervisor.logger()
    }

    /// Cancellation signal for this run. Clone it into auxiliary workers.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep for up to `timeout`, waking early on cancellation.
    /// Returns `true` if the run was cancelled.
    pub fn wait_cancelled(&self, timeout: Duration) -> bool {
        self.cancel.wait_timeout(timeout)
    }

    /// Shorthand for [`Supervisor::spawn_worker`].
    pub fn spawn_worker<F>(
        &self,
        name: impl Into<String>,
        task: F,
    ) -> Result<std::thread::ThreadId, TetherError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.supervisor.spawn_worker(name, task)
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
