//! Thread lifecycle supervisor, the base every client and server runs on.
//!
//! A [`Supervisor`] owns an endpoint's identity, its [`Cryptor`], its
//! [`EndpointLogger`], and a registry of worker threads. `start()` launches
//! the endpoint's main loop on a dedicated thread; the loop may spawn
//! auxiliary workers; `stop()` cancels the run and joins every registered
//! worker except the calling thread.
//!
//! ```text
//! start() ──► lock ─► check marker ─► spawn "MainLoop" ─► register ─► unlock
//!                                         │
//!                                         ├─► Endpoint::main_loop(ctx)
//!                                         │       └─► spawn_worker(..) ─► register
//!                                         └─► cleanup: close log file, clear marker
//!
//! stop()  ──► lock ─► cancel ─► drain ─► unlock ─► join each (skip self) ─► repeat
//!                                                  until empty ─► clear marker
//! ```
//!
//! The registry lock is never held while joining, so cleanup on the
//! main-loop thread can always take it.

mod cancel;
mod endpoint;
mod registry;

pub use cancel::CancelToken;
pub use endpoint::{Endpoint, RunContext, DEFAULT_MAIN_LOOP_NAME};

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::{Cryptor, EndpointLogger, SupervisorConfig, TetherError};
use registry::{MainLoopMarker, Registry, WorkerHandle};

/// Supervises the main loop and auxiliary workers of one endpoint.
///
/// Cheap to clone; clones share the same endpoint and registry. Dropping
/// every clone does not join running workers; call [`stop`](Self::stop).
pub struct Supervisor<E: Endpoint> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    name: String,
    identity: String,
    endpoint: E,
    cryptor: Cryptor,
    logger: EndpointLogger,
    config: SupervisorConfig,
    registry: Mutex<Registry>,
    /// Signalled when an in-flight stop finishes.
    stopped: Condvar,
}

impl<E: Endpoint> Clone for Supervisor<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Endpoint> Supervisor<E> {
    /// Build a supervisor with the default [`SupervisorConfig`].
    pub fn new(name: impl Into<String>, shared_secret: &str, endpoint: E) -> Self {
        Self::with_config(name, shared_secret, endpoint, SupervisorConfig::new())
    }

    pub fn with_config(
        name: impl Into<String>,
        shared_secret: &str,
        endpoint: E,
        config: SupervisorConfig,
    ) -> Self {
        let name = name.into();
        let identity = endpoint.identity_name(&name);
        let log_path = config.log_file_path(endpoint.log_file_name().as_deref());
        let logger = EndpointLogger::new(identity.clone(), log_path);

        Self {
            inner: Arc::new(Inner {
                name,
                identity,
                endpoint,
                cryptor: Cryptor::new(shared_secret),
                logger,
                config,
                registry: Mutex::new(Registry::default()),
                stopped: Condvar::new(),
            }),
        }
    }

    /// Instance name given at construction.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name resolved through [`Endpoint::identity_name`].
    pub fn identity_name(&self) -> &str {
        &self.inner.identity
    }

    pub fn endpoint(&self) -> &E {
        &self.inner.endpoint
    }

    pub fn cryptor(&self) -> &Cryptor {
        &self.inner.cryptor
    }

    pub fn logger(&self) -> &EndpointLogger {
        &self.inner.logger
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// Launch the main loop on a new worker thread.
    ///
    /// Fails with [`TetherError::AlreadyRunning`] if a run is active or
    /// still being stopped; the registry is left untouched in that case.
    pub fn start(&self) -> Result<(), TetherError> {
        let mut registry = self.inner.registry.lock();
        if registry.is_running() || registry.stopping {
            return Err(TetherError::AlreadyRunning {
                name: self.inner.name.clone(),
            });
        }

        // Auxiliary workers left over from a run that ended without stop().
        for stale in registry.take_finished() {
            self.reap(stale);
        }

        let run = registry.next_run_id();
        let cancel = CancelToken::new();
        let ctx = RunContext {
            supervisor: self.clone(),
            cancel: cancel.clone(),
        };
        let worker = self.spawn_thread(self.inner.endpoint.main_loop_name(), move || {
            run_main_loop(ctx, run)
        })?;

        self.inner.logger.debug(format_args!(
            "started main loop {} (run {run})",
            worker.name
        ));
        registry.main_loop = Some(MainLoopMarker {
            run,
            thread: worker.thread,
            cancel,
        });
        registry.register(worker);
        Ok(())
    }

    /// Cancel the current run and join every registered worker.
    ///
    /// The calling thread is never joined: if it is a registered worker it
    /// is skipped with a warning, and this call returns before that worker
    /// has finished. From any other thread, `stop()` returns once the run is
    /// over, waiting on a concurrent stop if one is in flight. Calling it
    /// with nothing registered is a no-op.
    pub fn stop(&self) {
        let current = thread::current().id();
        let logger = &self.inner.logger;
        let mut registry = self.inner.registry.lock();

        if let Some(marker) = &registry.main_loop {
            marker.cancel.cancel();
        }

        if registry.stopping || registry.workers.is_empty() {
            if registry.contains(current) {
                logger.warning(format_args!(
                    "stop requested from worker {} while shutting down, not joining the current thread",
                    thread_label()
                ));
                return;
            }
            // Another stop is joining, or a main loop that stopped itself is
            // still unwinding.
            self.wait_for_shutdown(&mut registry);
            return;
        }

        registry.stopping = true;
        logger.debug(format_args!("joining workers {:?}", registry.worker_names()));

        let mut skipped_self = false;
        loop {
            let batch = registry.drain();
            if batch.is_empty() {
                break;
            }
            MutexGuard::unlocked(&mut registry, || {
                for worker in batch {
                    if worker.thread == current {
                        logger.warning(format_args!(
                            "stop requested from worker {}, not joining the current thread",
                            worker.name
                        ));
                        skipped_self = true;
                        continue;
                    }
                    self.reap(worker);
                }
            });
        }

        registry.joining.clear();
        // A main loop that stopped itself is still unwinding; its cleanup
        // clears the marker.
        let self_is_main_loop = registry
            .main_loop
            .as_ref()
            .is_some_and(|m| m.thread == current);
        if !(skipped_self && self_is_main_loop) {
            registry.main_loop = None;
        }
        registry.stopping = false;
        drop(registry);

        self.inner.stopped.notify_all();
    }

    /// Launch an auxiliary worker and register it for joining by `stop()`.
    pub fn spawn_worker<F>(&self, name: impl Into<String>, task: F) -> Result<ThreadId, TetherError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut registry = self.inner.registry.lock();
        let worker = self.spawn_thread(name.into(), task)?;
        let thread = worker.thread;
        self.inner
            .logger
            .debug(format_args!("spawned worker {}", worker.name));
        registry.register(worker);
        Ok(thread)
    }

    /// Whether the calling thread is not one of this supervisor's workers.
    pub fn is_external_context(&self) -> bool {
        !self.inner.registry.lock().contains(thread::current().id())
    }

    /// Whether a main loop is active.
    pub fn is_running(&self) -> bool {
        self.inner.registry.lock().is_running()
    }

    /// Number of registered workers, main loop included.
    pub fn worker_count(&self) -> usize {
        self.inner.registry.lock().workers.len()
    }

    /// Thread names of registered workers, in spawn order.
    pub fn worker_names(&self) -> Vec<String> {
        self.inner.registry.lock().worker_names()
    }

    /// Cancellation signal of the active run.
    pub fn cancel_token(&self) -> Option<CancelToken> {
        self.inner
            .registry
            .lock()
            .main_loop
            .as_ref()
            .map(|m| m.cancel.clone())
    }

    fn spawn_thread<F>(&self, name: String, task: F) -> Result<WorkerHandle, TetherError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(size) = self.inner.config.worker_stack_size {
            builder = builder.stack_size(size);
        }
        let join = builder
            .spawn(task)
            .map_err(|source| TetherError::Spawn {
                name: name.clone(),
                source,
            })?;
        Ok(WorkerHandle::new(name, join))
    }

    /// Join a worker, logging if it panicked.
    fn reap(&self, worker: WorkerHandle) {
        if worker.join.join().is_err() {
            self.inner
                .logger
                .error(format_args!("worker {} panicked", worker.name));
        }
    }

    /// Block until no stop is in flight and the run active on entry has ended.
    fn wait_for_shutdown(&self, registry: &mut MutexGuard<'_, Registry>) {
        let Some(run) = registry.main_loop.as_ref().map(|m| m.run) else {
            while registry.stopping {
                self.inner.stopped.wait(registry);
            }
            return;
        };
        while registry.stopping || registry.main_loop.as_ref().is_some_and(|m| m.run == run) {
            self.inner.stopped.wait(registry);
        }
    }

    /// Main-loop cleanup. Runs on the main-loop thread, also when unwinding.
    fn finish_main_loop(&self, run: u64) {
        self.inner.logger.close_file();
        let mut registry = self.inner.registry.lock();
        // The run is over: release auxiliary workers still waiting on it.
        if let Some(marker) = registry.clear_main_loop(run) {
            marker.cancel.cancel();
        }
        // The thread is about to exit; its handle detaches.
        registry.remove(thread::current().id());
        drop(registry);
        self.inner.stopped.notify_all();
    }
}

impl<E: Endpoint> fmt::Debug for Supervisor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("Supervisor")
            .field("name", &self.inner.name)
            .field("running", &registry.is_running())
            .field("workers", &registry.worker_names())
            .finish()
    }
}

/// Runs cleanup when the main loop returns or unwinds.
struct CleanupGuard<E: Endpoint> {
    supervisor: Supervisor<E>,
    run: u64,
}

impl<E: Endpoint> Drop for CleanupGuard<E> {
    fn drop(&mut self) {
        self.supervisor.finish_main_loop(self.run);
    }
}

fn run_main_loop<E: Endpoint>(ctx: RunContext<E>, run: u64) {
    let _cleanup = CleanupGuard {
        supervisor: ctx.supervisor.clone(),
        run,
    };

    let logger = ctx.supervisor.logger();
    match ctx.supervisor.endpoint().main_loop(&ctx) {
        Ok(()) => logger.debug(format_args!("main loop exited (run {run})")),
        Err(e) => logger.error(format_args!("main loop failed (run {run}): {e:#}")),
    }
}

fn thread_label() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}
