//! Worker registry, the supervisor's only shared mutable state.
//!
//! Pure bookkeeping, no locking: the supervisor wraps it in a mutex and
//! performs every mutation with that mutex held.

use std::thread::{JoinHandle, ThreadId};

use super::cancel::CancelToken;

/// A spawned worker thread.
pub(crate) struct WorkerHandle {
    pub(crate) name: String,
    pub(crate) thread: ThreadId,
    pub(crate) join: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn new(name: String, join: JoinHandle<()>) -> Self {
        Self {
            name,
            thread: join.thread().id(),
            join,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Marks the active run. Present iff a main loop is running.
pub(crate) struct MainLoopMarker {
    pub(crate) run: u64,
    pub(crate) thread: ThreadId,
    pub(crate) cancel: CancelToken,
}

#[derive(Default)]
pub(crate) struct Registry {
    /// Registered workers, in spawn order.
    pub(crate) workers: Vec<WorkerHandle>,
    /// Workers drained by an in-flight stop and not yet joined.
    pub(crate) joining: Vec<ThreadId>,
    pub(crate) main_loop: Option<MainLoopMarker>,
    pub(crate) stopping: bool,
    next_run: u64,
}

impl Registry {
    pub(crate) fn next_run_id(&mut self) -> u64 {
        self.next_run += 1;
        self.next_run
    }

    pub(crate) fn register(&mut self, worker: WorkerHandle) {
        self.workers.push(worker);
    }

    /// Whether `thread` is a registered worker, one being joined, or the
    /// active main loop.
    pub(crate) fn contains(&self, thread: ThreadId) -> bool {
        self.workers.iter().any(|w| w.thread == thread)
            || self.joining.contains(&thread)
            || self.main_loop.as_ref().is_some_and(|m| m.thread == thread)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.main_loop.is_some()
    }

    /// Take every registered worker, recording them as being joined.
    pub(crate) fn drain(&mut self) -> Vec<WorkerHandle> {
        let drained: Vec<WorkerHandle> = self.workers.drain(..).collect();
        self.joining.extend(drained.iter().map(|w| w.thread));
        drained
    }

    /// Drop a worker from the registry. The handle detaches.
    pub(crate) fn remove(&mut self, thread: ThreadId) -> Option<WorkerHandle> {
        self.joining.retain(|t| *t != thread);
        let index = self.workers.iter().position(|w| w.thread == thread)?;
        Some(self.workers.remove(index))
    }

    /// Take workers whose threads already exited.
    pub(crate) fn take_finished(&mut self) -> Vec<WorkerHandle> {
        let (finished, running): (Vec<_>, Vec<_>) =
            self.workers.drain(..).partition(WorkerHandle::is_finished);
        self.workers = running;
        finished
    }

    /// Take the marker if it still belongs to `run`.
    pub(crate) fn clear_main_loop(&mut self, run: u64) -> Option<MainLoopMarker> {
        if self.main_loop.as_ref().is_some_and(|m| m.run == run) {
            self.main_loop.take()
        } else {
            None
        }
    }

    pub(crate) fn worker_names(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    fn worker(name: &str) -> WorkerHandle {
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(|| {})
            .unwrap();
        WorkerHandle::new(name.to_string(), join)
    }

    fn wait_finished(worker: &WorkerHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn register_and_contains() {
        let mut registry = Registry::default();
        let w = worker("a");
        let id = w.thread;
        registry.register(w);
        assert!(registry.contains(id));
        assert!(!registry.contains(thread::current().id()));
        assert_eq!(registry.worker_names(), vec!["a".to_string()]);
    }

    #[test]
    fn drain_keeps_threads_visible_until_removed() {
        let mut registry = Registry::default();
        registry.register(worker("a"));
        registry.register(worker("b"));

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.workers.is_empty());
        assert!(registry.contains(drained[0].thread));

        registry.remove(drained[0].thread);
        assert!(!registry.contains(drained[0].thread));
        assert!(registry.contains(drained[1].thread));
    }

    #[test]
    fn remove_unknown_is_none() {
        let mut registry = Registry::default();
        assert!(registry.remove(thread::current().id()).is_none());
    }

    #[test]
    fn take_finished_leaves_running_workers() {
        let mut registry = Registry::default();
        let done = worker("done");
        wait_finished(&done);
        registry.register(done);

        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let blocked = thread::spawn(move || {
            let _ = rx.recv();
        });
        registry.register(WorkerHandle::new("blocked".into(), blocked));

        let finished = registry.take_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].name, "done");
        assert_eq!(registry.worker_names(), vec!["blocked".to_string()]);

        drop(tx);
        for w in registry.drain() {
            w.join.join().unwrap();
        }
    }

    #[test]
    fn clear_main_loop_checks_run_id() {
        let mut registry = Registry::default();
        let run = registry.next_run_id();
        registry.main_loop = Some(MainLoopMarker {
            run,
            thread: thread::current().id(),
            cancel: CancelToken::new(),
        });

        assert!(registry.contains(thread::current().id()));
        assert!(registry.clear_main_loop(run + 1).is_none());
        assert!(registry.is_running());
        let marker = registry.clear_main_loop(run).expect("marker of this run");
        assert_eq!(marker.run, run);
        assert!(!registry.is_running());
    }

    #[test]
    fn run_ids_increase() {
        let mut registry = Registry::default();
        let a = registry.next_run_id();
        let b = registry.next_run_id();
        assert!(b > a);
    }
}
