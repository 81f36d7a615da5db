//! Thread management for event processor threads.
//!
//! The core never starts threads on its own; the DSL (or the user) spawns
//! one thread per processor through this module, with optional naming and
//! CPU core pinning.

use std::thread::{self, JoinHandle};

use core_affinity::CoreId;

/// Naming and affinity configuration for a processor thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadContext {
    affinity: Option<CoreId>,
    name: Option<String>,
    id: usize,
}

impl ThreadContext {
    /// Create an empty context; names are generated on demand.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the spawned thread to a CPU core.
    ///
    /// # Panics
    /// Panics when `core_id` does not exist on this machine.
    #[must_use]
    pub fn pin_at_core(mut self, core_id: usize) -> Self {
        validate_core_id(core_id);
        self.affinity = Some(CoreId { id: core_id });
        self
    }

    /// Name the spawned thread.
    #[must_use]
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn next_name(&mut self) -> String {
        self.name.take().unwrap_or_else(|| {
            self.id += 1;
            format!("processor-{id}", id = self.id)
        })
    }

    pub(crate) fn take_affinity(&mut self) -> Option<CoreId> {
        self.affinity.take()
    }
}

fn validate_core_id(core_id: usize) {
    let available = core_affinity::get_core_ids().unwrap_or_default();
    assert!(
        available.iter().any(|c| c.id == core_id),
        "core {core_id} is not available on this machine"
    );
}

/// A spawned processor thread that is joined on drop.
pub struct ManagedThread {
    join_handle: Option<JoinHandle<()>>,
    thread_name: String,
}

impl ManagedThread {
    pub(crate) fn new(join_handle: JoinHandle<()>, thread_name: String) -> Self {
        Self {
            join_handle: Some(join_handle),
            thread_name,
        }
    }

    /// Name the thread was spawned with.
    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Whether the thread has not yet finished.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the thread to finish.
    ///
    /// # Errors
    /// Propagates the thread's panic payload, as [`thread::JoinHandle::join`]
    /// does.
    pub fn join(mut self) -> thread::Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ManagedThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedThread")
            .field("thread_name", &self.thread_name)
            .field("is_running", &self.is_running())
            .finish()
    }
}

/// Builder spawning threads with the configuration of a [`ThreadContext`].
#[derive(Debug, Default)]
pub struct ThreadBuilder {
    context: ThreadContext,
}

impl ThreadBuilder {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the next spawned thread to a CPU core.
    #[must_use]
    pub fn pin_at_core(mut self, core_id: usize) -> Self {
        self.context = self.context.pin_at_core(core_id);
        self
    }

    /// Name the next spawned thread.
    #[must_use]
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.context = self.context.thread_name(name);
        self
    }

    /// Spawn `f` on a new thread, applying affinity before `f` runs.
    ///
    /// # Panics
    /// Panics if the OS refuses to spawn the thread.
    pub fn spawn<F>(mut self, f: F) -> ManagedThread
    where
        F: FnOnce() + Send + 'static,
    {
        let name = self.context.next_name();
        let affinity = self.context.take_affinity();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                if let Some(core) = affinity {
                    core_affinity::set_for_current(core);
                }
                f();
            })
            .expect("failed to spawn processor thread");

        ManagedThread::new(handle, name)
    }
}
