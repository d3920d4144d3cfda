//! Task and event handler interfaces
//!
//! Handlers are the only boundary between the scheduler and the code that understands
//! payloads (agent loop, chat platform clients, persistence). Any closure with the
//! right signature is a handler.

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::event::Event;
use crate::task::Task;

/// Executes dequeued tasks
#[cfg_attr(test, mockall::automock)]
pub trait TaskHandler: Send + Sync {
    /// Handle one task. Errors are logged by the worker and never stop the pool.
    fn handle(&self, task: &Task) -> anyhow::Result<()>;
}

/// Receives `Shutdown` and `Heartbeat` events
#[cfg_attr(test, mockall::automock)]
pub trait EventHandler: Send + Sync {
    /// Handle one event. Errors are logged by the timer thread.
    fn handle(&self, event: &Event) -> anyhow::Result<()>;
}

impl<F> TaskHandler for F
where
    F: Fn(&Task) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, task: &Task) -> anyhow::Result<()> {
        self(task)
    }
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &Event) -> anyhow::Result<()> {
        self(event)
    }
}

/// Replaceable handler shared between the scheduler and its threads
///
/// Readers clone the inner `Arc` and release the lock before calling the handler.
pub struct HandlerSlot<H: ?Sized> {
    handler: RwLock<Option<Arc<H>>>,
}

impl<H: ?Sized> HandlerSlot<H> {
    /// Empty slot
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handler: RwLock::new(None),
        }
    }

    /// Install a handler, replacing any previous one
    pub fn set(&self, handler: Arc<H>) {
        *self.handler.write() = Some(handler);
    }

    /// Current handler
    #[must_use]
    pub fn get(&self) -> Option<Arc<H>> {
        self.handler.read().clone()
    }

    /// Remove the handler
    pub fn clear(&self) -> Option<Arc<H>> {
        self.handler.write().take()
    }

    /// Whether a handler is installed
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.handler.read().is_some()
    }
}

impl<H: ?Sized> Default for HandlerSlot<H> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Outcome of one isolated handler call
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Handler returned `Ok`
    Completed,
    /// Handler returned an error
    Failed(anyhow::Error),
    /// Handler panicked; the message is extracted when it is a string
    Panicked(String),
}

/// Run `f`, converting a panic into [`HandlerOutcome::Panicked`]
pub(crate) fn run_isolated<F>(f: F) -> HandlerOutcome
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => HandlerOutcome::Completed,
        Ok(Err(e)) => HandlerOutcome::Failed(e),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            HandlerOutcome::Panicked(message)
        }
    }
}
