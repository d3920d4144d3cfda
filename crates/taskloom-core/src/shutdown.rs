//! Shutdown coordination
//!
//! A single atomic flag per scheduler, written once (false → true) and read by every
//! blocking loop. Setting it broadcasts on every registered wait condition so blocked
//! workers and the timer observe it promptly.
//!
//! ## Usage
//!
//! ```ignore
//! let flag = ShutdownFlag::new();
//! let tasks = Arc::new(TaskQueue::new(flag.clone()));
//! let coordinator = ShutdownCoordinator::new(flag, vec![tasks.clone()]);
//!
//! // From any thread
//! coordinator.request();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Scheduler lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// Queues may be populated, no threads running
    Created = 0,
    /// Worker pool and timer thread are running
    Running = 1,
    /// Shutdown requested, threads are winding down
    ShuttingDown = 2,
    /// All threads joined
    Stopped = 3,
    /// Internal structures released by `deinit`
    Closed = 4,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::ShuttingDown,
            3 => Self::Stopped,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting down"),
            Self::Stopped => write!(f, "stopped"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Shared shutdown flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Create an unset flag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Set the flag. Returns `true` only for the call that flipped it.
    pub fn set(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }
}

/// Something blocked threads wait on
pub trait Wakeable: Send + Sync {
    /// Wake every thread waiting on this object
    fn wake_all(&self);
}

/// Owns the shutdown flag and the lifecycle state
pub struct ShutdownCoordinator {
    flag: ShutdownFlag,
    state: AtomicU8,
    waiters: Vec<Arc<dyn Wakeable>>,
}

impl ShutdownCoordinator {
    /// Create a coordinator in the `Created` state
    pub fn new(flag: ShutdownFlag, waiters: Vec<Arc<dyn Wakeable>>) -> Self {
        Self {
            flag,
            state: AtomicU8::new(SchedulerState::Created as u8),
            waiters,
        }
    }

    /// The shared flag
    #[must_use]
    pub fn flag(&self) -> &ShutdownFlag {
        &self.flag
    }

    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.is_set()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move from `from` to `to`. Returns the actual state on mismatch.
    pub fn transition(
        &self,
        from: SchedulerState,
        to: SchedulerState,
    ) -> std::result::Result<(), SchedulerState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| debug!(from = %from, to = %to, "Scheduler state changed"))
            .map_err(SchedulerState::from_u8)
    }

    /// Request shutdown and wake every waiter
    ///
    /// Safe to call any number of times from any thread; only the first call has an
    /// effect. Returns whether this call initiated shutdown.
    pub fn request(&self) -> bool {
        if !self.flag.set() {
            debug!("Shutdown already requested");
            return false;
        }

        info!(state = %self.state(), "Shutdown requested");
        let _ = self.transition(SchedulerState::Running, SchedulerState::ShuttingDown);
        for waiter in &self.waiters {
            waiter.wake_all();
        }
        true
    }
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("requested", &self.is_requested())
            .field("state", &self.state())
            .field("waiters", &self.waiters.len())
            .finish()
    }
}
