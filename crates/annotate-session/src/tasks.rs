//! One-shot background tasks with cooperative cancellation
//!
//! Each kind of task (load, export, save) owns a [`TaskSlot`]. Starting a new
//! task in a slot cancels the one before it, and a result that comes back for
//! a superseded task is discarded instead of being applied.

use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::Notify;

use crate::error::SessionError;

/// Cancellation token shared between a slot and its running task
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Tri-state surfaced to the UI, plus the two terminal states it maps onto
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
    Cancelled,
}

impl TaskState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskState::Pending)
    }
}

/// Identifies one started task within its slot
#[derive(Debug, Clone)]
pub struct TaskTicket {
    generation: u64,
    token: CancellationToken,
}

impl TaskTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Result of a task together with the ticket it was started under
#[derive(Debug)]
pub struct TaskOutcome<T> {
    pub ticket: TaskTicket,
    pub result: Result<T, SessionError>,
}

impl<T> TaskOutcome<T> {
    /// Race `work` against the ticket's cancellation
    pub async fn run<F>(ticket: TaskTicket, work: F) -> Self
    where
        F: std::future::Future<Output = Result<T, SessionError>>,
    {
        let result = tokio::select! {
            _ = ticket.token.cancelled() => Err(SessionError::Cancelled),
            result = work => result,
        };
        Self { ticket, result }
    }
}

#[derive(Debug, Default)]
pub struct TaskSlot {
    generation: u64,
    current: Option<CancellationToken>,
    state: TaskState,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    /// Start a new task, cancelling the one in flight
    pub fn begin(&mut self) -> TaskTicket {
        self.cancel_current();
        self.generation += 1;
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        self.state = TaskState::Pending;
        TaskTicket {
            generation: self.generation,
            token,
        }
    }

    pub fn is_current(&self, ticket: &TaskTicket) -> bool {
        ticket.generation == self.generation && self.current.is_some()
    }

    /// Cancel the task in flight, if any
    pub fn cancel(&mut self) -> bool {
        if self.cancel_current() {
            self.state = TaskState::Cancelled;
            true
        } else {
            false
        }
    }

    fn cancel_current(&mut self) -> bool {
        match self.current.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Record a finished task. Returns `false` for a superseded ticket,
    /// whose result must then be dropped.
    pub fn finish<T>(&mut self, ticket: &TaskTicket, result: &Result<T, SessionError>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.current = None;
        self.state = match result {
            Ok(_) => TaskState::Succeeded,
            Err(SessionError::Cancelled) => TaskState::Cancelled,
            Err(err) => TaskState::Failed(err.to_string()),
        };
        true
    }
}
