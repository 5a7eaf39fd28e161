//! Target store trait and the queue-backed implementation
//!
//! The store is the single source of truth for how many targets are queued,
//! in flight, and finished. The scheduler is its only writer.

use crate::target::TargetState;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use thiserror::Error;

/// Opaque, sequential target identifier; never reused within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(u64);

impl TargetId {
    /// Returns the raw numeric value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One URL under management
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    pub url: String,
    pub state: TargetState,
}

/// Errors raised when the store's contract is violated
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("launch requested while the queue is empty")]
    EmptyQueue,

    #[error("launch requested with all {0} slots running")]
    NoFreeSlot(usize),

    #[error("unknown target {0}")]
    UnknownTarget(TargetId),

    #[error("target {0} is already done")]
    AlreadyDone(TargetId),

    #[error("invalid transition for target {id}: {from} -> {to}")]
    InvalidTransition {
        id: TargetId,
        from: TargetState,
        to: TargetState,
    },
}

/// Result type for target store operations
pub type TargetResult<T> = Result<T, TargetError>;

/// Capability set every target store provides
///
/// Invariant: `count_running() <= capacity()`, so `free_slots()` never
/// underflows. Callers only launch while `count_queued() > 0`.
pub trait TargetStore {
    /// Appends a new queued target and returns its fresh id
    fn add(&mut self, url: String) -> TargetId;

    /// Maximum number of running targets
    fn capacity(&self) -> usize;

    /// `capacity - running`
    fn free_slots(&self) -> usize {
        self.capacity().saturating_sub(self.count_running())
    }

    fn count_queued(&self) -> usize;

    fn count_running(&self) -> usize;

    fn count_done(&self) -> u64;

    /// Moves the oldest queued target to running
    ///
    /// # Returns
    ///
    /// * `Ok((id, url))` - The launched target
    /// * `Err(TargetError::EmptyQueue)` - Nothing was queued
    /// * `Err(TargetError::NoFreeSlot)` - Every slot is already running
    fn launch_any(&mut self) -> TargetResult<(TargetId, String)>;

    /// Marks a running target as done
    fn done(&mut self, id: TargetId) -> TargetResult<()>;

    /// Current state of a target, `None` if the id was never issued
    fn state_of(&self, id: TargetId) -> Option<TargetState>;
}

/// In-memory FIFO target store
#[derive(Debug)]
pub struct QueueTargetStore {
    capacity: usize,
    next_id: u64,
    queue: VecDeque<Target>,
    running: HashMap<TargetId, Target>,
    done: u64,
}

impl QueueTargetStore {
    /// Creates an empty store allowing `capacity` concurrent running targets
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_id: 0,
            queue: VecDeque::new(),
            running: HashMap::with_capacity(capacity),
            done: 0,
        }
    }

    /// Returns the urls still waiting, oldest first
    pub fn queued_urls(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(|target| target.url.as_str())
    }

    fn was_issued(&self, id: TargetId) -> bool {
        id.0 < self.next_id
    }
}

impl TargetStore for QueueTargetStore {
    fn add(&mut self, url: String) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        tracing::trace!("Queued target {}: {}", id, url);
        self.queue.push_back(Target {
            id,
            url,
            state: TargetState::Queued,
        });
        id
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn count_queued(&self) -> usize {
        self.queue.len()
    }

    fn count_running(&self) -> usize {
        self.running.len()
    }

    fn count_done(&self) -> u64 {
        self.done
    }

    fn launch_any(&mut self) -> TargetResult<(TargetId, String)> {
        if self.running.len() >= self.capacity {
            return Err(TargetError::NoFreeSlot(self.capacity));
        }

        let mut target = self.queue.pop_front().ok_or(TargetError::EmptyQueue)?;
        debug_assert!(target.state.can_transition_to(TargetState::Running));
        target.state = TargetState::Running;

        let launched = (target.id, target.url.clone());
        self.running.insert(target.id, target);
        Ok(launched)
    }

    fn done(&mut self, id: TargetId) -> TargetResult<()> {
        let state = self.state_of(id).ok_or(TargetError::UnknownTarget(id))?;

        if !state.can_transition_to(TargetState::Done) {
            return Err(if state.is_terminal() {
                TargetError::AlreadyDone(id)
            } else {
                TargetError::InvalidTransition {
                    id,
                    from: state,
                    to: TargetState::Done,
                }
            });
        }

        self.running.remove(&id);
        self.done += 1;
        Ok(())
    }

    fn state_of(&self, id: TargetId) -> Option<TargetState> {
        if self.running.contains_key(&id) {
            return Some(TargetState::Running);
        }
        if !self.was_issued(id) {
            return None;
        }
        if self.queue.iter().any(|target| target.id == id) {
            return Some(TargetState::Queued);
        }
        Some(TargetState::Done)
    }
}
