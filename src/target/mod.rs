//! Target module for tracking every URL of a run
//!
//! # Components
//!
//! - `TargetState`: lifecycle of a single target (queued, running, done)
//! - `TargetStore`: capability trait the scheduler drives
//! - `QueueTargetStore`: FIFO, in-memory implementation

mod state;
mod store;

pub use state::TargetState;
pub use store::{QueueTargetStore, Target, TargetError, TargetId, TargetResult, TargetStore};
