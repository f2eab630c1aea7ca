//! Agora Application Orchestration Layer
//!
//! This crate contains the client-side synchronization engine: the session
//! manager, the resource poller, the event state mirror and the use cases
//! that mutate it optimistically.

pub mod deps;
mod guard;
pub mod mirror;
pub mod polling;
pub mod session;
pub mod usecases;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use deps::AppDeps;
pub use mirror::{CommentBoard, EventDirectory, EventMirror, RefreshOutcome};
pub use polling::{PollConfig, PollerHandle, ResourcePoller};
pub use session::{BootstrapOutcome, SessionError, SessionManager};
pub use workspace::EventWorkspace;
