//! Local mirrors of server-authoritative state.
//!
//! Every mirror replaces its snapshot wholesale on refresh, rejects a
//! re-entrant refresh instead of queueing it, and discards results that land
//! after teardown.

mod comment_board;
mod event_directory;
mod event_mirror;

pub use comment_board::{CommentBoard, CommentError};
pub use event_directory::EventDirectory;
pub use event_mirror::EventMirror;

/// What a `refresh()` call did with the fetched data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was replaced.
    Applied,
    /// A refresh was already outstanding; no request was made.
    Skipped,
    /// The mirror was torn down while the request was in flight.
    Discarded,
}
