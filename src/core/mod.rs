//! Reconciliation core: canonical state plus the pure transition functions
//! that operate on it.
//!
//! Everything in this module is synchronous and side-effect free. The app
//! layer owns the I/O (HTTP via [`crate::remote`], persistence via
//! [`crate::storage`]) and threads results through these functions:
//!
//! - [`merge`] - fold a fetched collection into state, compute the delta
//! - [`read`] - read-status tracking with site-side "smart read" detection
//! - [`bookmark`] - optimistic bookmark toggles with rollback/coalescing
//! - [`project`] - filter/sort pipeline producing the visible topic list
//! - [`notify`] - keyword notification decisions with a global cooldown

pub mod bookmark;
pub mod categories;
pub mod merge;
pub mod notify;
pub mod project;
pub mod read;
pub mod state;

pub use bookmark::{BookmarkIntent, BookmarkOp, BookmarkReconciler};
pub use merge::{MergeEngine, MergeMode, MergeOutcome};
pub use notify::{NotificationPipeline, NotificationSink};
pub use state::{Author, CanonicalState, FeedSelection, SortMode, Topic, UserSettings};
