//! Incremental synchronization pipeline.
//!
//! - `filter`: drop ignored, already-posted and already-synced comments
//! - `order`: sort survivors and advance the watermark
//! - `lifecycle`: persist progress or retire stale bookmarks
//! - `sync`: run all of the above for every tracked bookmark

pub mod filter;
pub mod lifecycle;
pub mod order;
pub mod sync;

pub use filter::{DropReason, Dropped, FilterOutcome, filter};
pub use lifecycle::{LifecycleState, Transition, apply, transition};
pub use order::order;
pub use sync::{SyncReport, Synchronizer};
