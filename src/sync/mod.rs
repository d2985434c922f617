//! Sync coordinator: owns the session state and decides when to hit the
//! network, when to serve the cache, and when to refuse.

mod coordinator;
mod notify;
mod state;

pub use coordinator::{RefreshOutcome, SyncCoordinator};
pub use notify::{Subscription, SyncEvent};
