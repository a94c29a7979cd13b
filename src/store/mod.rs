//! Local message state: per-conversation history, optimistic sends,
//! unread/ordering aggregates, and the push-event router.
//!
//! Everything here is synchronous bookkeeping over in-memory state; the
//! `api` and `push` modules feed it from the network side.

mod cache;
mod conversation;
mod outbox;
mod roster;
mod router;

pub use cache::{load_history, store_history, CacheError, DiskCache, KvCache};
pub use conversation::{ConversationStore, Reconcile};
pub use outbox::{Outbox, PendingSend};
pub use roster::Roster;
pub use router::{EventRouter, Route};
