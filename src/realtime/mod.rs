//! # Real-Time Synchronization
//!
//! Keeps consumers in step with the backing store.
//!
//! ## Architecture
//!
//! - **Probe**: one bounded read decides the session-wide connected flag
//! - **Registry**: at most one change channel per table, keyed `realtime:<table>`
//! - **Hooks**: per-consumer subscription lifecycle (enable, retarget, unmount)
//! - **Merge**: applies INSERT/UPDATE/DELETE events to newest-first lists
//! - **Protocol**: messages spoken on the `/realtime/ws` endpoint
//!
//! Delivery is best effort. Each channel is a bounded queue; a consumer that
//! falls behind loses events and nothing is replayed.

pub mod consumer;
pub mod context;
pub mod errors;
pub mod event;
pub mod hooks;
pub mod merge;
pub mod probe;
pub mod protocol;
pub mod registry;

pub use consumer::{LiveCollection, MessageList, ProductList};
pub use context::RealtimeContext;
pub use errors::{RealtimeError, RealtimeResult};
pub use event::{ChangeEvent, EventFilter, EventType, MalformedEvent};
pub use hooks::LiveSubscription;
pub use merge::{apply_change, DuplicatePolicy, IgnoreReason, LiveList, MergeOutcome, Record};
pub use probe::{ConnectionProbe, ConnectionState};
pub use protocol::{ClientMessage, ServerMessage, TableAccess};
pub use registry::{ChangeCallback, ChannelKey, ChannelRegistry, SubscriptionHandle};
