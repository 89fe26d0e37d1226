//! Connection to the host process that owns the graph.
//!
//! [`GraphSyncService`] is the entry point: it discovers the channel through a
//! [`Host`], binds the host's [`NodeManager`] and re-emits host signals on a
//! local [`EventBus`].

pub mod connection;
pub mod events;
pub mod remote;
pub mod sync;

pub use connection::{ConnectionManager, ConnectionState, DiscoveryHandle};
pub use events::{EventBus, EventKind, GraphEvent, Listener, listener};
pub use remote::{Channel, Host, HostListener, NodeManager, Subscription};
pub use sync::GraphSyncService;
