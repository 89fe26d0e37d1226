//! Keeps a force-directed graph view in step with a graph owned by a host
//! process on the other side of a web channel.
//!
//! [`bridge`] finds the channel, forwards host events and sends mutations
//! back. [`components::force_graph`] lays the graph out and draws it.

pub mod bridge;
pub mod components;
pub mod config;
pub mod error;
pub mod model;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use bridge::{EventBus, EventKind, GraphEvent, GraphSyncService};
pub use components::force_graph::{ForceLayoutRenderer, GraphBinding};
pub use config::{BridgeConfig, LayoutConfig};
pub use error::{RemoteError, SyncError};
pub use model::{GraphData, Link, Node};

/// Initialize logging and panic hooks for the WASM target.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
	let _ = console_log::init_with_level(log::Level::Debug);
	console_error_panic_hook::set_once();
	log::info!("Logging initialized");
}
