//! The host side of the bridge, as seen from here.
//!
//! The host's graph object is only partially capable: the four core mutators
//! always exist, everything else may be missing. Optional methods return
//! `None` when the host object does not expose them, which is how the sync
//! service detects capabilities.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

use super::events::{EventKind, GraphEvent};
use crate::error::RemoteResult;
use crate::model::GraphData;

/// Callback the host invokes for each pushed signal.
pub type HostListener = Rc<dyn Fn(GraphEvent)>;

/// The host's graph object.
pub trait NodeManager {
	fn add_node(&self, id: &str, text: &str, parent_id: &str) -> RemoteResult;
	fn remove_node(&self, id: &str) -> RemoteResult;
	fn add_connection(&self, source_id: &str, target_id: &str) -> RemoteResult;
	fn remove_connection(&self, source_id: &str, target_id: &str) -> RemoteResult;

	fn update_node(&self, _id: &str, _text: &str) -> Option<RemoteResult> {
		None
	}

	/// Older hosts only know how to change the text.
	fn update_node_text(&self, _id: &str, _text: &str) -> Option<RemoteResult> {
		None
	}

	fn update_node_position(&self, _id: &str, _x: f64, _y: f64) -> Option<RemoteResult> {
		None
	}

	fn update_full_graph(&self, _graph: &GraphData) -> Option<RemoteResult> {
		None
	}

	/// The host may answer synchronously; wrap such replies in a ready future.
	fn get_full_graph(&self) -> Option<LocalBoxFuture<'static, RemoteResult<GraphData>>> {
		None
	}

	/// Ask the host to push its whole graph as `graphUpdated`.
	fn app_ready(&self) -> Option<RemoteResult> {
		None
	}

	/// Connect `listener` to one of the host's signals.
	fn subscribe(&self, kind: EventKind, listener: HostListener) -> Subscription;
}

/// A live signal connection. Dropping it disconnects.
#[must_use = "dropping a subscription disconnects it"]
pub struct Subscription {
	disconnect: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	pub fn new(disconnect: impl FnOnce() + 'static) -> Self {
		Self {
			disconnect: Some(Box::new(disconnect)),
		}
	}

	/// A subscription with nothing to undo.
	pub fn detached() -> Self {
		Self { disconnect: None }
	}

	pub fn unsubscribe(mut self) {
		self.run();
	}

	fn run(&mut self) {
		if let Some(disconnect) = self.disconnect.take() {
			disconnect();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.run();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("live", &self.disconnect.is_some())
			.finish()
	}
}

/// The objects a host publishes over an established channel.
#[derive(Default, Clone)]
pub struct Channel {
	objects: HashMap<String, Rc<dyn NodeManager>>,
}

impl Channel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_object(mut self, name: impl Into<String>, object: Rc<dyn NodeManager>) -> Self {
		self.objects.insert(name.into(), object);
		self
	}

	pub fn object(&self, name: &str) -> Option<Rc<dyn NodeManager>> {
		self.objects.get(name).cloned()
	}

	pub fn object_names(&self) -> impl Iterator<Item = &str> {
		self.objects.keys().map(String::as_str)
	}
}

impl fmt::Debug for Channel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Channel")
			.field("objects", &self.objects.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// The environment the bridge runs in: where the transport shows up and how
/// deferred work is scheduled.
pub trait Host {
	/// Whether the host transport has been injected yet.
	fn transport_available(&self) -> bool;

	/// Build a channel over the transport. `on_open` runs once the channel is
	/// up, possibly later.
	fn open_channel(&self, on_open: Box<dyn FnOnce(Channel)>);

	/// Run `task` after `delay` on the same event loop.
	fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);
}
