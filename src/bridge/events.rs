//! Local fan-out of host push events.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::str::FromStr;

use log::error;

use crate::error::ListenerError;
use crate::model::{GraphData, Link, Node};

/// The six event names the host pushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
	NodeAdded,
	NodeRemoved,
	NodeUpdated,
	ConnectionAdded,
	ConnectionRemoved,
	GraphUpdated,
}

impl EventKind {
	pub const ALL: [EventKind; 6] = [
		EventKind::NodeAdded,
		EventKind::NodeRemoved,
		EventKind::NodeUpdated,
		EventKind::ConnectionAdded,
		EventKind::ConnectionRemoved,
		EventKind::GraphUpdated,
	];

	/// The signal name on the host object.
	pub fn name(self) -> &'static str {
		match self {
			EventKind::NodeAdded => "nodeAdded",
			EventKind::NodeRemoved => "nodeRemoved",
			EventKind::NodeUpdated => "nodeUpdated",
			EventKind::ConnectionAdded => "connectionAdded",
			EventKind::ConnectionRemoved => "connectionRemoved",
			EventKind::GraphUpdated => "graphUpdated",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for EventKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		EventKind::ALL
			.into_iter()
			.find(|kind| kind.name() == s)
			.ok_or_else(|| format!("unknown event `{s}`"))
	}
}

/// An event with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
	NodeAdded(Node),
	NodeRemoved(String),
	NodeUpdated(Node),
	ConnectionAdded(Link),
	ConnectionRemoved { source: String, target: String },
	GraphUpdated(GraphData),
}

impl GraphEvent {
	pub fn kind(&self) -> EventKind {
		match self {
			GraphEvent::NodeAdded(_) => EventKind::NodeAdded,
			GraphEvent::NodeRemoved(_) => EventKind::NodeRemoved,
			GraphEvent::NodeUpdated(_) => EventKind::NodeUpdated,
			GraphEvent::ConnectionAdded(_) => EventKind::ConnectionAdded,
			GraphEvent::ConnectionRemoved { .. } => EventKind::ConnectionRemoved,
			GraphEvent::GraphUpdated(_) => EventKind::GraphUpdated,
		}
	}
}

/// A bus listener. Identity is the `Rc` allocation, so keep the handle around
/// to unsubscribe.
pub type Listener = Rc<dyn Fn(&GraphEvent) -> Result<(), ListenerError>>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
	F: Fn(&GraphEvent) -> Result<(), ListenerError> + 'static,
{
	Rc::new(f)
}

/// Per-event listener sets with failure isolation.
#[derive(Default)]
pub struct EventBus {
	listeners: RefCell<HashMap<EventKind, Vec<Listener>>>,
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
	std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribe. Returns `false` if this listener was already registered for
	/// `kind`; insertion order is kept.
	pub fn on(&self, kind: EventKind, listener: Listener) -> bool {
		let mut listeners = self.listeners.borrow_mut();
		let set = listeners.entry(kind).or_default();
		if set.iter().any(|l| same_listener(l, &listener)) {
			return false;
		}
		set.push(listener);
		true
	}

	/// Unsubscribe. Returns whether the listener was registered.
	pub fn off(&self, kind: EventKind, listener: &Listener) -> bool {
		let mut listeners = self.listeners.borrow_mut();
		let Some(set) = listeners.get_mut(&kind) else {
			return false;
		};
		let before = set.len();
		set.retain(|l| !same_listener(l, listener));
		before != set.len()
	}

	pub fn listener_count(&self, kind: EventKind) -> usize {
		self.listeners.borrow().get(&kind).map_or(0, Vec::len)
	}

	/// Deliver `event` to every listener of its kind, returning how many failed.
	///
	/// Listeners run against a snapshot of the set, so they may subscribe or
	/// unsubscribe while being called.
	pub(crate) fn emit(&self, event: &GraphEvent) -> usize {
		let kind = event.kind();
		let snapshot: Vec<Listener> = self
			.listeners
			.borrow()
			.get(&kind)
			.cloned()
			.unwrap_or_default();

		let mut failed = 0;
		for listener in snapshot {
			match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
				Ok(Ok(())) => {}
				Ok(Err(err)) => {
					failed += 1;
					error!("Error in `{kind}` listener: {err}");
				}
				Err(payload) => {
					failed += 1;
					error!("`{kind}` listener panicked: {}", panic_message(&*payload));
				}
			}
		}
		failed
	}
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
	payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("non-string panic payload")
}
