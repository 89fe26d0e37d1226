#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{self, FutureExt, LocalBoxFuture};
use graph_bridge::bridge::{Channel, EventKind, GraphEvent, Host, HostListener, NodeManager, Subscription};
use graph_bridge::error::{RemoteError, RemoteResult};
use graph_bridge::model::GraphData;

type Task = Box<dyn FnOnce()>;

/// A host whose clock only moves when the test says so.
#[derive(Default)]
pub struct FakeHost {
	transport: Cell<bool>,
	channel: RefCell<Channel>,
	timers: RefCell<VecDeque<(Duration, Task)>>,
	opened: Cell<usize>,
	/// When set, channels finish opening only on `finish_open`.
	defer_open: Cell<bool>,
	pending_open: RefCell<Option<Box<dyn FnOnce(Channel)>>>,
}

impl FakeHost {
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	pub fn with_manager(manager: &Rc<MockNodeManager>) -> Rc<Self> {
		let host = Self::new();
		host.publish("nodeManager", manager.clone());
		host
	}

	pub fn publish(&self, name: &str, object: Rc<dyn NodeManager>) {
		let channel = self.channel.take().with_object(name, object);
		*self.channel.borrow_mut() = channel;
	}

	pub fn inject_transport(&self) {
		self.transport.set(true);
	}

	pub fn defer_open(&self) {
		self.defer_open.set(true);
	}

	pub fn finish_open(&self) {
		let pending = self.pending_open.borrow_mut().take();
		if let Some(on_open) = pending {
			on_open(self.channel.borrow().clone());
		}
	}

	/// Run every task scheduled so far. Returns how many ran.
	pub fn advance(&self) -> usize {
		let due: Vec<(Duration, Task)> = self.timers.borrow_mut().drain(..).collect();
		let ran = due.len();
		for (_, task) in due {
			task();
		}
		ran
	}

	pub fn pending_timers(&self) -> usize {
		self.timers.borrow().len()
	}

	pub fn last_delay(&self) -> Option<Duration> {
		self.timers.borrow().back().map(|(delay, _)| *delay)
	}

	pub fn channels_opened(&self) -> usize {
		self.opened.get()
	}
}

impl Host for FakeHost {
	fn transport_available(&self) -> bool {
		self.transport.get()
	}

	fn open_channel(&self, on_open: Box<dyn FnOnce(Channel)>) {
		self.opened.set(self.opened.get() + 1);
		if self.defer_open.get() {
			*self.pending_open.borrow_mut() = Some(on_open);
			return;
		}
		let channel = self.channel.borrow().clone();
		on_open(channel);
	}

	fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
		self.timers.borrow_mut().push_back((delay, task));
	}
}

/// Which optional methods the mock exposes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Capabilities {
	pub update_node: bool,
	pub update_node_text: bool,
	pub update_node_position: bool,
	pub update_full_graph: bool,
	pub get_full_graph: bool,
	pub app_ready: bool,
}

impl Capabilities {
	pub fn all() -> Self {
		Self {
			update_node: true,
			update_node_text: true,
			update_node_position: true,
			update_full_graph: true,
			get_full_graph: true,
			app_ready: true,
		}
	}
}

/// Records every call and lets tests push host signals.
pub struct MockNodeManager {
	caps: Capabilities,
	calls: RefCell<Vec<String>>,
	graph: RefCell<GraphData>,
	fail_on: RefCell<Option<String>>,
	listeners: Rc<RefCell<Vec<(u64, EventKind, HostListener)>>>,
	next_id: Cell<u64>,
}

impl MockNodeManager {
	pub fn new(caps: Capabilities) -> Rc<Self> {
		Rc::new(Self {
			caps,
			calls: RefCell::new(Vec::new()),
			graph: RefCell::new(GraphData::default()),
			fail_on: RefCell::new(None),
			listeners: Rc::new(RefCell::new(Vec::new())),
			next_id: Cell::new(0),
		})
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.borrow().clone()
	}

	pub fn calls_to(&self, method: &str) -> Vec<String> {
		let prefix = format!("{method}(");
		self.calls
			.borrow()
			.iter()
			.filter(|call| call.starts_with(&prefix))
			.cloned()
			.collect()
	}

	pub fn clear_calls(&self) {
		self.calls.borrow_mut().clear();
	}

	pub fn set_graph(&self, graph: GraphData) {
		*self.graph.borrow_mut() = graph;
	}

	/// Make the first call to `method` fail (and every later one).
	pub fn fail_on(&self, method: &str) {
		*self.fail_on.borrow_mut() = Some(method.to_owned());
	}

	pub fn subscriber_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	/// Emit `event` as a host signal.
	pub fn push(&self, event: GraphEvent) {
		let kind = event.kind();
		let targets: Vec<HostListener> = self
			.listeners
			.borrow()
			.iter()
			.filter(|(_, k, _)| *k == kind)
			.map(|(_, _, l)| l.clone())
			.collect();
		for target in targets {
			target(event.clone());
		}
	}

	fn record(&self, method: &str, args: &[&str]) -> RemoteResult {
		self.calls
			.borrow_mut()
			.push(format!("{method}({})", args.join(",")));
		match self.fail_on.borrow().as_deref() {
			Some(failing) if failing == method => Err(RemoteError::call(method, "host raised")),
			_ => Ok(()),
		}
	}
}

impl NodeManager for MockNodeManager {
	fn add_node(&self, id: &str, text: &str, parent_id: &str) -> RemoteResult {
		self.record("addNode", &[id, text, parent_id])
	}

	fn remove_node(&self, id: &str) -> RemoteResult {
		self.record("removeNode", &[id])
	}

	fn add_connection(&self, source_id: &str, target_id: &str) -> RemoteResult {
		self.record("addConnection", &[source_id, target_id])
	}

	fn remove_connection(&self, source_id: &str, target_id: &str) -> RemoteResult {
		self.record("removeConnection", &[source_id, target_id])
	}

	fn update_node(&self, id: &str, text: &str) -> Option<RemoteResult> {
		self.caps
			.update_node
			.then(|| self.record("updateNode", &[id, text]))
	}

	fn update_node_text(&self, id: &str, text: &str) -> Option<RemoteResult> {
		self.caps
			.update_node_text
			.then(|| self.record("updateNodeText", &[id, text]))
	}

	fn update_node_position(&self, id: &str, x: f64, y: f64) -> Option<RemoteResult> {
		self.caps
			.update_node_position
			.then(|| self.record("updateNodePosition", &[id, &x.to_string(), &y.to_string()]))
	}

	fn update_full_graph(&self, graph: &GraphData) -> Option<RemoteResult> {
		self.caps.update_full_graph.then(|| {
			let summary = format!("{}n/{}l", graph.nodes.len(), graph.links.len());
			self.record("updateFullGraph", &[&summary])
		})
	}

	fn get_full_graph(&self) -> Option<LocalBoxFuture<'static, RemoteResult<GraphData>>> {
		if !self.caps.get_full_graph {
			return None;
		}
		let reply = self
			.record("getFullGraph", &[])
			.map(|()| self.graph.borrow().clone());
		Some(future::ready(reply).boxed_local())
	}

	fn app_ready(&self) -> Option<RemoteResult> {
		self.caps.app_ready.then(|| self.record("appReady", &[]))
	}

	fn subscribe(&self, kind: EventKind, listener: HostListener) -> Subscription {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.listeners.borrow_mut().push((id, kind, listener));
		let listeners = Rc::downgrade(&self.listeners);
		Subscription::new(move || {
			if let Some(listeners) = listeners.upgrade() {
				listeners.borrow_mut().retain(|(other, _, _)| *other != id);
			}
		})
	}
}
