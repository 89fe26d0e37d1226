//! Typed mutation and query facade over the host's graph object.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use log::{debug, error, info, warn};

use super::connection::{ConnectionManager, DiscoveryHandle};
use super::events::{EventBus, EventKind, GraphEvent, Listener};
use super::remote::{Channel, Host, NodeManager, Subscription};
use crate::config::BridgeConfig;
use crate::error::{RemoteError, SyncError};
use crate::model::GraphData;

/// Bridges local calls to the host graph and host signals to a local bus.
///
/// Every operation is a logged no-op before the channel is up. Results can be
/// ignored; they exist for callers that need to tell "nothing happened" from
/// "done".
pub struct GraphSyncService {
	config: BridgeConfig,
	connection: ConnectionManager,
	bus: Rc<EventBus>,
	remote: RefCell<Option<Rc<dyn NodeManager>>>,
	subscriptions: RefCell<Vec<Subscription>>,
	/// Run once, the next time the service binds.
	ready: RefCell<Vec<Box<dyn FnOnce()>>>,
}

fn remote_failure(err: RemoteError) -> SyncError {
	error!("{err}");
	SyncError::Remote(err)
}

impl GraphSyncService {
	pub fn new(host: Rc<dyn Host>, config: BridgeConfig) -> Rc<Self> {
		Rc::new(Self {
			connection: ConnectionManager::new(host, config.retry_interval()),
			config,
			bus: Rc::new(EventBus::new()),
			remote: RefCell::new(None),
			subscriptions: RefCell::new(Vec::new()),
			ready: RefCell::new(Vec::new()),
		})
	}

	/// Discover the channel, bind to the graph object and start forwarding its
	/// signals. `on_ready` runs once the service is connected.
	pub fn initialize(self: &Rc<Self>, on_ready: impl FnOnce() + 'static) -> DiscoveryHandle {
		let service = Rc::downgrade(self);
		self.connection.initialize(move |channel| {
			let Some(service) = service.upgrade() else {
				return;
			};
			if service.bind(&channel) {
				on_ready();
				let waiting = mem::take(&mut *service.ready.borrow_mut());
				for task in waiting {
					task();
				}
			}
		})
	}

	/// Run `task` now if connected, otherwise once the service next binds to
	/// the host object.
	pub fn when_ready(&self, task: impl FnOnce() + 'static) {
		if self.is_connected() {
			task();
		} else {
			self.ready.borrow_mut().push(Box::new(task));
		}
	}

	fn bind(&self, channel: &Channel) -> bool {
		let name = &self.config.object_name;
		let Some(remote) = channel.object(name) else {
			error!(
				"Channel does not expose `{name}` (has: {})",
				channel.object_names().collect::<Vec<_>>().join(", ")
			);
			return false;
		};

		let subscriptions: Vec<Subscription> = EventKind::ALL
			.into_iter()
			.map(|kind| {
				let bus = Rc::downgrade(&self.bus);
				remote.subscribe(
					kind,
					Rc::new(move |event: GraphEvent| {
						debug!("{kind} from host");
						if let Some(bus) = bus.upgrade() {
							bus.emit(&event);
						}
					}),
				)
			})
			.collect();

		let stale = mem::replace(&mut *self.subscriptions.borrow_mut(), subscriptions);
		drop(stale);
		*self.remote.borrow_mut() = Some(remote);
		info!("Bound to host object `{name}`");
		true
	}

	/// Drop the host signal connections and the bound object.
	pub fn disconnect(&self) {
		let subscriptions = mem::take(&mut *self.subscriptions.borrow_mut());
		drop(subscriptions);
		self.remote.borrow_mut().take();
		self.connection.reset();
		info!("Disconnected from host");
	}

	pub fn is_connected(&self) -> bool {
		self.remote.borrow().is_some()
	}

	pub fn events(&self) -> &EventBus {
		&self.bus
	}

	pub fn on(&self, kind: EventKind, listener: Listener) -> bool {
		self.bus.on(kind, listener)
	}

	pub fn off(&self, kind: EventKind, listener: &Listener) -> bool {
		self.bus.off(kind, listener)
	}

	fn remote(&self, method: &str) -> Result<Rc<dyn NodeManager>, SyncError> {
		self.remote.borrow().clone().ok_or_else(|| {
			warn!("Not connected to host; dropping `{method}`");
			SyncError::NotConnected
		})
	}

	pub fn add_node(&self, id: &str, text: &str, parent_id: &str) -> Result<(), SyncError> {
		let remote = self.remote("addNode")?;
		debug!("Adding node {id} ({text:?}) under {parent_id:?}");
		remote.add_node(id, text, parent_id).map_err(remote_failure)
	}

	pub fn remove_node(&self, id: &str) -> Result<(), SyncError> {
		let remote = self.remote("removeNode")?;
		debug!("Removing node {id}");
		remote.remove_node(id).map_err(remote_failure)
	}

	/// Change a node's text, through `updateNodeText` on hosts without
	/// `updateNode`.
	pub fn update_node(&self, id: &str, text: &str) -> Result<(), SyncError> {
		let remote = self.remote("updateNode")?;
		debug!("Updating node {id} to {text:?}");
		match remote
			.update_node(id, text)
			.or_else(|| remote.update_node_text(id, text))
		{
			Some(result) => result.map_err(remote_failure),
			None => {
				debug!("Host has neither updateNode nor updateNodeText");
				Err(SyncError::Unsupported {
					method: "updateNode",
				})
			}
		}
	}

	/// Best effort: hosts without `updateNodePosition` get a warning and
	/// nothing else.
	pub fn update_node_position(&self, id: &str, x: f64, y: f64) -> Result<(), SyncError> {
		let remote = self.remote("updateNodePosition")?;
		debug!("Updating node {id} position to ({x}, {y})");
		match remote.update_node_position(id, x, y) {
			Some(result) => result.map_err(remote_failure),
			None => {
				warn!("Host object does not support updateNodePosition");
				Err(SyncError::Unsupported {
					method: "updateNodePosition",
				})
			}
		}
	}

	/// Push a whole snapshot.
	///
	/// Without a bulk method on the host the snapshot is replayed as individual
	/// adds: nodes first (each followed by its position when it has one), then
	/// links. The replay is additive only; anything the host holds that is not
	/// in `graph` stays there. The first failing call stops the replay, and the
	/// calls issued before it stand.
	pub fn update_full_graph(&self, graph: &GraphData) -> Result<(), SyncError> {
		let remote = self.remote("updateFullGraph")?;
		debug!(
			"Updating full graph ({} nodes, {} links)",
			graph.nodes.len(),
			graph.links.len()
		);
		if let Some(result) = remote.update_full_graph(graph) {
			return result.map_err(remote_failure);
		}

		warn!("Host object does not support updateFullGraph; replaying nodes and links");
		self.replay(graph).inspect_err(|err| {
			error!("Manual graph update stopped: {err}");
		})
	}

	fn replay(&self, graph: &GraphData) -> Result<(), SyncError> {
		for node in &graph.nodes {
			self.add_node(&node.id, &node.text, node.parent_id())?;
			if let Some((x, y)) = node.position() {
				match self.update_node_position(&node.id, x, y) {
					Ok(()) | Err(SyncError::Unsupported { .. }) => {}
					Err(err) => return Err(err),
				}
			}
		}
		for link in &graph.links {
			self.add_connection(&link.source, &link.target)?;
		}
		Ok(())
	}

	pub fn add_connection(&self, source_id: &str, target_id: &str) -> Result<(), SyncError> {
		let remote = self.remote("addConnection")?;
		debug!("Adding connection {source_id} -> {target_id}");
		remote
			.add_connection(source_id, target_id)
			.map_err(remote_failure)
	}

	pub fn remove_connection(&self, source_id: &str, target_id: &str) -> Result<(), SyncError> {
		let remote = self.remote("removeConnection")?;
		debug!("Removing connection {source_id} -> {target_id}");
		remote
			.remove_connection(source_id, target_id)
			.map_err(remote_failure)
	}

	/// Tell the host the view is ready so it pushes its graph.
	pub fn app_ready(&self) -> Result<(), SyncError> {
		let remote = self.remote("appReady")?;
		match remote.app_ready() {
			Some(result) => result.map_err(remote_failure),
			None => {
				warn!("Host object does not support appReady");
				Err(SyncError::Unsupported { method: "appReady" })
			}
		}
	}

	/// Fetch the host's graph. Any failure yields an empty graph; use
	/// [`try_get_full_graph`](Self::try_get_full_graph) to find out why.
	pub async fn get_full_graph(&self) -> GraphData {
		self.try_get_full_graph().await.unwrap_or_default()
	}

	pub async fn try_get_full_graph(&self) -> Result<GraphData, SyncError> {
		let remote = self.remote("getFullGraph")?;
		debug!("Getting full graph");
		let Some(reply) = remote.get_full_graph() else {
			warn!("Host object does not support getFullGraph");
			return Err(SyncError::Unsupported {
				method: "getFullGraph",
			});
		};
		reply.await.map_err(|err| {
			error!("Error getting full graph: {err}");
			SyncError::Remote(err)
		})
	}
}
