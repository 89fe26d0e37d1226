use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use log::{debug, info};

use super::state::ForceLayoutRenderer;
use crate::bridge::{EventKind, GraphSyncService, Listener, listener};
use crate::error::SyncError;

/// Feeds a renderer from a sync service: every host event is folded into the
/// renderer's working copy, and [`load`](Self::load) pulls the full graph.
///
/// Dropping the binding unsubscribes it.
pub struct GraphBinding {
	service: Rc<GraphSyncService>,
	renderer: Rc<RefCell<ForceLayoutRenderer>>,
	listeners: Vec<(EventKind, Listener)>,
}

impl GraphBinding {
	pub fn attach(
		service: Rc<GraphSyncService>,
		renderer: Rc<RefCell<ForceLayoutRenderer>>,
	) -> Self {
		let listeners: Vec<(EventKind, Listener)> = EventKind::ALL
			.into_iter()
			.map(|kind| {
				let target = Rc::downgrade(&renderer);
				let on_event = listener(move |event| {
					let Some(target) = target.upgrade() else {
						return Ok(());
					};
					let delta = target.try_borrow_mut()?.apply_event(event);
					debug!(
						"{kind}: +{}/-{} nodes, +{}/-{} links",
						delta.entered_nodes.len(),
						delta.exited_nodes.len(),
						delta.entered_links.len(),
						delta.exited_links.len()
					);
					Ok(())
				});
				service.on(kind, on_event.clone());
				(kind, on_event)
			})
			.collect();

		Self {
			service,
			renderer,
			listeners,
		}
	}

	pub fn renderer(&self) -> &Rc<RefCell<ForceLayoutRenderer>> {
		&self.renderer
	}

	/// Pull the host graph as soon as the service is connected. `spawn` drives
	/// the pull on the caller's executor.
	///
	/// Hosts without `getFullGraph` are asked to push it as `graphUpdated`
	/// instead.
	pub fn load_when_ready(
		self: &Rc<Self>,
		spawn: impl FnOnce(LocalBoxFuture<'static, ()>) + 'static,
	) {
		let binding = Rc::downgrade(self);
		self.service.when_ready(move || {
			let Some(binding) = binding.upgrade() else {
				return;
			};
			spawn(
				async move {
					if let Err(SyncError::Unsupported { .. }) = binding.load().await {
						let _ = binding.service.app_ready();
					}
				}
				.boxed_local(),
			);
		});
	}

	/// Render the host's current graph. A failed fetch leaves the scene as it
	/// is instead of clearing it.
	pub async fn load(&self) -> Result<(), SyncError> {
		let graph = self.service.try_get_full_graph().await?;
		info!(
			"Loaded graph: {} nodes, {} links",
			graph.nodes.len(),
			graph.links.len()
		);
		self.renderer.borrow_mut().render_graph(&graph);
		Ok(())
	}
}

impl Drop for GraphBinding {
	fn drop(&mut self) {
		for (kind, on_event) in &self.listeners {
			self.service.off(*kind, on_event);
		}
	}
}
