use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::debug;

use super::simulation::{SimLink, SimNode, Simulation};
use super::types::{LinkElement, NodeElement, RenderDelta, Scene};
use crate::bridge::events::GraphEvent;
use crate::config::LayoutConfig;
use crate::model::{GraphData, Link, Node};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Roots share the first colour; siblings share one picked by their parent.
fn color_for(node: &Node) -> &'static str {
	match node.parent.as_deref().filter(|p| !p.is_empty()) {
		None => COLORS[0],
		Some(parent) => {
			let hash = parent
				.bytes()
				.fold(0usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
			COLORS[1 + hash % (COLORS.len() - 1)]
		}
	}
}

/// Nodes currently held by a pointer.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: HashSet<String>,
}

/// Owns the working graph copy, the simulation and the scene drawn from them.
pub struct ForceLayoutRenderer {
	simulation: Simulation,
	scene: Scene,
	data: GraphData,
	index: HashMap<String, usize>,
	drag: DragState,
	config: LayoutConfig,
	width: f64,
	height: f64,
}

impl ForceLayoutRenderer {
	pub fn new(width: f64, height: f64) -> Self {
		Self::with_config(LayoutConfig::default(), width, height)
	}

	pub fn with_config(config: LayoutConfig, width: f64, height: f64) -> Self {
		Self {
			simulation: Simulation::new(config.clone(), width, height),
			scene: Scene::default(),
			data: GraphData::default(),
			index: HashMap::new(),
			drag: DragState::default(),
			config,
			width,
			height,
		}
	}

	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	/// The graph as last rendered, after de-duplication.
	pub fn data(&self) -> &GraphData {
		&self.data
	}

	pub fn simulation(&self) -> &Simulation {
		&self.simulation
	}

	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	pub fn width(&self) -> f64 {
		self.width
	}

	pub fn height(&self) -> f64 {
		self.height
	}

	/// Nothing has been drawn yet, or the last graph was empty.
	pub fn is_empty(&self) -> bool {
		self.scene.nodes.is_empty()
	}

	/// Reconcile the scene with `graph` and re-warm the simulation.
	///
	/// Nodes are keyed by id and links by `source-target`; a repeated key keeps
	/// its first slot and its last data. Links with an endpoint missing from
	/// `graph` are not drawn. Nodes that survive keep their simulated state.
	pub fn render_graph(&mut self, graph: &GraphData) -> RenderDelta {
		let mut delta = RenderDelta::default();

		let mut nodes: IndexMap<String, Node> = IndexMap::with_capacity(graph.nodes.len());
		for node in &graph.nodes {
			nodes.insert(node.id.clone(), node.clone());
		}
		let mut links: IndexMap<String, Link> = IndexMap::with_capacity(graph.links.len());
		for link in &graph.links {
			links.insert(link.key(), link.clone());
		}

		let mut previous: HashMap<String, SimNode> = self
			.simulation
			.nodes()
			.iter()
			.map(|n| (n.id.clone(), n.clone()))
			.collect();
		let sim_nodes: Vec<SimNode> = nodes
			.values()
			.map(|node| match previous.remove(&node.id) {
				Some(existing) => existing,
				None => match node.position() {
					Some((x, y)) => SimNode::at(&node.id, x, y),
					None => SimNode::new(&node.id),
				},
			})
			.collect();
		self.index = nodes
			.keys()
			.enumerate()
			.map(|(i, id)| (id.clone(), i))
			.collect();

		let mut old_nodes = std::mem::take(&mut self.scene.nodes);
		for (id, node) in &nodes {
			let element = match old_nodes.shift_remove(id) {
				Some(mut element) => {
					element.text = node.text.clone();
					element.color = color_for(node);
					element
				}
				None => {
					delta.entered_nodes.push(id.clone());
					NodeElement {
						text: node.text.clone(),
						x: 0.0,
						y: 0.0,
						radius: self.config.node_radius,
						color: color_for(node),
						pinned: false,
					}
				}
			};
			self.scene.nodes.insert(id.clone(), element);
		}
		delta.exited_nodes = old_nodes.into_keys().collect();

		let mut sim_links = Vec::with_capacity(links.len());
		let mut old_links = std::mem::take(&mut self.scene.links);
		for (key, link) in &links {
			let (Some(&source), Some(&target)) =
				(self.index.get(&link.source), self.index.get(&link.target))
			else {
				delta.dangling_links.push(key.clone());
				continue;
			};
			sim_links.push(SimLink { source, target });
			let element = match old_links.shift_remove(key) {
				Some(mut element) => {
					element.source = link.source.clone();
					element.target = link.target.clone();
					element
				}
				None => {
					delta.entered_links.push(key.clone());
					LinkElement {
						source: link.source.clone(),
						target: link.target.clone(),
						x1: 0.0,
						y1: 0.0,
						x2: 0.0,
						y2: 0.0,
					}
				}
			};
			self.scene.links.insert(key.clone(), element);
		}
		delta.exited_links = old_links.into_keys().collect();
		if !delta.dangling_links.is_empty() {
			debug!(
				"Skipping {} link(s) with unknown endpoints: {}",
				delta.dangling_links.len(),
				delta.dangling_links.join(", ")
			);
		}

		self.simulation.set_nodes(sim_nodes);
		self.simulation.set_links(sim_links);
		self.simulation.set_alpha(self.config.restart_alpha);
		self.simulation.restart();

		let was_dragging = !self.drag.active.is_empty();
		self.drag.active.retain(|id| self.index.contains_key(id));
		if was_dragging && self.drag.active.is_empty() {
			self.simulation.set_alpha_target(0.0);
		}

		self.data = GraphData::new(nodes.into_values().collect(), links.into_values().collect());
		self.sync_scene();
		delta
	}

	/// Fold one host event into the working copy and re-render it.
	pub fn apply_event(&mut self, event: &GraphEvent) -> RenderDelta {
		let mut data = std::mem::take(&mut self.data);
		data.apply(event);
		self.render_graph(&data)
	}

	/// Advance the simulation by one frame and move the scene along. Returns
	/// `false` once the layout has cooled down.
	pub fn tick(&mut self) -> bool {
		if !self.simulation.step() {
			return false;
		}
		self.sync_scene();
		true
	}

	fn sync_scene(&mut self) {
		let nodes = self.simulation.nodes();
		for node in nodes {
			if let Some(element) = self.scene.nodes.get_mut(&node.id) {
				element.x = node.x;
				element.y = node.y;
				element.pinned = node.is_pinned();
			}
		}
		for link in self.scene.links.values_mut() {
			let (Some(&s), Some(&t)) = (self.index.get(&link.source), self.index.get(&link.target))
			else {
				continue;
			};
			(link.x1, link.y1) = (nodes[s].x, nodes[s].y);
			(link.x2, link.y2) = (nodes[t].x, nodes[t].y);
		}
	}

	/// Pin `id` where it is and keep the simulation warm while any drag lasts.
	pub fn drag_start(&mut self, id: &str) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		if self.drag.active.is_empty() {
			self.simulation
				.set_alpha_target(self.config.drag_alpha_target);
			self.simulation.restart();
		}
		self.drag.active.insert(id.to_owned());
		let node = &mut self.simulation.nodes_mut()[i];
		node.fx = Some(node.x);
		node.fy = Some(node.y);
		self.sync_scene();
		true
	}

	/// Move the pin of a dragged node.
	pub fn drag_move(&mut self, id: &str, x: f64, y: f64) -> bool {
		if !self.drag.active.contains(id) {
			return false;
		}
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		let node = &mut self.simulation.nodes_mut()[i];
		node.fx = Some(x);
		node.fy = Some(y);
		true
	}

	/// Release a dragged node back to the forces. The last release lets the
	/// simulation cool down again.
	pub fn drag_end(&mut self, id: &str) -> bool {
		if !self.drag.active.remove(id) {
			return false;
		}
		if self.drag.active.is_empty() {
			self.simulation.set_alpha_target(0.0);
		}
		if let Some(&i) = self.index.get(id) {
			let node = &mut self.simulation.nodes_mut()[i];
			node.fx = None;
			node.fy = None;
		}
		self.sync_scene();
		true
	}

	pub fn is_dragging(&self, id: &str) -> bool {
		self.drag.active.contains(id)
	}

	pub fn is_pinned(&self, id: &str) -> bool {
		self.index
			.get(id)
			.is_some_and(|&i| self.simulation.nodes()[i].is_pinned())
	}

	pub fn node_position(&self, id: &str) -> Option<(f64, f64)> {
		self.index.get(id).map(|&i| {
			let node = &self.simulation.nodes()[i];
			(node.x, node.y)
		})
	}

	/// The topmost node whose circle contains the point.
	pub fn node_at_position(&self, x: f64, y: f64) -> Option<&str> {
		self.scene
			.nodes
			.iter()
			.rev()
			.find(|(_, el)| (el.x - x).hypot(el.y - y) <= el.radius)
			.map(|(id, _)| id.as_str())
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.simulation.set_center(width / 2.0, height / 2.0);
		self.simulation.set_alpha(self.config.restart_alpha);
		self.simulation.restart();
	}
}
