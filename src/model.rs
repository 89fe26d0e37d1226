//! Graph data exchanged with the host: nodes, links and full snapshots.

use serde::{Deserialize, Serialize};

use crate::bridge::events::GraphEvent;

/// A node in the host's graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
	pub id: String,
	#[serde(default)]
	pub text: String,
	/// Advisory only; nothing checks that it names an existing node.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parent: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
}

impl Node {
	/// Create an unpositioned node without a parent.
	pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			text: text.into(),
			..Self::default()
		}
	}

	/// Set the advisory parent id.
	pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
		self.parent = Some(parent.into());
		self
	}

	/// Set an explicit position.
	pub fn with_position(mut self, x: f64, y: f64) -> Self {
		self.x = Some(x);
		self.y = Some(y);
		self
	}

	/// The position, if the node carries both coordinates.
	pub fn position(&self) -> Option<(f64, f64)> {
		self.x.zip(self.y)
	}

	/// The parent id as the host expects it: empty when absent.
	pub fn parent_id(&self) -> &str {
		self.parent.as_deref().unwrap_or("")
	}
}

/// A connection between two nodes, referenced by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
	pub source: String,
	pub target: String,
}

impl Link {
	/// A directed link from `source` to `target`.
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
		}
	}

	/// Identity key used for keyed reconciliation. Order matters: `a-b` and
	/// `b-a` are distinct links.
	pub fn key(&self) -> String {
		format!("{}-{}", self.source, self.target)
	}

	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// A full graph snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	#[serde(default)]
	pub nodes: Vec<Node>,
	#[serde(default)]
	pub links: Vec<Link>,
}

impl GraphData {
	pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
		Self { nodes, links }
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.links.is_empty()
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Fold a host event into this working copy.
	pub fn apply(&mut self, event: &GraphEvent) {
		match event {
			GraphEvent::NodeAdded(node) | GraphEvent::NodeUpdated(node) => self.upsert_node(node),
			GraphEvent::NodeRemoved(id) => {
				self.nodes.retain(|n| &n.id != id);
				self.links.retain(|l| !l.touches(id));
			}
			GraphEvent::ConnectionAdded(link) => {
				if !self.links.iter().any(|l| l == link) {
					self.links.push(link.clone());
				}
			}
			GraphEvent::ConnectionRemoved { source, target } => {
				self.links
					.retain(|l| !(&l.source == source && &l.target == target));
			}
			GraphEvent::GraphUpdated(graph) => *self = graph.clone(),
		}
	}

	fn upsert_node(&mut self, node: &Node) {
		match self.nodes.iter_mut().find(|n| n.id == node.id) {
			Some(existing) => {
				existing.text = node.text.clone();
				existing.parent = node.parent.clone();
				if node.position().is_some() {
					existing.x = node.x;
					existing.y = node.y;
				}
			}
			None => self.nodes.push(node.clone()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> GraphData {
		GraphData::new(
			vec![Node::new("a", "A"), Node::new("b", "B"), Node::new("c", "C")],
			vec![Link::new("a", "b"), Link::new("b", "c")],
		)
	}

	#[test]
	fn link_key_is_order_sensitive() {
		assert_eq!(Link::new("a", "b").key(), "a-b");
		assert_ne!(Link::new("a", "b").key(), Link::new("b", "a").key());
	}

	#[test]
	fn parses_host_json_with_optional_fields() {
		let json = r#"{
			"nodes": [
				{"id": "root", "text": "Root", "parent": ""},
				{"id": "child", "text": "Child", "parent": "root", "x": 10.5, "y": -3}
			],
			"links": [{"source": "root", "target": "child"}]
		}"#;
		let graph: GraphData = serde_json::from_str(json).unwrap();
		assert_eq!(graph.nodes.len(), 2);
		assert_eq!(graph.nodes[0].position(), None);
		assert_eq!(graph.nodes[1].position(), Some((10.5, -3.0)));
		assert_eq!(graph.nodes[1].parent_id(), "root");
		assert_eq!(graph.links[0].key(), "root-child");
	}

	#[test]
	fn missing_arrays_default_to_empty() {
		let graph: GraphData = serde_json::from_str("{}").unwrap();
		assert!(graph.is_empty());
	}

	#[test]
	fn node_removal_drops_incident_links() {
		let mut graph = sample();
		graph.apply(&GraphEvent::NodeRemoved("b".into()));
		assert_eq!(graph.nodes.len(), 2);
		assert!(graph.links.is_empty());
	}

	#[test]
	fn node_events_upsert_by_id() {
		let mut graph = sample();
		graph.apply(&GraphEvent::NodeUpdated(Node::new("a", "Renamed")));
		graph.apply(&GraphEvent::NodeAdded(Node::new("d", "D").with_parent("a")));
		assert_eq!(graph.node("a").map(|n| n.text.as_str()), Some("Renamed"));
		assert_eq!(graph.node("d").map(Node::parent_id), Some("a"));
		assert_eq!(graph.nodes.len(), 4);
	}

	#[test]
	fn connection_events_respect_direction() {
		let mut graph = sample();
		graph.apply(&GraphEvent::ConnectionAdded(Link::new("a", "b")));
		assert_eq!(graph.links.len(), 2);
		graph.apply(&GraphEvent::ConnectionRemoved {
			source: "b".into(),
			target: "a".into(),
		});
		assert_eq!(graph.links.len(), 2);
		graph.apply(&GraphEvent::ConnectionRemoved {
			source: "a".into(),
			target: "b".into(),
		});
		assert_eq!(graph.links, vec![Link::new("b", "c")]);
	}

	#[test]
	fn graph_updated_replaces_the_copy() {
		let mut graph = sample();
		let replacement = GraphData::new(vec![Node::new("z", "Z")], vec![]);
		graph.apply(&GraphEvent::GraphUpdated(replacement.clone()));
		assert_eq!(graph, replacement);
	}
}
