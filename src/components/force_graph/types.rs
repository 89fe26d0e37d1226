use indexmap::IndexMap;

/// A drawn node: a circle with its text centred on it.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeElement {
	pub text: String,
	pub x: f64,
	pub y: f64,
	pub radius: f64,
	pub color: &'static str,
	pub pinned: bool,
}

/// A drawn link: a straight line between its endpoints' centres.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkElement {
	pub source: String,
	pub target: String,
	pub x1: f64,
	pub y1: f64,
	pub x2: f64,
	pub y2: f64,
}

/// The retained set of visual elements, keyed by node id and link key, in
/// insertion order (which is also paint order).
#[derive(Clone, Debug, Default)]
pub struct Scene {
	pub nodes: IndexMap<String, NodeElement>,
	pub links: IndexMap<String, LinkElement>,
}

impl Scene {
	pub fn node_keys(&self) -> impl Iterator<Item = &str> {
		self.nodes.keys().map(String::as_str)
	}

	pub fn link_keys(&self) -> impl Iterator<Item = &str> {
		self.links.keys().map(String::as_str)
	}

	pub fn node(&self, id: &str) -> Option<&NodeElement> {
		self.nodes.get(id)
	}

	pub fn link(&self, key: &str) -> Option<&LinkElement> {
		self.links.get(key)
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.links.is_empty()
	}
}

/// What one reconciliation pass created and removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderDelta {
	pub entered_nodes: Vec<String>,
	pub exited_nodes: Vec<String>,
	pub entered_links: Vec<String>,
	pub exited_links: Vec<String>,
	/// Links dropped because an endpoint is not in the graph.
	pub dangling_links: Vec<String>,
}

impl RenderDelta {
	pub fn is_empty(&self) -> bool {
		self.entered_nodes.is_empty()
			&& self.exited_nodes.is_empty()
			&& self.entered_links.is_empty()
			&& self.exited_links.is_empty()
	}
}
