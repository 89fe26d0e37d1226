//! Alpha-cooled force simulation: link springs, many-body charge, centering
//! and collision, integrated with velocity decay.
//!
//! Each tick cools `alpha` toward `alpha_target`. The simulation counts as
//! running until alpha drops below `alpha_min`, unless a non-zero target keeps
//! it warm.

use std::f64::consts::PI;

use crate::config::LayoutConfig;

const INITIAL_RADIUS: f64 = 10.0;
/// Lower bound on squared distance for the charge force.
const DISTANCE_MIN2: f64 = 1.0;

/// A simulated body. `fx`/`fy` pin it in place when set.
#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
	pub id: String,
	pub x: f64,
	pub y: f64,
	/// Velocity, damped by the velocity decay every tick.
	pub vx: f64,
	pub vy: f64,
	/// Fixed position; overrides `x` after each tick.
	pub fx: Option<f64>,
	pub fy: Option<f64>,
}

impl SimNode {
	/// A node the simulation will place itself.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			x: f64::NAN,
			y: f64::NAN,
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
		}
	}

	pub fn at(id: impl Into<String>, x: f64, y: f64) -> Self {
		Self {
			x,
			y,
			..Self::new(id)
		}
	}

	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}

	fn is_placed(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

/// A spring between two entries of the node list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimLink {
	pub source: usize,
	pub target: usize,
}

/// Deterministic jitter source, so coincident nodes separate the same way on
/// every run.
#[derive(Clone, Debug)]
struct Lcg(u64);

impl Lcg {
	const A: u64 = 1_664_525;
	const C: u64 = 1_013_904_223;
	const M: u64 = 1 << 32;

	fn next(&mut self) -> f64 {
		self.0 = (Self::A * self.0 + Self::C) % Self::M;
		self.0 as f64 / Self::M as f64
	}

	fn jiggle(&mut self) -> f64 {
		(self.next() - 0.5) * 1e-6
	}
}

pub struct Simulation {
	nodes: Vec<SimNode>,
	links: Vec<SimLink>,
	link_strength: Vec<f64>,
	link_bias: Vec<f64>,
	center: (f64, f64),
	alpha: f64,
	alpha_target: f64,
	running: bool,
	config: LayoutConfig,
	random: Lcg,
}

impl Simulation {
	pub fn new(config: LayoutConfig, width: f64, height: f64) -> Self {
		Self {
			nodes: Vec::new(),
			links: Vec::new(),
			link_strength: Vec::new(),
			link_bias: Vec::new(),
			center: (width / 2.0, height / 2.0),
			alpha: 1.0,
			alpha_target: 0.0,
			running: true,
			config,
			random: Lcg(1),
		}
	}

	pub fn nodes(&self) -> &[SimNode] {
		&self.nodes
	}

	pub fn nodes_mut(&mut self) -> &mut [SimNode] {
		&mut self.nodes
	}

	pub fn links(&self) -> &[SimLink] {
		&self.links
	}

	/// Replace the node list. Unplaced nodes are laid out on a phyllotaxis
	/// spiral, pinned ones start at their pin. Links are cleared; call
	/// [`set_links`](Self::set_links) afterwards.
	pub fn set_nodes(&mut self, nodes: Vec<SimNode>) {
		self.nodes = nodes;
		let angle_step = PI * (3.0 - 5f64.sqrt());
		for (i, node) in self.nodes.iter_mut().enumerate() {
			if let Some(fx) = node.fx {
				node.x = fx;
			}
			if let Some(fy) = node.fy {
				node.y = fy;
			}
			if !node.is_placed() {
				let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
				let angle = i as f64 * angle_step;
				node.x = radius * angle.cos();
				node.y = radius * angle.sin();
			}
			if !node.vx.is_finite() || !node.vy.is_finite() {
				node.vx = 0.0;
				node.vy = 0.0;
			}
		}
		// Link indices referred to the old list.
		self.set_links(Vec::new());
	}

	/// Replace the link list. Links must index into the current node list;
	/// out-of-range links are ignored.
	pub fn set_links(&mut self, links: Vec<SimLink>) {
		let count = self.nodes.len();
		self.links = links
			.into_iter()
			.filter(|l| l.source < count && l.target < count)
			.collect();

		let mut degree = vec![0usize; count];
		for link in &self.links {
			degree[link.source] += 1;
			degree[link.target] += 1;
		}
		self.link_strength = self
			.links
			.iter()
			.map(|l| 1.0 / degree[l.source].min(degree[l.target]) as f64)
			.collect();
		self.link_bias = self
			.links
			.iter()
			.map(|l| degree[l.source] as f64 / (degree[l.source] + degree[l.target]) as f64)
			.collect();
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn set_alpha(&mut self, alpha: f64) {
		self.alpha = alpha.clamp(0.0, 1.0);
	}

	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, 1.0);
	}

	pub fn center(&self) -> (f64, f64) {
		self.center
	}

	pub fn set_center(&mut self, x: f64, y: f64) {
		self.center = (x, y);
	}

	/// Resume ticking at the current alpha.
	pub fn restart(&mut self) {
		self.running = true;
	}

	pub fn stop(&mut self) {
		self.running = false;
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Advance one frame if running; stops once cooled. Returns whether a tick
	/// happened.
	pub fn step(&mut self) -> bool {
		if !self.running {
			return false;
		}
		self.tick();
		if self.alpha < self.config.alpha_min {
			self.running = false;
		}
		true
	}

	/// One integration step, regardless of the running flag.
	pub fn tick(&mut self) {
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		let alpha = self.alpha;

		self.apply_links(alpha);
		self.apply_charge(alpha);
		self.apply_center();
		self.apply_collision();

		let keep = 1.0 - self.config.velocity_decay;
		for node in &mut self.nodes {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= keep;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= keep;
					node.y += node.vy;
				}
			}
		}
	}

	fn apply_links(&mut self, alpha: f64) {
		let distance = self.config.link_distance;
		for (i, link) in self.links.iter().enumerate() {
			let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
			let mut x = t.x + t.vx - s.x - s.vx;
			let mut y = t.y + t.vy - s.y - s.vy;
			if x == 0.0 {
				x = self.random.jiggle();
			}
			if y == 0.0 {
				y = self.random.jiggle();
			}
			let len = (x * x + y * y).sqrt();
			let k = (len - distance) / len * alpha * self.link_strength[i];
			x *= k;
			y *= k;

			let bias = self.link_bias[i];
			let target = &mut self.nodes[link.target];
			target.vx -= x * bias;
			target.vy -= y * bias;
			let source = &mut self.nodes[link.source];
			source.vx += x * (1.0 - bias);
			source.vy += y * (1.0 - bias);
		}
	}

	/// Exact pairwise charge; graphs here are small enough not to need an
	/// approximation.
	fn apply_charge(&mut self, alpha: f64) {
		let strength = self.config.charge_strength;
		let count = self.nodes.len();
		for i in 0..count {
			let (xi, yi) = (self.nodes[i].x, self.nodes[i].y);
			let (mut dvx, mut dvy) = (0.0, 0.0);
			for j in 0..count {
				if i == j {
					continue;
				}
				let mut x = self.nodes[j].x - xi;
				let mut y = self.nodes[j].y - yi;
				let mut l = x * x + y * y;
				if x == 0.0 {
					x = self.random.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = self.random.jiggle();
					l += y * y;
				}
				if l < DISTANCE_MIN2 {
					l = (DISTANCE_MIN2 * l).sqrt();
				}
				dvx += x * strength * alpha / l;
				dvy += y * strength * alpha / l;
			}
			self.nodes[i].vx += dvx;
			self.nodes[i].vy += dvy;
		}
	}

	fn apply_center(&mut self) {
		if self.nodes.is_empty() {
			return;
		}
		let n = self.nodes.len() as f64;
		let (sx, sy) = self
			.nodes
			.iter()
			.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
		let (dx, dy) = (sx / n - self.center.0, sy / n - self.center.1);
		for node in &mut self.nodes {
			node.x -= dx;
			node.y -= dy;
		}
	}

	fn apply_collision(&mut self) {
		let r = self.config.collision_radius;
		let reach = r + r;
		// Equal radii share the push evenly.
		let weight = 0.5;
		let count = self.nodes.len();
		for i in 0..count {
			let xi = self.nodes[i].x + self.nodes[i].vx;
			let yi = self.nodes[i].y + self.nodes[i].vy;
			for j in (i + 1)..count {
				let other = &self.nodes[j];
				let mut x = xi - other.x - other.vx;
				let mut y = yi - other.y - other.vy;
				let mut l = x * x + y * y;
				if l >= reach * reach {
					continue;
				}
				if x == 0.0 {
					x = self.random.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = self.random.jiggle();
					l += y * y;
				}
				let d = l.sqrt();
				let k = (reach - d) / d;
				x *= k;
				y *= k;
				self.nodes[i].vx += x * weight;
				self.nodes[i].vy += y * weight;
				self.nodes[j].vx -= x * (1.0 - weight);
				self.nodes[j].vy -= y * (1.0 - weight);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sim(nodes: Vec<SimNode>, links: Vec<SimLink>) -> Simulation {
		let mut sim = Simulation::new(LayoutConfig::default(), 800.0, 600.0);
		sim.set_nodes(nodes);
		sim.set_links(links);
		sim
	}

	fn distance(a: &SimNode, b: &SimNode) -> f64 {
		((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
	}

	fn run(sim: &mut Simulation, ticks: usize) {
		for _ in 0..ticks {
			sim.tick();
		}
	}

	#[test]
	fn unplaced_nodes_get_distinct_positions() {
		let sim = sim((0..5).map(|i| SimNode::new(i.to_string())).collect(), vec![]);
		for (i, a) in sim.nodes().iter().enumerate() {
			assert!(a.x.is_finite() && a.y.is_finite());
			for b in &sim.nodes()[i + 1..] {
				assert!(distance(a, b) > 1.0);
			}
		}
	}

	#[test]
	fn placed_nodes_keep_their_seed() {
		let sim = sim(vec![SimNode::at("a", 12.0, 34.0)], vec![]);
		assert_eq!((sim.nodes()[0].x, sim.nodes()[0].y), (12.0, 34.0));
	}

	#[test]
	fn linked_pair_settles_near_link_distance() {
		let mut sim = sim(
			vec![SimNode::at("a", 390.0, 300.0), SimNode::at("b", 410.0, 300.0)],
			vec![SimLink {
				source: 0,
				target: 1,
			}],
		);
		run(&mut sim, 300);
		let d = distance(&sim.nodes()[0], &sim.nodes()[1]);
		// Charge pushes the pair a little past the spring's rest length.
		assert!(d > 100.0 && d < 200.0, "distance {d}");
	}

	#[test]
	fn centering_moves_mean_to_surface_center() {
		let mut sim = sim(
			vec![SimNode::at("a", 0.0, 0.0), SimNode::at("b", 300.0, 0.0)],
			vec![],
		);
		run(&mut sim, 200);
		let (mx, my) = sim
			.nodes()
			.iter()
			.fold((0.0, 0.0), |(x, y), n| (x + n.x / 2.0, y + n.y / 2.0));
		assert!((mx - 400.0).abs() < 1.0, "mean x {mx}");
		assert!((my - 300.0).abs() < 1.0, "mean y {my}");
	}

	#[test]
	fn collision_separates_overlapping_nodes() {
		let mut config = LayoutConfig::default();
		config.charge_strength = 0.0;
		let mut sim = Simulation::new(config, 0.0, 0.0);
		sim.set_nodes(vec![SimNode::at("a", 0.0, 0.0), SimNode::at("b", 10.0, 0.0)]);
		run(&mut sim, 100);
		let d = distance(&sim.nodes()[0], &sim.nodes()[1]);
		assert!(d > 100.0, "distance {d}");
	}

	#[test]
	fn coincident_nodes_are_pushed_apart() {
		let mut sim = sim(
			vec![SimNode::at("a", 400.0, 300.0), SimNode::at("b", 400.0, 300.0)],
			vec![],
		);
		run(&mut sim, 50);
		assert!(distance(&sim.nodes()[0], &sim.nodes()[1]) > 1.0);
	}

	#[test]
	fn pinned_node_stays_put() {
		let mut pinned = SimNode::at("a", 0.0, 0.0);
		pinned.fx = Some(50.0);
		pinned.fy = Some(60.0);
		let mut sim = sim(
			vec![pinned, SimNode::at("b", 70.0, 60.0)],
			vec![SimLink {
				source: 0,
				target: 1,
			}],
		);
		run(&mut sim, 30);
		let a = &sim.nodes()[0];
		assert_eq!((a.x, a.y, a.vx, a.vy), (50.0, 60.0, 0.0, 0.0));
	}

	#[test]
	fn cools_down_and_stops() {
		let mut sim = sim(vec![SimNode::new("a"), SimNode::new("b")], vec![]);
		sim.set_alpha(0.3);
		let mut ticks = 0;
		while sim.step() {
			ticks += 1;
			assert!(ticks < 1000, "never cooled");
		}
		assert!(!sim.is_running());
		assert!(sim.alpha() < LayoutConfig::default().alpha_min);
		assert!(!sim.step());
	}

	#[test]
	fn alpha_target_keeps_it_warm() {
		let mut sim = sim(vec![SimNode::new("a")], vec![]);
		sim.set_alpha_target(0.3);
		for _ in 0..2000 {
			assert!(sim.step());
		}
		assert!((sim.alpha() - 0.3).abs() < 1e-3);
	}

	#[test]
	fn replacing_nodes_clears_links() {
		let mut sim = sim(
			vec![SimNode::new("a"), SimNode::new("b"), SimNode::new("c")],
			vec![
				SimLink {
					source: 0,
					target: 1,
				},
				SimLink {
					source: 1,
					target: 2,
				},
			],
		);
		sim.set_nodes(vec![SimNode::new("b"), SimNode::new("a")]);
		assert!(sim.links().is_empty());
		run(&mut sim, 5);

		sim.set_links(vec![SimLink {
			source: 0,
			target: 1,
		}]);
		assert_eq!(sim.links().len(), 1);
	}
}
