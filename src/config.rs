//! Tunables for channel discovery and the layout simulation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Channel discovery settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
	/// Delay between checks for the host transport.
	pub retry_interval_ms: u64,
	/// Name of the channel object holding the graph.
	pub object_name: String,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			retry_interval_ms: 100,
			object_name: "nodeManager".into(),
		}
	}
}

impl BridgeConfig {
	pub fn retry_interval(&self) -> Duration {
		Duration::from_millis(self.retry_interval_ms)
	}
}

/// Force model and energy settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Target separation of linked nodes.
	pub link_distance: f64,
	/// Many-body strength; negative repels.
	pub charge_strength: f64,
	/// Radius used by the collision force.
	pub collision_radius: f64,
	/// Radius of the drawn node circle, also used for hit testing.
	pub node_radius: f64,
	/// Alpha set on every render and resize.
	pub restart_alpha: f64,
	/// Alpha target held while a drag is active.
	pub drag_alpha_target: f64,
	pub alpha_min: f64,
	pub alpha_decay: f64,
	pub velocity_decay: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		let alpha_min: f64 = 0.001;
		Self {
			link_distance: 100.0,
			charge_strength: -300.0,
			collision_radius: 60.0,
			node_radius: 20.0,
			restart_alpha: 0.3,
			drag_alpha_target: 0.3,
			alpha_min,
			// Cools from 1 to alpha_min in roughly 300 ticks.
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			velocity_decay: 0.4,
		}
	}
}
