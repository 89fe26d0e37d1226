mod binding;
#[cfg(target_arch = "wasm32")]
mod component;
#[cfg(target_arch = "wasm32")]
mod render;
pub mod simulation;
mod state;
mod types;

pub use binding::GraphBinding;
#[cfg(target_arch = "wasm32")]
pub use component::ForceGraphCanvas;
pub use simulation::{SimLink, SimNode, Simulation};
pub use state::{DragState, ForceLayoutRenderer};
pub use types::{LinkElement, NodeElement, RenderDelta, Scene};
