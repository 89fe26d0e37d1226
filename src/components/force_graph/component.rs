use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, Window};

use super::binding::GraphBinding;
use super::render;
use super::state::ForceLayoutRenderer;
use crate::bridge::GraphSyncService;
use crate::config::LayoutConfig;

/// A node held by the pointer, with the grab offset from its centre.
struct Gesture {
	id: String,
	dx: f64,
	dy: f64,
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Canvas view of the host graph. Expects `service` to be connected by the
/// time it mounts; later changes arrive as host events either way.
#[component]
pub fn ForceGraphCanvas(
	service: Rc<GraphSyncService>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(optional)] config: Option<LayoutConfig>,
	/// Report released drag positions back to the host.
	#[prop(default = false)]
	sync_positions: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let renderer = Rc::new(RefCell::new(ForceLayoutRenderer::with_config(
		config.unwrap_or_default(),
		width.unwrap_or(800.0),
		height.unwrap_or(600.0),
	)));
	let binding: Rc<RefCell<Option<Rc<GraphBinding>>>> = Rc::new(RefCell::new(None));
	let gesture: Rc<RefCell<Option<Gesture>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (renderer_init, service_init, animate_init, resize_cb_init) = (
		renderer.clone(),
		service.clone(),
		animate.clone(),
		resize_cb.clone(),
	);

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if binding.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			error!("No window; cannot start the graph view");
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into().ok())
		{
			Some(ctx) => ctx,
			None => {
				error!("Canvas has no 2d context");
				return;
			}
		};
		renderer_init.borrow_mut().resize(w, h);

		let attached = Rc::new(GraphBinding::attach(
			service_init.clone(),
			renderer_init.clone(),
		));
		*binding.borrow_mut() = Some(attached.clone());
		if !service_init.is_connected() {
			info!("Graph view mounted before the host connected; loading once it does");
		}
		attached.load_when_ready(|pending| leptos::task::spawn_local(pending));

		if fullscreen {
			let (renderer_resize, canvas_resize) = (renderer_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				renderer_resize.borrow_mut().resize(nw, nh);
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (renderer_anim, animate_inner) = (renderer_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			{
				let mut renderer = renderer_anim.borrow_mut();
				renderer.tick();
				render::render(&renderer, &ctx);
			}
			if let (Some(cb), Some(window)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let (renderer_md, gesture_md) = (renderer.clone(), gesture.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let mut renderer = renderer_md.borrow_mut();
		let Some(id) = renderer.node_at_position(x, y).map(str::to_owned) else {
			return;
		};
		let Some((nx, ny)) = renderer.node_position(&id) else {
			return;
		};
		if renderer.drag_start(&id) {
			*gesture_md.borrow_mut() = Some(Gesture {
				id,
				dx: x - nx,
				dy: y - ny,
			});
		}
	};

	let (renderer_mm, gesture_mm) = (renderer.clone(), gesture.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let held = gesture_mm.borrow();
		let Some(held) = held.as_ref() else {
			return;
		};
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		renderer_mm
			.borrow_mut()
			.drag_move(&held.id, x - held.dx, y - held.dy);
	};

	let release = {
		let (renderer, gesture, service) = (renderer.clone(), gesture.clone(), service.clone());
		Rc::new(move || {
			let Some(held) = gesture.borrow_mut().take() else {
				return;
			};
			let position = {
				let mut renderer = renderer.borrow_mut();
				let position = renderer.node_position(&held.id);
				renderer.drag_end(&held.id);
				position
			};
			if sync_positions {
				if let Some((x, y)) = position {
					let _ = service.update_node_position(&held.id, x, y);
				}
			}
		})
	};
	let release_up = release.clone();
	let on_mouseup = move |_: MouseEvent| release_up();
	let on_mouseleave = move |_: MouseEvent| release();

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			style="display: block; cursor: grab;"
		/>
	}
}
