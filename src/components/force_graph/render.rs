use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::ForceLayoutRenderer;
use super::types::Scene;

pub fn render(renderer: &ForceLayoutRenderer, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, renderer.width(), renderer.height());
	draw_links(renderer.scene(), ctx);
	draw_nodes(renderer.scene(), ctx);
}

fn draw_links(scene: &Scene, ctx: &CanvasRenderingContext2d) {
	ctx.set_stroke_style_str("rgba(100, 180, 255, 0.6)");
	ctx.set_line_width(1.5);
	for link in scene.links.values() {
		ctx.begin_path();
		ctx.move_to(link.x1, link.y1);
		ctx.line_to(link.x2, link.y2);
		ctx.stroke();
	}
}

fn draw_nodes(scene: &Scene, ctx: &CanvasRenderingContext2d) {
	ctx.set_font("12px sans-serif");
	ctx.set_text_align("center");

	for node in scene.nodes.values() {
		ctx.begin_path();
		let _ = ctx.arc(node.x, node.y, node.radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node.color);
		ctx.fill();

		if node.pinned {
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.7)");
			ctx.set_line_width(2.0);
			ctx.stroke();
		}

		ctx.set_fill_style_str("white");
		// Baseline sits slightly below centre so the glyphs look centred.
		let _ = ctx.fill_text(&node.text, node.x, node.y + 4.0);
	}
}
