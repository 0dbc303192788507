use web_sys::CanvasRenderingContext2d;

use syncboard_shared::codec;
use syncboard_shared::{CapturedPath, CompositeMode, Point, Stroke};

use crate::reconciler::Renderer;

const CURSOR_RADIUS: f64 = 4.0;
const CURSOR_COLOR: &str = "rgba(228, 107, 73, 0.95)";

pub fn draw_dot(ctx: &CanvasRenderingContext2d, point: Point, color: &str, size: f32) {
    ctx.set_fill_style_str(color);
    ctx.begin_path();
    let _ = ctx.arc(
        f64::from(point.x),
        f64::from(point.y),
        f64::from(size) / 2.0,
        0.0,
        std::f64::consts::PI * 2.0,
    );
    ctx.fill();
}

pub fn draw_segment(
    ctx: &CanvasRenderingContext2d,
    from: Point,
    to: Point,
    color: &str,
    size: f32,
) {
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(f64::from(size));
    ctx.begin_path();
    ctx.move_to(f64::from(from.x), f64::from(from.y));
    ctx.line_to(f64::from(to.x), f64::from(to.y));
    ctx.stroke();
}

fn draw_points(ctx: &CanvasRenderingContext2d, points: &[Point], color: &str, size: f32) {
    match points {
        [] => {}
        [only] => draw_dot(ctx, *only, color, size),
        _ => {
            for pair in points.windows(2) {
                draw_segment(ctx, pair[0], pair[1], color, size);
            }
        }
    }
}

fn with_mode(ctx: &CanvasRenderingContext2d, mode: CompositeMode, draw: impl FnOnce()) {
    if mode == CompositeMode::Erase {
        ctx.save();
        let _ = ctx.set_global_composite_operation("destination-out");
        draw();
        ctx.restore();
    } else {
        draw();
    }
}

pub struct CanvasRenderer {
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl CanvasRenderer {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        ctx.set_line_cap("round");
        ctx.set_line_join("round");
        Self {
            ctx,
            width: 0.0,
            height: 0.0,
        }
    }

    /// Canvas size in CSS pixels. Board coordinates are CSS pixels too.
    pub fn resize(&mut self, width: f64, height: f64, dpr: f64) {
        self.width = width;
        self.height = height;
        let _ = self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
    }

    /// Paints the newest piece of a stroke that is still being captured.
    pub fn draw_preview(&self, from: Option<Point>, to: Point, color: &str, size: f32) {
        match from {
            Some(from) => draw_segment(&self.ctx, from, to, color, size),
            None => draw_dot(&self.ctx, to, color, size),
        }
    }
}

impl Renderer for CanvasRenderer {
    fn clear(&mut self) {
        self.ctx.clear_rect(0.0, 0.0, self.width, self.height);
    }

    fn draw_stroke(&mut self, stroke: &Stroke) {
        let ctx = &self.ctx;
        let CapturedPath { points, brush } = codec::decode(stroke);
        with_mode(ctx, brush.mode, || {
            draw_points(ctx, &points, &brush.color, brush.width)
        });
    }

    fn draw_cursor(&mut self, label: &str, point: Point) {
        let ctx = &self.ctx;
        let x = f64::from(point.x);
        let y = f64::from(point.y);
        ctx.save();
        ctx.set_fill_style_str(CURSOR_COLOR);
        ctx.begin_path();
        let _ = ctx.arc(x, y, CURSOR_RADIUS, 0.0, std::f64::consts::PI * 2.0);
        ctx.fill();
        ctx.set_font("12px sans-serif");
        let _ = ctx.fill_text(label, x + CURSOR_RADIUS + 4.0, y - CURSOR_RADIUS);
        ctx.restore();
    }
}
