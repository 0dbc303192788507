use syncboard_shared::{Point, Stroke, StrokeId};

pub const MIN_HIT_RADIUS: f64 = 6.0;

pub fn normalize_point(point: Point) -> Option<Point> {
    if !point.is_finite() {
        return None;
    }
    Some(point)
}

pub fn distance_to_segment(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
        return ((px - x1).powi(2) + (py - y1).powi(2)).sqrt();
    }
    let t = ((px - x1) * dx + (py - y1) * dy) / (dx * dx + dy * dy);
    let t = t.clamp(0.0, 1.0);
    let proj_x = x1 + t * dx;
    let proj_y = y1 + t * dy;
    ((px - proj_x).powi(2) + (py - proj_y).powi(2)).sqrt()
}

pub fn stroke_hit(stroke: &Stroke, point: Point) -> bool {
    if stroke.points.is_empty() {
        return false;
    }
    let px = f64::from(point.x);
    let py = f64::from(point.y);
    let threshold = (f64::from(stroke.width) / 2.0).max(MIN_HIT_RADIUS);
    if stroke.points.len() == 1 {
        let only = stroke.points[0];
        let dx = f64::from(only.x) - px;
        let dy = f64::from(only.y) - py;
        return dx * dx + dy * dy <= threshold * threshold;
    }
    stroke.points.windows(2).any(|window| {
        let start = window[0];
        let end = window[1];
        distance_to_segment(
            px,
            py,
            f64::from(start.x),
            f64::from(start.y),
            f64::from(end.x),
            f64::from(end.y),
        ) <= threshold
    })
}

/// Identity of the topmost stroke under the point. Later strokes paint
/// over earlier ones, so the search runs back to front.
pub fn topmost_hit(strokes: &[Stroke], point: Point) -> Option<StrokeId> {
    strokes
        .iter()
        .rev()
        .find(|stroke| stroke_hit(stroke, point))
        .map(|stroke| stroke.id)
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod tests;
