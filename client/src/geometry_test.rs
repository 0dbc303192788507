use super::*;
use syncboard_shared::{CompositeMode, UserId};

fn stroke(seq: u64, points: &[(f32, f32)], width: f32) -> Stroke {
    Stroke {
        id: StrokeId::new(1, seq),
        author: UserId::new("alice"),
        color: "#000000".to_string(),
        width,
        mode: CompositeMode::Normal,
        points: points.iter().map(|&(x, y)| Point { x, y }).collect(),
    }
}

#[test]
fn distance_projects_onto_segment() {
    assert_eq!(distance_to_segment(5.0, 3.0, 0.0, 0.0, 10.0, 0.0), 3.0);
    assert_eq!(distance_to_segment(-4.0, 3.0, 0.0, 0.0, 10.0, 0.0), 5.0);
    assert_eq!(distance_to_segment(3.0, 4.0, 0.0, 0.0, 0.0, 0.0), 5.0);
}

#[test]
fn hit_radius_has_a_floor_for_thin_strokes() {
    let thin = stroke(1, &[(0.0, 0.0), (100.0, 0.0)], 1.0);
    assert!(stroke_hit(&thin, Point { x: 50.0, y: 5.0 }));
    assert!(!stroke_hit(&thin, Point { x: 50.0, y: 7.0 }));

    let thick = stroke(2, &[(0.0, 0.0), (100.0, 0.0)], 40.0);
    assert!(stroke_hit(&thick, Point { x: 50.0, y: 19.0 }));
}

#[test]
fn single_point_stroke_is_a_dot() {
    let dot = stroke(1, &[(10.0, 10.0)], 3.0);
    assert!(stroke_hit(&dot, Point { x: 13.0, y: 14.0 }));
    assert!(!stroke_hit(&dot, Point { x: 20.0, y: 20.0 }));
}

#[test]
fn topmost_prefers_later_strokes() {
    let strokes = vec![
        stroke(1, &[(0.0, 0.0), (100.0, 0.0)], 3.0),
        stroke(2, &[(50.0, -50.0), (50.0, 50.0)], 3.0),
    ];
    assert_eq!(
        topmost_hit(&strokes, Point { x: 50.0, y: 0.0 }),
        Some(StrokeId::new(1, 2))
    );
    assert_eq!(
        topmost_hit(&strokes, Point { x: 10.0, y: 1.0 }),
        Some(StrokeId::new(1, 1))
    );
    assert_eq!(topmost_hit(&strokes, Point { x: 90.0, y: 90.0 }), None);
}

#[test]
fn non_finite_points_are_dropped() {
    assert!(normalize_point(Point { x: f32::NAN, y: 0.0 }).is_none());
    assert_eq!(
        normalize_point(Point { x: 1.0, y: 2.0 }),
        Some(Point { x: 1.0, y: 2.0 })
    );
}
