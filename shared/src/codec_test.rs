use super::*;

fn path(points: Vec<Point>) -> CapturedPath {
    CapturedPath {
        points,
        brush: Brush {
            color: "#ff8800".to_string(),
            width: 4.5,
            mode: CompositeMode::Erase,
        },
    }
}

fn author() -> UserId {
    UserId::new("user-7")
}

#[test]
fn encode_keeps_geometry_and_brush_exactly() {
    let points = vec![Point { x: 1.25, y: -3.5 }, Point { x: 1e6, y: 0.0 }];
    let captured = path(points.clone());
    let stroke = encode(captured.clone(), StrokeId::new(9, 1), author()).unwrap();

    assert_eq!(stroke.points, points);
    assert_eq!(stroke.color, "#ff8800");
    assert!((stroke.width - 4.5).abs() < f32::EPSILON);
    assert_eq!(stroke.mode, CompositeMode::Erase);
    assert_eq!(stroke.author, author());
    assert_eq!(decode(&stroke), captured);
}

#[test]
fn single_point_is_a_valid_dot() {
    let stroke = encode(path(vec![Point { x: 0.0, y: 0.0 }]), StrokeId::new(1, 1), author());
    assert!(stroke.is_ok());
}

#[test]
fn empty_path_is_refused() {
    let err = encode(path(Vec::new()), StrokeId::new(1, 1), author()).unwrap_err();
    assert_eq!(err, EncodingError::EmptyPath);
}

#[test]
fn non_finite_point_reports_its_index() {
    let points = vec![Point { x: 0.0, y: 0.0 }, Point { x: f32::NAN, y: 1.0 }];
    let err = encode(path(points), StrokeId::new(1, 1), author()).unwrap_err();
    assert_eq!(err, EncodingError::NonFinitePoint { index: 1 });
}

#[test]
fn width_out_of_range_is_refused_not_clamped() {
    let mut captured = path(vec![Point { x: 0.0, y: 0.0 }]);
    captured.brush.width = 0.0;
    assert!(matches!(
        encode(captured.clone(), StrokeId::new(1, 1), author()),
        Err(EncodingError::InvalidWidth(_))
    ));

    captured.brush.width = MAX_STROKE_WIDTH + 1.0;
    assert!(matches!(
        encode(captured, StrokeId::new(1, 1), author()),
        Err(EncodingError::InvalidWidth(_))
    ));
}

#[test]
fn color_and_author_are_checked() {
    let mut captured = path(vec![Point { x: 0.0, y: 0.0 }]);
    captured.brush.color = String::new();
    assert_eq!(
        encode(captured.clone(), StrokeId::new(1, 1), author()).unwrap_err(),
        EncodingError::InvalidColor
    );

    captured.brush.color = "#000".to_string();
    assert_eq!(
        encode(captured, StrokeId::new(1, 1), UserId::new("")).unwrap_err(),
        EncodingError::InvalidAuthor
    );
}

#[test]
fn point_limit_is_enforced() {
    let points = vec![Point { x: 0.0, y: 0.0 }; MAX_POINTS_PER_STROKE + 1];
    let err = encode(path(points), StrokeId::new(1, 1), author()).unwrap_err();
    assert_eq!(
        err,
        EncodingError::TooManyPoints {
            len: MAX_POINTS_PER_STROKE + 1
        }
    );
}
