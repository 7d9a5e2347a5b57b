use pdg_structures::{Color, Offset, Point, Quad, Rect, RotatedRect};

#[test]
fn test_default_color_is_opaque_black() {
    let color = Color::default();
    assert_eq!(color, Color::new(0.0, 0.0, 0.0, 1.0));
    assert!(color.is_opaque());
}

#[test]
fn test_translucent_color_is_not_opaque() {
    assert!(!Color::new(1.0, 0.0, 0.0, 0.5).is_opaque());
    // 0.999 * 255 truncates to 254
    assert!(!Color::new(1.0, 1.0, 1.0, 0.999).is_opaque());
}

#[test]
fn test_rect_accessors() {
    let rect = Rect::new(10.0, 20.0, 110.0, 70.0);
    assert_eq!(rect.width(), 100.0);
    assert_eq!(rect.height(), 50.0);
    assert_eq!(rect.center(), Point::new(60.0, 45.0));
    assert!(rect.contains(Point::new(10.0, 20.0)));
    assert!(!rect.contains(Point::new(110.0, 20.0)));
}

#[test]
fn test_rotated_rect_half_turn_swaps_corners() {
    let rect = Rect::new(0.0, 0.0, 2.0, 2.0);
    let corners = RotatedRect::new(rect, std::f32::consts::PI, Offset::ZERO).corners();
    let expected = Point::new(2.0, 2.0);
    assert!((corners.points[0] - expected).length() < 1e-5);
}

#[test]
fn test_value_types_serde_json() {
    let quad = Quad::from(Rect::new(0.0, 0.0, 1.0, 1.0));
    let json = serde_json::to_string(&quad).unwrap();
    let back: Quad = serde_json::from_str(&json).unwrap();
    assert_eq!(back, quad);

    let color: Color = serde_json::from_str(r#"{"red":1.0,"green":0.5,"blue":0.0,"alpha":1.0}"#).unwrap();
    assert_eq!(color, Color::rgb(1.0, 0.5, 0.0));
}
