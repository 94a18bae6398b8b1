//! Joint-geometry primitives shared by the per-exercise rule sets.
//!
//! Coordinates are image-space pixels, y growing downward. Horizontal
//! displacements are normalized by a body-width reference (hip or shoulder
//! width) so thresholds hold at any delivered frame resolution; angles are
//! resolution-independent by construction.

use crate::pose::JointPoint;

/// Angle in degrees at vertex `b` formed by segments b->a and b->c.
///
/// Returns `None` when either segment is degenerate (coincident points).
pub fn angle_deg(a: JointPoint, b: JointPoint, c: JointPoint) -> Option<f32> {
    let (v1x, v1y) = (a.x - b.x, a.y - b.y);
    let (v2x, v2y) = (c.x - b.x, c.y - b.y);
    let n1 = (v1x * v1x + v1y * v1y).sqrt();
    let n2 = (v2x * v2x + v2y * v2y).sqrt();
    if n1 == 0.0 || n2 == 0.0 {
        return None;
    }
    let cos = ((v1x * v2x + v1y * v2y) / (n1 * n2)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Signed horizontal distance from `p` to the line through `a` and `b`,
/// measured at the height of `p`. Positive means `p` lies at larger x than
/// the line. For a vertical reference line this is simply `p.x - a.x`.
pub fn horizontal_offset_from_line(p: JointPoint, a: JointPoint, b: JointPoint) -> f32 {
    let dy = b.y - a.y;
    if dy.abs() < f32::EPSILON {
        return p.x - a.x;
    }
    let t = (p.y - a.y) / dy;
    let line_x = a.x + (b.x - a.x) * t;
    p.x - line_x
}

/// Signed vertical distance from `p` to the line through `a` and `b`,
/// measured at the x of `p`. Positive means `p` lies below the line
/// (larger y, i.e. sagging in image space).
pub fn vertical_offset_from_line(p: JointPoint, a: JointPoint, b: JointPoint) -> f32 {
    let dx = b.x - a.x;
    if dx.abs() < f32::EPSILON {
        return p.y - a.y;
    }
    let t = (p.x - a.x) / dx;
    let line_y = a.y + (b.y - a.y) * t;
    p.y - line_y
}

/// Horizontal span between two joints (body-width reference for
/// normalizing displacements). Falls back to 1.0 for degenerate poses so
/// ratios stay finite.
pub fn span_x(a: JointPoint, b: JointPoint) -> f32 {
    let w = (a.x - b.x).abs();
    if w < 1.0 {
        1.0
    } else {
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> JointPoint {
        JointPoint::new(x, y, 1.0)
    }

    #[test]
    fn test_angle_straight_and_right() {
        // Collinear points: straight 180 degrees
        let straight = angle_deg(p(0.0, 0.0), p(0.0, 10.0), p(0.0, 20.0)).unwrap();
        assert!((straight - 180.0).abs() < 0.01);

        let right = angle_deg(p(10.0, 0.0), p(0.0, 0.0), p(0.0, 10.0)).unwrap();
        assert!((right - 90.0).abs() < 0.01);

        assert!(angle_deg(p(1.0, 1.0), p(1.0, 1.0), p(2.0, 2.0)).is_none());
    }

    #[test]
    fn test_horizontal_offset() {
        // Vertical line x=100 from (100,0) to (100,200); point at (110,50)
        let off = horizontal_offset_from_line(p(110.0, 50.0), p(100.0, 0.0), p(100.0, 200.0));
        assert!((off - 10.0).abs() < 0.01);

        // Slanted line from (100,0) to (120,200): at y=100 line_x=110
        let off = horizontal_offset_from_line(p(105.0, 100.0), p(100.0, 0.0), p(120.0, 200.0));
        assert!((off + 5.0).abs() < 0.01);
    }

    #[test]
    fn test_vertical_offset() {
        // Horizontal line y=100; point below at y=130 -> +30
        let off = vertical_offset_from_line(p(50.0, 130.0), p(0.0, 100.0), p(100.0, 100.0));
        assert!((off - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_span_x_floor() {
        assert_eq!(span_x(p(100.0, 0.0), p(100.2, 0.0)), 1.0);
        assert_eq!(span_x(p(100.0, 0.0), p(180.0, 0.0)), 80.0);
    }
}
