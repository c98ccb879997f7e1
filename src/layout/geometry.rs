//! Edge-to-edge connection endpoints: a segment between two node centers is
//! clipped at each node's boundary so lines never cross shape interiors.

use crate::spec::Point;

use super::types::Shape;

/// Point where the segment from the shape's center toward `target` crosses
/// the shape boundary. Falls back to the center when the target coincides
/// with it.
pub fn edge_point(shape: &Shape, target: Point) -> Point {
    let center = shape.center();
    let dx = target.x - center.x;
    let dy = target.y - center.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < f32::EPSILON {
        return center;
    }
    match *shape {
        Shape::Circle { r, .. } => Point {
            x: center.x + dx / dist * r,
            y: center.y + dy / dist * r,
        },
        Shape::Ellipse { rx, ry, .. } => {
            // Scale the direction by the ellipse radius along it.
            let t = 1.0 / ((dx / rx).powi(2) + (dy / ry).powi(2)).sqrt();
            Point {
                x: center.x + dx * t,
                y: center.y + dy * t,
            }
        }
        Shape::Rect { w, h, .. } => rect_edge(center, w, h, dx, dy),
        Shape::Diamond { w, h, .. } => diamond_edge(center, w, h, dx, dy),
    }
}

/// Both endpoints of an edge-to-edge segment between two shapes.
pub fn connection_endpoints(from: &Shape, to: &Shape) -> (Point, Point) {
    let start = edge_point(from, to.center());
    let end = edge_point(to, from.center());
    (start, end)
}

fn rect_edge(center: Point, w: f32, h: f32, dx: f32, dy: f32) -> Point {
    let hw = w / 2.0;
    let hh = h / 2.0;
    if hw <= 0.0 || hh <= 0.0 {
        return center;
    }
    // The boundary is hit where max(|dx|/hw, |dy|/hh) scaled equals 1.
    let scale = (dx.abs() / hw).max(dy.abs() / hh);
    if scale < f32::EPSILON {
        return center;
    }
    Point {
        x: center.x + dx / scale,
        y: center.y + dy / scale,
    }
}

fn diamond_edge(center: Point, w: f32, h: f32, dx: f32, dy: f32) -> Point {
    let hw = w / 2.0;
    let hh = h / 2.0;
    if hw <= 0.0 || hh <= 0.0 {
        return center;
    }
    // Rhombus boundary: |x|/hw + |y|/hh = 1 along the ray direction.
    let scale = dx.abs() / hw + dy.abs() / hh;
    if scale < f32::EPSILON {
        return center;
    }
    Point {
        x: center.x + dx / scale,
        y: center.y + dy / scale,
    }
}

pub fn distance(a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Angle of `p` around `center` in radians, `-PI/2` pointing up.
pub fn angle_around(center: Point, p: Point) -> f32 {
    (p.y - center.y).atan2(p.x - center.x)
}
