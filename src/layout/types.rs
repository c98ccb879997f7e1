use crate::spec::{DiagramType, NodeKind, Point};

/// Node geometry. Centers are in diagram coordinates with the layout
/// anchored at the origin; the viewport maps them to the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { cx: f32, cy: f32, r: f32 },
    Rect { x: f32, y: f32, w: f32, h: f32 },
    Diamond { cx: f32, cy: f32, w: f32, h: f32 },
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32 },
}

impl Shape {
    pub fn center(&self) -> Point {
        match *self {
            Shape::Circle { cx, cy, .. } => Point { x: cx, y: cy },
            Shape::Rect { x, y, w, h } => Point {
                x: x + w / 2.0,
                y: y + h / 2.0,
            },
            Shape::Diamond { cx, cy, .. } => Point { x: cx, y: cy },
            Shape::Ellipse { cx, cy, .. } => Point { x: cx, y: cy },
        }
    }

    /// Same shape re-centered at `(cx, cy)`.
    pub fn at_center(&self, cx: f32, cy: f32) -> Shape {
        match *self {
            Shape::Circle { r, .. } => Shape::Circle { cx, cy, r },
            Shape::Rect { w, h, .. } => Shape::Rect {
                x: cx - w / 2.0,
                y: cy - h / 2.0,
                w,
                h,
            },
            Shape::Diamond { w, h, .. } => Shape::Diamond { cx, cy, w, h },
            Shape::Ellipse { rx, ry, .. } => Shape::Ellipse { cx, cy, rx, ry },
        }
    }

    pub fn bounds(&self) -> Bounds {
        match *self {
            Shape::Circle { cx, cy, r } => Bounds::new(cx - r, cy - r, cx + r, cy + r),
            Shape::Rect { x, y, w, h } => Bounds::new(x, y, x + w, y + h),
            Shape::Diamond { cx, cy, w, h } => {
                Bounds::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
            }
            Shape::Ellipse { cx, cy, rx, ry } => Bounds::new(cx - rx, cy - ry, cx + rx, cy + ry),
        }
    }

    /// Effective radius for collision and ring purposes: the circumscribed
    /// circle for non-circular shapes.
    pub fn collision_radius(&self) -> f32 {
        match *self {
            Shape::Circle { r, .. } => r,
            Shape::Rect { w, h, .. } | Shape::Diamond { w, h, .. } => (w * w + h * h).sqrt() / 2.0,
            Shape::Ellipse { rx, ry, .. } => rx.max(ry),
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        match *self {
            Shape::Circle { cx, cy, r } => {
                let (dx, dy) = (px - cx, py - cy);
                dx * dx + dy * dy <= r * r
            }
            Shape::Rect { x, y, w, h } => px >= x && px <= x + w && py >= y && py <= y + h,
            Shape::Diamond { cx, cy, w, h } => {
                if w <= 0.0 || h <= 0.0 {
                    return false;
                }
                ((px - cx) / (w / 2.0)).abs() + ((py - cy) / (h / 2.0)).abs() <= 1.0
            }
            Shape::Ellipse { cx, cy, rx, ry } => {
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let (nx, ny) = ((px - cx) / rx, (py - cy) / ry);
                nx * nx + ny * ny <= 1.0
            }
        }
    }
}

/// One laid-out node, ready to draw.
#[derive(Debug, Clone)]
pub struct PositionedNode {
    pub node_id: String,
    pub kind: NodeKind,
    pub shape: Shape,
    /// Wrapped text, one entry per rendered line.
    pub lines: Vec<String>,
    pub font_size: f32,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f32,
    pub text_color: String,
    /// Corner radius for rect shapes; 0 draws sharp corners.
    pub corner_radius: f32,
    /// Index into the backing spec array, when the node belongs to one.
    pub array_index: Option<usize>,
}

/// A connection between two nodes, referenced by id. Endpoints are resolved
/// edge-to-edge at render time unless an explicit anchor overrides one side
/// (multi-flow slotting, agent-provided mind-map segments).
#[derive(Debug, Clone)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub from_anchor: Option<Point>,
    pub to_anchor: Option<Point>,
    pub arrow: bool,
    pub label: Option<String>,
    pub stroke: String,
    pub stroke_width: f32,
}

impl Connection {
    pub fn line(from: impl Into<String>, to: impl Into<String>, stroke: &str, width: f32) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_anchor: None,
            to_anchor: None,
            arrow: false,
            label: None,
            stroke: stroke.to_string(),
            stroke_width: width,
        }
    }

    pub fn arrow(from: impl Into<String>, to: impl Into<String>, stroke: &str, width: f32) -> Self {
        Self {
            arrow: true,
            ..Self::line(from, to, stroke, width)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// Non-node decoration: boundary rings, the bridge main line and separator
/// triangles, brace paths, L-connectors, free-standing labels.
#[derive(Debug, Clone)]
pub enum Primitive {
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        fill: Option<String>,
        stroke: String,
        stroke_width: f32,
        dashed: bool,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke: String,
        stroke_width: f32,
    },
    Polygon {
        points: Vec<Point>,
        fill: String,
        stroke: String,
        stroke_width: f32,
    },
    Path {
        d: String,
        stroke: String,
        stroke_width: f32,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        font_size: f32,
        color: String,
        anchor: TextAnchor,
        bold: bool,
    },
}

impl Primitive {
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Primitive::Circle {
                cx,
                cy,
                r,
                stroke_width,
                ..
            } => {
                let extent = r + stroke_width / 2.0;
                Some(Bounds::new(cx - extent, cy - extent, cx + extent, cy + extent))
            }
            Primitive::Line {
                x1,
                y1,
                x2,
                y2,
                stroke_width,
                ..
            } => Some(
                Bounds::new(x1.min(*x2), y1.min(*y2), x1.max(*x2), y1.max(*y2))
                    .expanded(stroke_width / 2.0),
            ),
            Primitive::Polygon { points, .. } => {
                let mut bounds = Bounds::empty();
                for p in points {
                    bounds.include_point(p.x, p.y);
                }
                (!bounds.is_empty()).then_some(bounds)
            }
            // Path data is opaque; callers account for it when it matters.
            Primitive::Path { .. } => None,
            Primitive::Text {
                x,
                y,
                text,
                font_size,
                anchor,
                ..
            } => {
                let approx = text.chars().count() as f32 * font_size * 0.56;
                let (min_x, max_x) = match anchor {
                    TextAnchor::Start => (*x, x + approx),
                    TextAnchor::Middle => (x - approx / 2.0, x + approx / 2.0),
                    TextAnchor::End => (x - approx, *x),
                };
                Some(Bounds::new(min_x, y - font_size, max_x, y + font_size * 0.3))
            }
        }
    }
}

/// Axis-aligned bounding box. `empty()` is the identity for `include`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn empty() -> Self {
        Self {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn include(&mut self, other: Bounds) {
        if other.is_empty() {
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn include_point(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn expanded(&self, pad: f32) -> Bounds {
        Bounds::new(
            self.min_x - pad,
            self.min_y - pad,
            self.max_x + pad,
            self.max_y + pad,
        )
    }

    pub fn width(&self) -> f32 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }
}

/// Output of the layout kernel for one render.
#[derive(Debug, Clone)]
pub struct Layout {
    pub diagram_type: DiagramType,
    pub nodes: Vec<PositionedNode>,
    pub connections: Vec<Connection>,
    pub decorations: Vec<Primitive>,
    /// Tight content bounds including stroke insets.
    pub bounds: Bounds,
    /// Drag session for interactive diagrams; `None` when nothing is
    /// draggable (e.g. flowchart).
    pub session: Option<crate::session::SessionHandle>,
}

impl Layout {
    pub fn node(&self, node_id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut PositionedNode> {
        self.nodes.iter_mut().find(|n| n.node_id == node_id)
    }

    /// Recompute `bounds` from nodes and decorations. Layouts call this
    /// after all geometry is final so text measured late is still covered.
    pub fn recompute_bounds(&mut self) {
        let mut bounds = Bounds::empty();
        for node in &self.nodes {
            bounds.include(node.shape.bounds().expanded(node.stroke_width / 2.0));
        }
        for decoration in &self.decorations {
            if let Some(b) = decoration.bounds() {
                bounds.include(b);
            }
        }
        if bounds.is_empty() {
            bounds = Bounds::new(0.0, 0.0, 0.0, 0.0);
        }
        self.bounds = bounds;
    }
}
