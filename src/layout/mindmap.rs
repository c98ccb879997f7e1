//! Mind map rendered from agent-provided positions. The spec's `_layout`
//! carries absolute node positions and pre-resolved connection segments;
//! this kernel sizes nodes, skips the reserved agent branch, and clips each
//! segment at the node boundaries it connects.

use std::collections::HashSet;

use crate::config::LayoutConfig;
use crate::session::{DragDomain, SessionHandle, SessionNode};
use crate::spec::{MindNode, NodeKind, Point, Spec, SpecBody};
use crate::theme::Theme;

use super::types::{Bounds, Layout, PositionedNode, Primitive, Shape};
use super::{preserved_radius, preserved_rect, text, LayoutError};

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let cfg = config.mindmap.clone();
    let font_topic = theme.size("fontTopic");
    let font_item = theme.size("fontItem");
    let stroke_width = theme.size("strokeWidth");

    let (children, agent) = match &spec.body {
        SpecBody::Mindmap {
            children, layout, ..
        } => (children.clone(), layout.clone()),
        _ => unreachable!("dispatched on body"),
    };
    let agent = agent.ok_or(LayoutError::MissingPositions)?;
    if agent.positions.is_empty() {
        return Err(LayoutError::MissingPositions);
    }

    // Every text under a reserved-marker branch is hidden, the marker node
    // included.
    let mut hidden: HashSet<String> = HashSet::new();
    for child in &children {
        collect_hidden(child, &cfg.reserved_branch_marker, false, &mut hidden);
    }
    let is_hidden = |text: &str| -> bool {
        text.starts_with(&cfg.reserved_branch_marker) || hidden.contains(text)
    };

    let mut nodes = Vec::new();
    let mut hidden_points: Vec<Point> = Vec::new();
    for (key, agent_node) in &agent.positions {
        let label = agent_node.text.clone().unwrap_or_else(|| key.clone());
        if is_hidden(&label) {
            hidden_points.push(Point {
                x: agent_node.x,
                y: agent_node.y,
            });
            continue;
        }
        let is_topic = agent_node.node_type == "topic";
        let is_branch = agent_node.node_type == "branch";
        let font_size = if is_topic { font_topic } else { font_item };
        let lines = text::wrap_label(
            &label,
            font_size,
            cfg.max_text_width,
            &theme.font_family,
            config.fast_text_metrics,
        );
        let (kind, shape, fill_key, stroke_key, text_key) = if is_topic {
            let r = preserved_radius(
                spec,
                key,
                &label,
                super::text_circle_radius(
                    &lines,
                    font_size,
                    theme,
                    config,
                    cfg.rect_padding,
                    cfg.min_topic_radius,
                ),
            );
            (
                NodeKind::Topic,
                Shape::Circle {
                    cx: agent_node.x,
                    cy: agent_node.y,
                    r,
                },
                "topicFill",
                "topicStroke",
                "topicText",
            )
        } else {
            let (w, h) = match (agent_node.width, agent_node.height) {
                (Some(w), Some(h)) => (w, h),
                _ => preserved_rect(
                    spec,
                    key,
                    &label,
                    super::text_rect_size(
                        &lines,
                        font_size,
                        theme,
                        config,
                        cfg.rect_padding,
                        cfg.min_node_width,
                        cfg.min_node_height,
                    ),
                ),
            };
            let (kind, fill_key, stroke_key, text_key) = if is_branch {
                (NodeKind::Branch, "branchFill", "branchStroke", "branchText")
            } else {
                (NodeKind::Child, "childFill", "childStroke", "childText")
            };
            (
                kind,
                Shape::Rect {
                    x: agent_node.x - w / 2.0,
                    y: agent_node.y - h / 2.0,
                    w,
                    h,
                },
                fill_key,
                stroke_key,
                text_key,
            )
        };
        nodes.push(PositionedNode {
            node_id: key.clone(),
            kind,
            shape,
            lines,
            font_size,
            fill: theme.color(fill_key).to_string(),
            stroke: theme.color(stroke_key).to_string(),
            stroke_width,
            text_color: theme.color(text_key).to_string(),
            corner_radius: if is_topic { 0.0 } else { 6.0 },
            array_index: None,
        });
    }

    // Agent segments come pre-resolved; drop any that touch a hidden node.
    let touches_hidden = |x: f32, y: f32| -> bool {
        hidden_points
            .iter()
            .any(|p| (p.x - x).abs() < 1.0 && (p.y - y).abs() < 1.0)
    };
    // Segment endpoints sit on node centers. Match each end to its node by
    // the same proximity rule and clip at the boundary so lines stay
    // edge-to-edge like every other diagram.
    let shape_at = |x: f32, y: f32| -> Option<Shape> {
        nodes.iter().map(|n| n.shape).find(|s| {
            let c = s.center();
            (c.x - x).abs() < 1.0 && (c.y - y).abs() < 1.0
        })
    };
    let mut decorations = Vec::new();
    for conn in &agent.connections {
        if touches_hidden(conn.from.x, conn.from.y) || touches_hidden(conn.to.x, conn.to.y) {
            continue;
        }
        let from = Point {
            x: conn.from.x,
            y: conn.from.y,
        };
        let to = Point {
            x: conn.to.x,
            y: conn.to.y,
        };
        let start = match shape_at(from.x, from.y) {
            Some(shape) => super::geometry::edge_point(&shape, to),
            None => from,
        };
        let end = match shape_at(to.x, to.y) {
            Some(shape) => super::geometry::edge_point(&shape, from),
            None => to,
        };
        decorations.push(Primitive::Line {
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
            stroke: conn
                .stroke_color
                .clone()
                .unwrap_or_else(|| theme.color("lineColor").to_string()),
            stroke_width: conn.stroke_width.unwrap_or(stroke_width),
        });
    }

    let session_nodes: Vec<SessionNode> = nodes
        .iter()
        .map(|node| SessionNode {
            node_id: node.node_id.clone(),
            kind: node.kind,
            shape: node.shape,
        })
        .collect();
    Ok(Layout {
        diagram_type: spec.diagram_type(),
        nodes,
        connections: Vec::new(),
        decorations,
        bounds: Bounds::empty(),
        session: Some(SessionHandle {
            diagram_type: spec.diagram_type(),
            center: Point { x: 0.0, y: 0.0 },
            domain: DragDomain::Free,
            particles: Vec::new(),
            nodes: session_nodes,
        }),
    })
}

fn collect_hidden(node: &MindNode, marker: &str, under_marker: bool, out: &mut HashSet<String>) {
    let hidden = under_marker || node.text.text.starts_with(marker);
    if hidden {
        out.insert(node.text.text.clone());
    }
    for child in &node.children {
        collect_hidden(child, marker, hidden, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school() -> Spec {
        serde_json::from_value(serde_json::json!({
            "type": "mindmap",
            "topic": "School",
            "children": [
                {"text": "Math", "children": [{"text": "Algebra"}, {"text": "Geometry"}]},
                {"text": "Science", "children": [{"text": "Physics"}, {"text": "Biology"}]},
                {"text": "Additional Aspect", "children": [{"text": "Hidden A"}, {"text": "Hidden B"}]},
            ],
            "_layout": {
                "positions": {
                    "topic": {"x": 0.0, "y": 0.0, "node_type": "topic", "text": "School"},
                    "b0": {"x": -200.0, "y": -80.0, "node_type": "branch", "text": "Math"},
                    "b1": {"x": 200.0, "y": -80.0, "node_type": "branch", "text": "Science"},
                    "b2": {"x": 0.0, "y": 200.0, "node_type": "branch", "text": "Additional Aspect"},
                    "c0": {"x": -320.0, "y": -140.0, "node_type": "child", "text": "Algebra"},
                    "c1": {"x": -320.0, "y": -20.0, "node_type": "child", "text": "Geometry"},
                    "c2": {"x": 320.0, "y": -140.0, "node_type": "child", "text": "Physics"},
                    "c3": {"x": 320.0, "y": -20.0, "node_type": "child", "text": "Biology"},
                    "c4": {"x": -80.0, "y": 300.0, "node_type": "child", "text": "Hidden A"},
                },
                "connections": [
                    {"from": {"x": 0.0, "y": 0.0}, "to": {"x": -200.0, "y": -80.0}},
                    {"from": {"x": 0.0, "y": 0.0}, "to": {"x": 200.0, "y": -80.0}},
                    {"from": {"x": 0.0, "y": 0.0}, "to": {"x": 0.0, "y": 200.0}},
                    {"from": {"x": 0.0, "y": 200.0}, "to": {"x": -80.0, "y": 300.0}},
                ],
            },
        }))
        .unwrap()
    }

    fn theme() -> Theme {
        crate::theme::ThemeResolver::new()
            .resolve(
                crate::spec::DiagramType::Mindmap,
                "sans-serif",
                &Default::default(),
                None,
            )
            .unwrap()
    }

    fn config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn reserved_branch_and_descendants_are_skipped() {
        let mut spec = school();
        let layout = layout(&mut spec, &theme(), &config()).unwrap();
        // topic + 2 branches + 4 children survive
        assert_eq!(layout.nodes.len(), 7);
        assert!(layout.node("b2").is_none());
        assert!(layout.node("c4").is_none());
        // segments touching the hidden branch are dropped too
        assert_eq!(layout.decorations.len(), 2);
    }

    #[test]
    fn missing_positions_is_an_error() {
        let mut spec: Spec = serde_json::from_value(serde_json::json!({
            "type": "mindmap",
            "topic": "School",
            "children": [],
        }))
        .unwrap();
        assert!(matches!(
            layout(&mut spec, &theme(), &config()),
            Err(LayoutError::MissingPositions)
        ));
    }

    #[test]
    fn segments_are_clipped_at_node_boundaries() {
        let mut spec = school();
        let layout = layout(&mut spec, &theme(), &config()).unwrap();
        let r = match layout.node("topic").unwrap().shape {
            Shape::Circle { r, .. } => r,
            _ => unreachable!(),
        };
        // first surviving segment runs topic -> Math branch
        let (x1, y1, x2, y2) = match &layout.decorations[0] {
            Primitive::Line { x1, y1, x2, y2, .. } => (*x1, *y1, *x2, *y2),
            _ => unreachable!(),
        };
        let start_dist = (x1 * x1 + y1 * y1).sqrt();
        assert!(
            (start_dist - r).abs() < 1e-3,
            "segment starts {start_dist:.1} from the topic center, boundary is at r={r:.1}"
        );
        // far end stops on the branch rect, not at its center
        let b = layout.node("b0").unwrap().shape.bounds();
        let on_edge = (x2 - b.min_x).abs() < 1e-3
            || (x2 - b.max_x).abs() < 1e-3
            || (y2 - b.min_y).abs() < 1e-3
            || (y2 - b.max_y).abs() < 1e-3;
        assert!(on_edge, "segment ends at ({x2:.1}, {y2:.1}) off the branch boundary");
    }

    #[test]
    fn agent_sizes_are_respected() {
        let mut spec: Spec = serde_json::from_value(serde_json::json!({
            "type": "mindmap",
            "topic": "T",
            "children": [],
            "_layout": {
                "positions": {
                    "b0": {"x": 10.0, "y": 20.0, "node_type": "branch", "text": "Wide",
                           "width": 300.0, "height": 50.0},
                },
                "connections": [],
            },
        }))
        .unwrap();
        let layout = layout(&mut spec, &theme(), &config()).unwrap();
        let b = layout.node("b0").unwrap().shape.bounds();
        assert_eq!(b.width(), 300.0);
        assert_eq!(b.height(), 50.0);
        assert_eq!(layout.node("b0").unwrap().shape.center(), Point { x: 10.0, y: 20.0 });
    }
}
