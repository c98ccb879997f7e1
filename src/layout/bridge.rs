//! Bridge map: analogy pairs along a horizontal line, separated by
//! triangles carrying the relating label. The first pair is drawn as filled
//! rectangles (the template pair); the rest are text-only above and below
//! the line. Drag is horizontal with section reordering on commit.

use crate::config::LayoutConfig;
use crate::session::{DragDomain, SessionHandle, SessionNode};
use crate::sim::Particle;
use crate::spec::{self, Family, NodeKind, Point, Spec, SpecBody};
use crate::theme::Theme;

use super::types::{Bounds, Layout, PositionedNode, Primitive, Shape, TextAnchor};
use super::{resolve_family_positions, text, LayoutError};

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let cfg = config.bridge.clone();
    let font_item = theme.size("fontItem");
    let stroke_width = theme.size("strokeWidth");

    let (analogies, dimension) = match &spec.body {
        SpecBody::BridgeMap {
            analogies,
            dimension,
        } => (analogies.clone(), dimension.clone()),
        _ => unreachable!("dispatched on body"),
    };
    let n = analogies.len();

    // Section width fits the widest label of any pair.
    let mut section_w = cfg.min_section_width;
    let mut wrapped: Vec<(Vec<String>, Vec<String>)> = Vec::with_capacity(n);
    for pair in &analogies {
        let upper = text::wrap_label(
            &pair.left.text,
            font_item,
            cfg.min_section_width,
            &theme.font_family,
            config.fast_text_metrics,
        );
        let lower = text::wrap_label(
            &pair.right.text,
            font_item,
            cfg.min_section_width,
            &theme.font_family,
            config.fast_text_metrics,
        );
        for lines in [&upper, &lower] {
            let w = text::max_line_width(
                lines,
                font_item,
                &theme.font_family,
                config.fast_text_metrics,
            ) + 2.0 * cfg.text_padding;
            section_w = section_w.max(w);
        }
        wrapped.push((upper, lower));
    }

    let line_y = 0.0;
    let positions = resolve_family_positions(spec, Family::BridgePairs, |id| {
        let i = Family::BridgePairs.index_of(id).unwrap_or(0);
        let x = (i as f32 + 0.5) * section_w;
        let y = if id.starts_with("bridge-left-") {
            line_y - cfg.pair_gap
        } else {
            line_y + cfg.pair_gap
        };
        Point { x, y }
    });

    let mut nodes = Vec::with_capacity(n * 2);
    let mut particles = Vec::with_capacity(n * 2);
    for (i, (upper_lines, lower_lines)) in wrapped.iter().enumerate() {
        // ids() yields left then right for each pair
        let upper_pos = positions[i * 2];
        let lower_pos = positions[i * 2 + 1];
        let template = i == 0;
        for (node_id, lines, pos, kind) in [
            (
                spec::bridge_left_id(i),
                upper_lines,
                upper_pos,
                NodeKind::BridgeLeft,
            ),
            (
                spec::bridge_right_id(i),
                lower_lines,
                lower_pos,
                NodeKind::BridgeRight,
            ),
        ] {
            let (w, h) = super::text_rect_size(
                lines,
                font_item,
                theme,
                config,
                cfg.text_padding,
                0.0,
                0.0,
            );
            nodes.push(PositionedNode {
                node_id: node_id.clone(),
                kind,
                shape: Shape::Rect {
                    x: pos.x - w / 2.0,
                    y: pos.y - h / 2.0,
                    w,
                    h,
                },
                lines: lines.clone(),
                font_size: font_item,
                fill: if template {
                    theme.color("pairFill").to_string()
                } else {
                    "none".to_string()
                },
                stroke: if template {
                    theme.color("pairStroke").to_string()
                } else {
                    "none".to_string()
                },
                stroke_width: if template { stroke_width } else { 0.0 },
                text_color: if template {
                    theme.color("pairText").to_string()
                } else {
                    theme.color("lineColor").to_string()
                },
                corner_radius: 4.0,
                array_index: Some(i),
            });
            let mut particle = Particle::new(node_id, kind, pos.x, pos.y, w.max(h) / 2.0);
            particle.target = Some(pos);
            particle.row_y = Some(pos.y);
            particles.push(particle);
        }
    }

    let mut decorations = vec![Primitive::Line {
        x1: 0.0,
        y1: line_y,
        x2: n as f32 * section_w,
        y2: line_y,
        stroke: theme.color("lineColor").to_string(),
        stroke_width: cfg.line_stroke_width,
    }];
    for i in 0..n.saturating_sub(1) {
        let x = (i as f32 + 1.0) * section_w;
        let s = cfg.triangle_size;
        decorations.push(Primitive::Polygon {
            points: vec![
                Point { x, y: line_y - s },
                Point {
                    x: x - s,
                    y: line_y,
                },
                Point {
                    x: x + s,
                    y: line_y,
                },
            ],
            fill: theme.color("lineColor").to_string(),
            stroke: theme.color("lineColor").to_string(),
            stroke_width: 1.0,
        });
        decorations.push(Primitive::Text {
            x,
            y: line_y - s - 6.0,
            text: cfg.separator_label.clone(),
            font_size: font_item * 0.85,
            color: theme.color("lineColor").to_string(),
            anchor: TextAnchor::Middle,
            bold: false,
        });
    }
    if let Some(dimension) = dimension {
        decorations.push(Primitive::Text {
            x: -cfg.text_padding,
            y: line_y - cfg.pair_gap,
            text: dimension.text,
            font_size: font_item,
            color: theme.color("lineColor").to_string(),
            anchor: TextAnchor::End,
            bold: true,
        });
    }

    let session_nodes = nodes
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
            center: Point {
                x: n as f32 * section_w / 2.0,
                y: line_y,
            },
            domain: DragDomain::Horizontal,
            particles,
            nodes: session_nodes,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> Spec {
        serde_json::from_value(serde_json::json!({
            "type": "bridge_map",
            "dimension": "part of",
            "analogies": [
                {"left": "wheel", "right": "car"},
                {"left": "wing", "right": "plane"},
                {"left": "sail", "right": "boat"},
            ],
        }))
        .unwrap()
    }

    fn theme() -> Theme {
        crate::theme::ThemeResolver::new()
            .resolve(
                crate::spec::DiagramType::BridgeMap,
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
    fn pairs_share_a_section_midpoint() {
        let mut spec = parts();
        let layout = layout(&mut spec, &theme(), &config()).unwrap();
        for i in 0..3 {
            let upper = layout.node(&spec::bridge_left_id(i)).unwrap().shape.center();
            let lower = layout.node(&spec::bridge_right_id(i)).unwrap().shape.center();
            assert!((upper.x - lower.x).abs() < 1e-3);
            assert!(upper.y < 0.0 && lower.y > 0.0);
        }
        // sections advance left to right
        let x0 = layout.node("bridge-left-0").unwrap().shape.center().x;
        let x1 = layout.node("bridge-left-1").unwrap().shape.center().x;
        let x2 = layout.node("bridge-left-2").unwrap().shape.center().x;
        assert!(x0 < x1 && x1 < x2);
        assert!((x1 - x0 - (x2 - x1)).abs() < 1e-3);
    }

    #[test]
    fn only_the_first_pair_is_filled() {
        let mut spec = parts();
        let layout = layout(&mut spec, &theme(), &config()).unwrap();
        assert_ne!(layout.node("bridge-left-0").unwrap().fill, "none");
        assert_eq!(layout.node("bridge-left-1").unwrap().fill, "none");
        assert_eq!(layout.node("bridge-right-2").unwrap().fill, "none");
    }

    #[test]
    fn separators_sit_between_sections() {
        let mut spec = parts();
        let layout = layout(&mut spec, &theme(), &config()).unwrap();
        let triangles: Vec<&Primitive> = layout
            .decorations
            .iter()
            .filter(|d| matches!(d, Primitive::Polygon { .. }))
            .collect();
        assert_eq!(triangles.len(), 2);
        let labels = layout
            .decorations
            .iter()
            .filter(|d| matches!(d, Primitive::Text { text, .. } if text == "as"))
            .count();
        assert_eq!(labels, 2);
    }

    #[test]
    fn particles_are_row_locked() {
        let mut spec = parts();
        let session = layout(&mut spec, &theme(), &config()).unwrap().session.unwrap();
        assert_eq!(session.domain, DragDomain::Horizontal);
        for p in &session.particles {
            assert!(p.row_y.is_some());
        }
    }
}
