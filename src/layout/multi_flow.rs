//! Multi-flow map: a central event rectangle with causes stacked on the
//! left and effects on the right. Arrow endpoints on the event are slotted
//! so multiple arrows never share an attachment point.

use crate::config::LayoutConfig;
use crate::session::{DragDomain, SessionHandle, SessionNode};
use crate::sim::Particle;
use crate::spec::{self, Family, NodeKind, Point, Spec, SpecBody};
use crate::theme::Theme;

use super::types::{Bounds, Connection, Layout, PositionedNode, Shape};
use super::{preserved_rect, resolve_family_positions, text, LayoutError};

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let cfg = config.multi_flow.clone();
    let font_topic = theme.size("fontTopic");
    let font_item = theme.size("fontItem");
    let stroke_width = theme.size("strokeWidth");

    let event_text = match &spec.body {
        SpecBody::MultiFlowMap { event, .. } => event.text.clone(),
        _ => unreachable!("dispatched on body"),
    };
    let event_lines = text::wrap_label(
        &event_text,
        font_topic,
        cfg.max_text_width,
        &theme.font_family,
        config.fast_text_metrics,
    );
    let (event_w, event_h) = preserved_rect(
        spec,
        &spec::event_id(),
        &event_text,
        super::text_rect_size(
            &event_lines,
            font_topic,
            theme,
            config,
            cfg.event_padding,
            cfg.min_node_width,
            cfg.min_node_height,
        ),
    );

    let mut nodes = vec![PositionedNode {
        node_id: spec::event_id(),
        kind: NodeKind::Event,
        shape: Shape::Rect {
            x: -event_w / 2.0,
            y: -event_h / 2.0,
            w: event_w,
            h: event_h,
        },
        lines: event_lines,
        font_size: font_topic,
        fill: theme.color("eventFill").to_string(),
        stroke: theme.color("eventStroke").to_string(),
        stroke_width,
        text_color: theme.color("eventText").to_string(),
        corner_radius: 4.0,
        array_index: None,
    }];

    let mut connections = Vec::new();
    let mut particles = Vec::new();
    for (family, col_x, fill_key, stroke_key, text_key, kind) in [
        (
            Family::Causes,
            -cfg.column_offset,
            "causeFill",
            "causeStroke",
            "causeText",
            NodeKind::Cause,
        ),
        (
            Family::Effects,
            cfg.column_offset,
            "effectFill",
            "effectStroke",
            "effectText",
            NodeKind::Effect,
        ),
    ] {
        let texts = column_texts(spec, family);
        let wrapped: Vec<Vec<String>> = texts
            .iter()
            .map(|t| {
                text::wrap_label(
                    t,
                    font_item,
                    cfg.max_text_width,
                    &theme.font_family,
                    config.fast_text_metrics,
                )
            })
            .collect();
        let sizes: Vec<(f32, f32)> = wrapped
            .iter()
            .zip(&texts)
            .enumerate()
            .map(|(i, (lines, t))| {
                preserved_rect(
                    spec,
                    &family.id(i),
                    t,
                    super::text_rect_size(
                        lines,
                        font_item,
                        theme,
                        config,
                        cfg.node_padding,
                        cfg.min_node_width,
                        cfg.min_node_height,
                    ),
                )
            })
            .collect();
        // Uniform column width keeps the stack aligned.
        let uniform_w = sizes.iter().map(|s| s.0).fold(cfg.min_node_width, f32::max);

        let n = texts.len();
        let total_h: f32 =
            sizes.iter().map(|s| s.1).sum::<f32>() + cfg.stack_padding * (n.max(1) - 1) as f32;
        let mut default_ys = Vec::with_capacity(n);
        let mut cursor = -total_h / 2.0;
        for size in &sizes {
            default_ys.push(cursor + size.1 / 2.0);
            cursor += size.1 + cfg.stack_padding;
        }

        let positions = resolve_family_positions(spec, family, |id| {
            let i = family.index_of(id).unwrap_or(0);
            Point {
                x: col_x,
                y: default_ys.get(i).copied().unwrap_or(0.0),
            }
        });

        // Slots on the event edge: equally spaced inside the rect height
        // minus a margin so arrows never stack on one point.
        let usable = event_h - 2.0 * cfg.slot_margin;
        let slot_y = |i: usize| -> f32 {
            if n <= 1 {
                0.0
            } else {
                -usable / 2.0 + usable * i as f32 / (n - 1) as f32
            }
        };

        for (i, ((lines, pos), size)) in wrapped.iter().zip(&positions).zip(&sizes).enumerate() {
            let node_id = family.id(i);
            nodes.push(PositionedNode {
                node_id: node_id.clone(),
                kind,
                shape: Shape::Rect {
                    x: pos.x - uniform_w / 2.0,
                    y: pos.y - size.1 / 2.0,
                    w: uniform_w,
                    h: size.1,
                },
                lines: lines.clone(),
                font_size: font_item,
                fill: theme.color(fill_key).to_string(),
                stroke: theme.color(stroke_key).to_string(),
                stroke_width,
                text_color: theme.color(text_key).to_string(),
                corner_radius: 4.0,
                array_index: Some(i),
            });

            let slot = Point {
                x: if family == Family::Causes {
                    -event_w / 2.0
                } else {
                    event_w / 2.0
                },
                y: slot_y(i),
            };
            let mut conn = if family == Family::Causes {
                Connection::arrow(
                    node_id.clone(),
                    spec::event_id(),
                    theme.color("lineColor"),
                    stroke_width,
                )
            } else {
                Connection::arrow(
                    spec::event_id(),
                    node_id.clone(),
                    theme.color("lineColor"),
                    stroke_width,
                )
            };
            if family == Family::Causes {
                conn.to_anchor = Some(slot);
            } else {
                conn.from_anchor = Some(slot);
            }
            connections.push(conn);

            let mut particle = Particle::new(node_id, kind, pos.x, pos.y, size.1 / 2.0);
            particle.target = Some(*pos);
            particle.column_x = Some(col_x);
            particles.push(particle);
        }
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
        connections,
        decorations: Vec::new(),
        bounds: Bounds::empty(),
        session: Some(SessionHandle {
            diagram_type: spec.diagram_type(),
            center: Point { x: 0.0, y: 0.0 },
            domain: DragDomain::Columns(vec![-cfg.column_offset, cfg.column_offset]),
            particles,
            nodes: session_nodes,
        }),
    })
}

fn column_texts(spec: &Spec, family: Family) -> Vec<String> {
    match (&spec.body, family) {
        (SpecBody::MultiFlowMap { causes, .. }, Family::Causes) => {
            causes.iter().map(|i| i.text.clone()).collect()
        }
        (SpecBody::MultiFlowMap { effects, .. }, Family::Effects) => {
            effects.iter().map(|i| i.text.clone()).collect()
        }
        _ => Vec::new(),
    }
}
