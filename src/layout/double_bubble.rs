//! Double-bubble map: two topic circles with a shared similarities column
//! between them and a differences column outside each topic. Peripheral
//! nodes drag within their column only.

use crate::config::LayoutConfig;
use crate::session::{DragDomain, SessionHandle, SessionNode};
use crate::sim::Particle;
use crate::spec::{self, Family, NodeKind, Point, Spec, SpecBody};
use crate::theme::Theme;

use super::types::{Bounds, Connection, Layout, PositionedNode, Shape};
use super::{preserved_radius, resolve_family_positions, text, LayoutError};

struct Column {
    family: Family,
    x: f32,
    kind: NodeKind,
    fill_key: &'static str,
    stroke_key: &'static str,
    text_key: &'static str,
    /// Topics this column's nodes connect to.
    link_to: &'static [&'static str],
}

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let cfg = config.double_bubble.clone();
    let font_topic = theme.size("fontTopic");
    let font_item = theme.size("fontItem");
    let stroke_width = theme.size("strokeWidth");

    let (left, right) = match &spec.body {
        SpecBody::DoubleBubbleMap { left, right, .. } => (left.text.clone(), right.text.clone()),
        _ => unreachable!("dispatched on body"),
    };

    let topic_x = cfg.topic_gap / 2.0;
    let diff_x = topic_x + cfg.column_offset;
    let left_topic_id = spec::topic_left_id();
    let right_topic_id = spec::topic_right_id();

    let mut nodes = Vec::new();
    for (id, text_value, x, kind) in [
        (&left_topic_id, &left, -topic_x, NodeKind::TopicLeft),
        (&right_topic_id, &right, topic_x, NodeKind::TopicRight),
    ] {
        let lines = text::wrap_label(
            text_value,
            font_topic,
            cfg.max_text_width,
            &theme.font_family,
            config.fast_text_metrics,
        );
        let r = preserved_radius(
            spec,
            id,
            text_value,
            super::text_circle_radius(
                &lines,
                font_topic,
                theme,
                config,
                cfg.text_padding,
                cfg.min_topic_radius,
            ),
        );
        nodes.push(PositionedNode {
            node_id: id.clone(),
            kind,
            shape: Shape::Circle { cx: x, cy: 0.0, r },
            lines,
            font_size: font_topic,
            fill: theme.color("topicFill").to_string(),
            stroke: theme.color("topicStroke").to_string(),
            stroke_width,
            text_color: theme.color("topicText").to_string(),
            corner_radius: 0.0,
            array_index: None,
        });
    }

    let columns = [
        Column {
            family: Family::Similarities,
            x: 0.0,
            kind: NodeKind::Similarity,
            fill_key: "similarityFill",
            stroke_key: "similarityStroke",
            text_key: "similarityText",
            link_to: &["topic_left", "topic_right"],
        },
        Column {
            family: Family::LeftDifferences,
            x: -diff_x,
            kind: NodeKind::LeftDiff,
            fill_key: "differenceFill",
            stroke_key: "differenceStroke",
            text_key: "differenceText",
            link_to: &["topic_left"],
        },
        Column {
            family: Family::RightDifferences,
            x: diff_x,
            kind: NodeKind::RightDiff,
            fill_key: "differenceFill",
            stroke_key: "differenceStroke",
            text_key: "differenceText",
            link_to: &["topic_right"],
        },
    ];

    let mut connections = Vec::new();
    let mut particles = Vec::new();
    for column in &columns {
        let texts: Vec<String> = column_texts(spec, column.family);
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
        let uniform_r = wrapped
            .iter()
            .map(|lines| {
                super::text_circle_radius(
                    lines,
                    font_item,
                    theme,
                    config,
                    cfg.text_padding,
                    cfg.min_node_radius,
                )
            })
            .fold(cfg.min_node_radius, f32::max);

        let n = texts.len();
        let pitch = 2.0 * uniform_r + cfg.stack_padding;
        let col_x = column.x;
        let positions = resolve_family_positions(spec, column.family, |id| {
            let i = column.family.index_of(id).unwrap_or(0) as f32;
            Point {
                x: col_x,
                y: (i - (n.max(1) as f32 - 1.0) / 2.0) * pitch,
            }
        });

        for (i, (lines, pos)) in wrapped.iter().zip(&positions).enumerate() {
            let node_id = column.family.id(i);
            let r = preserved_radius(spec, &node_id, &texts[i], uniform_r);
            nodes.push(PositionedNode {
                node_id: node_id.clone(),
                kind: column.kind,
                shape: Shape::Circle {
                    cx: pos.x,
                    cy: pos.y,
                    r,
                },
                lines: lines.clone(),
                font_size: font_item,
                fill: theme.color(column.fill_key).to_string(),
                stroke: theme.color(column.stroke_key).to_string(),
                stroke_width,
                text_color: theme.color(column.text_key).to_string(),
                corner_radius: 0.0,
                array_index: Some(i),
            });
            for topic in column.link_to {
                connections.push(Connection::line(
                    node_id.clone(),
                    *topic,
                    theme.color("lineColor"),
                    stroke_width,
                ));
            }
            let mut particle = Particle::new(node_id, column.kind, pos.x, pos.y, uniform_r);
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
            domain: DragDomain::Columns(vec![-diff_x, 0.0, diff_x]),
            particles,
            nodes: session_nodes,
        }),
    })
}

fn column_texts(spec: &Spec, family: Family) -> Vec<String> {
    match (&spec.body, family) {
        (SpecBody::DoubleBubbleMap { similarities, .. }, Family::Similarities) => {
            similarities.iter().map(|i| i.text.clone()).collect()
        }
        (
            SpecBody::DoubleBubbleMap {
                left_differences, ..
            },
            Family::LeftDifferences,
        ) => left_differences.iter().map(|i| i.text.clone()).collect(),
        (
            SpecBody::DoubleBubbleMap {
                right_differences, ..
            },
            Family::RightDifferences,
        ) => right_differences.iter().map(|i| i.text.clone()).collect(),
        _ => Vec::new(),
    }
}
