//! Bubble map: a central topic circle with attribute circles packed on a
//! donut ring around it. The ring machinery is shared with the circle map
//! and the concept map.

use crate::config::{BubbleConfig, LayoutConfig};
use crate::session::{DragDomain, SessionHandle, SessionNode};
use crate::sim::{Particle, RingBounds};
use crate::spec::{self, Family, Point, Spec};
use crate::theme::Theme;

use super::types::{Bounds, Connection, Layout, PositionedNode, Shape};
use super::{donut_distance, preserved_radius, resolve_family_positions, ring_angle, text, LayoutError};

pub(super) struct RadialParams<'a> {
    pub bubble: &'a BubbleConfig,
    pub family: Family,
    pub fill_key: &'a str,
    pub stroke_key: &'a str,
    pub text_key: &'a str,
    /// Draw a spoke from the topic to every peripheral node.
    pub spokes: bool,
}

pub(super) struct RadialOutcome {
    pub layout: Layout,
    pub ring: RingBounds,
    /// Chosen center-to-peripheral distance.
    pub distance: f32,
}

/// Shared donut-ring layout: topic at the origin, the family's nodes on an
/// evenly spaced ring, reconciled against `_customPositions`.
pub(super) fn radial_layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
    params: RadialParams<'_>,
) -> RadialOutcome {
    let cfg = params.bubble;
    let font_topic = theme.size("fontTopic");
    let font_item = theme.size("fontItem");
    let stroke_width = theme.size("strokeWidth");

    let topic_text = topic_text(spec);
    let topic_lines = text::wrap_label(
        &topic_text,
        font_topic,
        cfg.max_text_width,
        &theme.font_family,
        config.fast_text_metrics,
    );
    let topic_r = preserved_radius(
        spec,
        &spec::topic_id(),
        &topic_text,
        super::text_circle_radius(
            &topic_lines,
            font_topic,
            theme,
            config,
            cfg.text_padding,
            cfg.min_topic_radius,
        ),
    );

    let items: Vec<String> = params
        .family
        .ids(spec)
        .iter()
        .enumerate()
        .map(|(i, _)| item_text(spec, params.family, i))
        .collect();
    let wrapped: Vec<Vec<String>> = items
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

    // Uniform ring radius keeps the layout visually even; individual nodes
    // may still grow to honor preserved dimensions.
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

    let n = items.len();
    let distance = donut_distance(n, uniform_r, topic_r, cfg.ring_margin, cfg.distance_floor);
    let family = params.family;
    let positions = resolve_family_positions(spec, family, |id| {
        let i = family.index_of(id).unwrap_or(0);
        let angle = ring_angle(i, n.max(1));
        Point {
            x: distance * angle.cos(),
            y: distance * angle.sin(),
        }
    });

    let ring = RingBounds {
        cx: 0.0,
        cy: 0.0,
        inner_r: topic_r + uniform_r + cfg.ring_gap,
        outer_r: distance + uniform_r + cfg.ring_margin,
    };

    let mut nodes = Vec::with_capacity(n + 1);
    nodes.push(PositionedNode {
        node_id: spec::topic_id(),
        kind: spec::NodeKind::Topic,
        shape: Shape::Circle {
            cx: 0.0,
            cy: 0.0,
            r: topic_r,
        },
        lines: topic_lines,
        font_size: font_topic,
        fill: theme.color("topicFill").to_string(),
        stroke: theme.color("topicStroke").to_string(),
        stroke_width,
        text_color: theme.color("topicText").to_string(),
        corner_radius: 0.0,
        array_index: None,
    });

    let mut connections = Vec::new();
    let mut particles = Vec::new();
    for (i, (lines, pos)) in wrapped.iter().zip(&positions).enumerate() {
        let node_id = family.id(i);
        let r = preserved_radius(spec, &node_id, &items[i], uniform_r);
        nodes.push(PositionedNode {
            node_id: node_id.clone(),
            kind: family.node_kind(),
            shape: Shape::Circle {
                cx: pos.x,
                cy: pos.y,
                r,
            },
            lines: lines.clone(),
            font_size: font_item,
            fill: theme.color(params.fill_key).to_string(),
            stroke: theme.color(params.stroke_key).to_string(),
            stroke_width,
            text_color: theme.color(params.text_key).to_string(),
            corner_radius: 0.0,
            array_index: Some(i),
        });
        if params.spokes {
            connections.push(Connection::line(
                spec::topic_id(),
                node_id.clone(),
                theme.color("lineColor"),
                stroke_width,
            ));
        }
        let mut particle = Particle::new(node_id, family.node_kind(), pos.x, pos.y, r);
        particle.target = Some(*pos);
        particles.push(particle);
    }

    let session_nodes = nodes
        .iter()
        .map(|node| SessionNode {
            node_id: node.node_id.clone(),
            kind: node.kind,
            shape: node.shape,
        })
        .collect();

    let layout = Layout {
        diagram_type: spec.diagram_type(),
        nodes,
        connections,
        decorations: Vec::new(),
        bounds: Bounds::empty(),
        session: Some(SessionHandle {
            diagram_type: spec.diagram_type(),
            center: Point { x: 0.0, y: 0.0 },
            domain: DragDomain::Ring(ring),
            particles,
            nodes: session_nodes,
        }),
    };
    RadialOutcome {
        layout,
        ring,
        distance,
    }
}

fn topic_text(spec: &Spec) -> String {
    use crate::spec::SpecBody;
    match &spec.body {
        SpecBody::BubbleMap { topic, .. }
        | SpecBody::CircleMap { topic, .. }
        | SpecBody::ConceptMap { topic, .. } => topic.text.clone(),
        _ => String::new(),
    }
}

fn item_text(spec: &Spec, family: Family, i: usize) -> String {
    use crate::spec::SpecBody;
    match (&spec.body, family) {
        (SpecBody::BubbleMap { attributes, .. }, Family::Attributes) => attributes[i].text.clone(),
        (SpecBody::CircleMap { context, .. }, Family::Context) => context[i].text.clone(),
        (SpecBody::ConceptMap { concepts, .. }, Family::Concepts) => concepts[i].text.clone(),
        _ => String::new(),
    }
}

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let bubble = config.bubble.clone();
    let outcome = radial_layout(
        spec,
        theme,
        config,
        RadialParams {
            bubble: &bubble,
            family: Family::Attributes,
            fill_key: "attributeFill",
            stroke_key: "attributeStroke",
            text_key: "attributeText",
            spokes: true,
        },
    );
    Ok(outcome.layout)
}
