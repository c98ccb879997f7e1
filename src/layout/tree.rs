//! Tree map: topic on top, one column per branch, leaf children stacked
//! under each branch.

use crate::config::LayoutConfig;
use crate::session::{DragDomain, SessionHandle, SessionNode};
use crate::spec::{self, NodeKind, Point, Spec, SpecBody};
use crate::theme::Theme;

use super::types::{Bounds, Connection, Layout, PositionedNode, Shape};
use super::{preserved_rect, text, LayoutError};

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let cfg = config.tree.clone();
    let font_topic = theme.size("fontTopic");
    let font_item = theme.size("fontItem");
    let stroke_width = theme.size("strokeWidth");

    let (topic, branches) = match &spec.body {
        SpecBody::TreeMap { topic, children } => (topic.text.clone(), children.clone()),
        _ => unreachable!("dispatched on body"),
    };

    let size = |spec: &Spec, id: &str, value: &str, font_size: f32| -> (Vec<String>, f32, f32) {
        let lines = text::wrap_label(
            value,
            font_size,
            cfg.max_text_width,
            &theme.font_family,
            config.fast_text_metrics,
        );
        let (w, h) = preserved_rect(
            spec,
            id,
            value,
            super::text_rect_size(
                &lines,
                font_size,
                theme,
                config,
                cfg.node_padding,
                cfg.min_node_width,
                cfg.min_node_height,
            ),
        );
        (lines, w, h)
    };

    // Column widths first, so branch centers are known before any node is
    // placed.
    struct BranchPlan {
        lines: Vec<String>,
        w: f32,
        h: f32,
        children: Vec<(Vec<String>, f32, f32)>,
        col_w: f32,
    }
    let mut plans = Vec::with_capacity(branches.len());
    for (i, branch) in branches.iter().enumerate() {
        let (lines, w, h) = size(spec, &spec::branch_id(i), &branch.text.text, font_item);
        let children: Vec<(Vec<String>, f32, f32)> = branch
            .children
            .iter()
            .enumerate()
            .map(|(j, child)| size(spec, &spec::child_id(i, j), &child.text, font_item))
            .collect();
        let col_w = children
            .iter()
            .map(|c| c.1)
            .fold(w, f32::max);
        plans.push(BranchPlan {
            lines,
            w,
            h,
            children,
            col_w,
        });
    }
    let total_w: f32 =
        plans.iter().map(|p| p.col_w).sum::<f32>() + cfg.branch_gap * plans.len().saturating_sub(1) as f32;

    let (topic_lines, topic_w, topic_h) = size(spec, &spec::topic_id(), &topic, font_topic);
    let mut nodes = vec![PositionedNode {
        node_id: spec::topic_id(),
        kind: NodeKind::Topic,
        shape: Shape::Rect {
            x: -topic_w / 2.0,
            y: -topic_h / 2.0,
            w: topic_w,
            h: topic_h,
        },
        lines: topic_lines,
        font_size: font_topic,
        fill: theme.color("topicFill").to_string(),
        stroke: theme.color("topicFill").to_string(),
        stroke_width,
        text_color: theme.color("topicText").to_string(),
        corner_radius: 6.0,
        array_index: None,
    }];

    let mut connections = Vec::new();
    let branch_y = topic_h / 2.0 + cfg.level_gap;
    let mut cursor_x = -total_w / 2.0;
    for (i, plan) in plans.iter().enumerate() {
        let col_center = cursor_x + plan.col_w / 2.0;
        cursor_x += plan.col_w + cfg.branch_gap;

        let branch_id = spec::branch_id(i);
        nodes.push(PositionedNode {
            node_id: branch_id.clone(),
            kind: NodeKind::Branch,
            shape: Shape::Rect {
                x: col_center - plan.w / 2.0,
                y: branch_y,
                w: plan.w,
                h: plan.h,
            },
            lines: plan.lines.clone(),
            font_size: font_item,
            fill: theme.color("branchFill").to_string(),
            stroke: theme.color("branchStroke").to_string(),
            stroke_width,
            text_color: theme.color("branchText").to_string(),
            corner_radius: 4.0,
            array_index: Some(i),
        });
        connections.push(Connection::line(
            spec::topic_id(),
            branch_id.clone(),
            theme.color("lineColor"),
            stroke_width,
        ));

        let mut child_y = branch_y + plan.h + cfg.level_gap / 2.0;
        for (j, (lines, w, h)) in plan.children.iter().enumerate() {
            let child_id = spec::child_id(i, j);
            nodes.push(PositionedNode {
                node_id: child_id.clone(),
                kind: NodeKind::Child,
                shape: Shape::Rect {
                    x: col_center - w / 2.0,
                    y: child_y,
                    w: *w,
                    h: *h,
                },
                lines: lines.clone(),
                font_size: font_item,
                fill: theme.color("childFill").to_string(),
                stroke: theme.color("childStroke").to_string(),
                stroke_width,
                text_color: theme.color("childText").to_string(),
                corner_radius: 4.0,
                array_index: Some(j),
            });
            connections.push(Connection::line(
                branch_id.clone(),
                child_id,
                theme.color("lineColor"),
                stroke_width,
            ));
            child_y += h + cfg.child_gap;
        }
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
        connections,
        decorations: Vec::new(),
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
