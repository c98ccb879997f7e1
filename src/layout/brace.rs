//! Brace map: whole-to-part decomposition reading left to right. The topic
//! sits at the left, parts in a middle column joined by a brace, subparts in
//! a right column with a smaller brace per part.

use crate::config::LayoutConfig;
use crate::session::{DragDomain, SessionHandle, SessionNode};
use crate::spec::{self, NodeKind, Point, Spec, SpecBody};
use crate::theme::Theme;

use super::types::{Bounds, Layout, PositionedNode, Primitive, Shape};
use super::{preserved_rect, text, LayoutError};

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let cfg = config.brace.clone();
    let font_topic = theme.size("fontTopic");
    let font_item = theme.size("fontItem");
    let stroke_width = theme.size("strokeWidth");

    let (topic, parts) = match &spec.body {
        SpecBody::BraceMap { topic, parts } => (topic.text.clone(), parts.clone()),
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

    struct PartPlan {
        lines: Vec<String>,
        w: f32,
        h: f32,
        subparts: Vec<(Vec<String>, f32, f32)>,
        /// Vertical room the part needs: its own height or its subpart
        /// stack, whichever is taller.
        extent: f32,
    }
    let mut plans = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let (lines, w, h) = size(spec, &spec::branch_id(i), &part.text.text, font_item);
        let subparts: Vec<(Vec<String>, f32, f32)> = part
            .children
            .iter()
            .enumerate()
            .map(|(j, sub)| size(spec, &spec::child_id(i, j), &sub.text, font_item))
            .collect();
        let stack_h = if subparts.is_empty() {
            0.0
        } else {
            subparts.iter().map(|s| s.2).sum::<f32>()
                + cfg.subpart_gap * (subparts.len() - 1) as f32
        };
        plans.push(PartPlan {
            lines,
            w,
            h: h.max(0.0),
            extent: h.max(stack_h),
            subparts,
        });
    }
    let total_h: f32 = plans.iter().map(|p| p.extent).sum::<f32>()
        + cfg.part_gap * plans.len().saturating_sub(1) as f32;

    let (topic_lines, topic_w, topic_h) = size(spec, &spec::topic_id(), &topic, font_topic);
    let part_w = plans.iter().map(|p| p.w).fold(cfg.min_node_width, f32::max);
    let part_x = topic_w / 2.0 + cfg.column_gap + part_w / 2.0;
    let sub_x = part_x + part_w / 2.0 + cfg.column_gap;

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
    let mut decorations = vec![brace(
        topic_w / 2.0 + cfg.column_gap / 2.0,
        -total_h / 2.0,
        total_h / 2.0,
        theme.color("lineColor"),
        stroke_width,
    )];

    let mut cursor_y = -total_h / 2.0;
    for (i, plan) in plans.iter().enumerate() {
        let part_cy = cursor_y + plan.extent / 2.0;
        nodes.push(PositionedNode {
            node_id: spec::branch_id(i),
            kind: NodeKind::Branch,
            shape: Shape::Rect {
                x: part_x - plan.w / 2.0,
                y: part_cy - plan.h / 2.0,
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

        if !plan.subparts.is_empty() {
            let stack_h = plan
                .subparts
                .iter()
                .map(|s| s.2)
                .sum::<f32>()
                + cfg.subpart_gap * (plan.subparts.len() - 1) as f32;
            decorations.push(brace(
                part_x + part_w / 2.0 + cfg.column_gap / 2.0,
                part_cy - stack_h / 2.0,
                part_cy + stack_h / 2.0,
                theme.color("lineColor"),
                stroke_width,
            ));
            let mut sub_y = part_cy - stack_h / 2.0;
            for (j, (lines, w, h)) in plan.subparts.iter().enumerate() {
                nodes.push(PositionedNode {
                    node_id: spec::child_id(i, j),
                    kind: NodeKind::Child,
                    shape: Shape::Rect {
                        x: sub_x,
                        y: sub_y,
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
                sub_y += h + cfg.subpart_gap;
            }
        }
        cursor_y += plan.extent + cfg.part_gap;
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

/// Curly brace spanning `[y0, y1]` on the vertical line `x`, tip pointing
/// left.
fn brace(x: f32, y0: f32, y1: f32, stroke: &str, stroke_width: f32) -> Primitive {
    let ym = (y0 + y1) / 2.0;
    let d = ((y1 - y0) / 8.0).clamp(6.0, 14.0);
    let d_attr = format!(
        "M {x0:.2} {y0:.2} Q {xl:.2} {y0:.2} {xl:.2} {yu:.2} L {xl:.2} {ymu:.2} \
         Q {xl:.2} {ym:.2} {xt:.2} {ym:.2} Q {xl:.2} {ym:.2} {xl:.2} {yml:.2} \
         L {xl:.2} {yl:.2} Q {xl:.2} {y1:.2} {x0:.2} {y1:.2}",
        x0 = x + d,
        xl = x,
        xt = x - d,
        y0 = y0,
        y1 = y1,
        yu = y0 + d,
        yl = y1 - d,
        ym = ym,
        ymu = ym - d,
        yml = ym + d,
    );
    Primitive::Path {
        d: d_attr,
        stroke: stroke.to_string(),
        stroke_width,
    }
}
