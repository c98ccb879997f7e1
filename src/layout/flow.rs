//! Flow map: sequential steps with optional substep groups hanging off
//! each step. Both orientations share one code path working in main/cross
//! coordinates; `vertical` maps main to y, `horizontal` maps main to x.

use crate::config::LayoutConfig;
use crate::session::{DragDomain, SessionHandle, SessionNode};
use crate::spec::{self, NodeKind, Orientation, Spec, SpecBody};
use crate::theme::Theme;

use super::types::{Bounds, Connection, Layout, PositionedNode, Primitive, Shape, TextAnchor};
use super::{preserved_rect, text, LayoutError};

struct Sized {
    lines: Vec<String>,
    w: f32,
    h: f32,
}

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let cfg = config.flow.clone();
    let font_item = theme.size("fontItem");
    let font_title = theme.size("fontTitle");
    let stroke_width = cfg.stroke_width;

    let (steps, orientation) = match &spec.body {
        SpecBody::FlowMap { steps, orientation } => (steps.clone(), *orientation),
        _ => unreachable!("dispatched on body"),
    };
    let vertical = orientation == Orientation::Vertical;
    // main axis advances through the sequence, cross axis is sideways
    let to_xy = |main: f32, cross: f32| -> (f32, f32) {
        if vertical {
            (cross, main)
        } else {
            (main, cross)
        }
    };
    let main_extent = |s: &Sized| if vertical { s.h } else { s.w };
    let cross_extent = |s: &Sized| if vertical { s.w } else { s.h };

    let size_text = |spec: &Spec, node_id: &str, value: &str, padding: f32| -> Sized {
        let lines = text::wrap_label(
            value,
            font_item,
            cfg.max_text_width,
            &theme.font_family,
            config.fast_text_metrics,
        );
        let (w, h) = preserved_rect(
            spec,
            node_id,
            value,
            super::text_rect_size(
                &lines,
                font_item,
                theme,
                config,
                padding,
                cfg.min_step_width,
                cfg.min_step_height,
            ),
        );
        Sized { lines, w, h }
    };

    let sized_steps: Vec<Sized> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| size_text(spec, &spec::flow_step_id(i), &s.text.text, cfg.node_padding))
        .collect();
    let sized_substeps: Vec<Vec<Sized>> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| {
            s.substeps
                .iter()
                .enumerate()
                .map(|(j, sub)| {
                    size_text(
                        spec,
                        &spec::flow_substep_id(i, j),
                        &sub.text,
                        cfg.substep_padding,
                    )
                })
                .collect()
        })
        .collect();

    let uniform_cross = sized_steps.iter().map(&cross_extent).fold(0.0, f32::max);

    // Substep groups drive adaptive spacing: a group taller than its step
    // pushes the neighbors apart so substeps never collide.
    let group_len = |subs: &[Sized]| -> f32 {
        if subs.is_empty() {
            return 0.0;
        }
        subs.iter().map(&main_extent).sum::<f32>() + cfg.substep_gap * (subs.len() - 1) as f32
    };
    let overhang = |i: usize| -> f32 {
        (group_len(&sized_substeps[i]) - main_extent(&sized_steps[i])).max(0.0) / 2.0
    };

    let mut step_centers = Vec::with_capacity(steps.len());
    let mut cursor = 0.0;
    for i in 0..steps.len() {
        if i > 0 {
            cursor += cfg.step_gap + overhang(i - 1) + overhang(i);
        }
        step_centers.push(cursor + main_extent(&sized_steps[i]) / 2.0);
        cursor += main_extent(&sized_steps[i]);
    }

    let mut nodes = Vec::new();
    let mut connections = Vec::new();
    let mut decorations = Vec::new();

    for (i, sized) in sized_steps.iter().enumerate() {
        let (cx, cy) = to_xy(step_centers[i], 0.0);
        let node_id = spec::flow_step_id(i);
        nodes.push(PositionedNode {
            node_id: node_id.clone(),
            kind: NodeKind::FlowStep,
            shape: Shape::Rect {
                x: cx - sized.w / 2.0,
                y: cy - sized.h / 2.0,
                w: sized.w,
                h: sized.h,
            },
            lines: sized.lines.clone(),
            font_size: font_item,
            fill: theme.color("stepFill").to_string(),
            stroke: theme.color("stepStroke").to_string(),
            stroke_width,
            text_color: theme.color("stepText").to_string(),
            corner_radius: 6.0,
            array_index: Some(i),
        });
        if i > 0 {
            connections.push(Connection::arrow(
                spec::flow_step_id(i - 1),
                node_id.clone(),
                theme.color("lineColor"),
                stroke_width,
            ));
        }

        let subs = &sized_substeps[i];
        if subs.is_empty() {
            continue;
        }
        let group = group_len(subs);
        let mut sub_cursor = step_centers[i] - group / 2.0;
        let sub_cross = uniform_cross / 2.0 + cfg.substep_offset;
        let elbow_cross = uniform_cross / 2.0 + cfg.substep_offset / 2.0;
        for (j, sub) in subs.iter().enumerate() {
            let sub_main = sub_cursor + main_extent(sub) / 2.0;
            sub_cursor += main_extent(sub) + cfg.substep_gap;
            let cross_center = sub_cross + cross_extent(sub) / 2.0;
            let (sx, sy) = to_xy(sub_main, cross_center);
            nodes.push(PositionedNode {
                node_id: spec::flow_substep_id(i, j),
                kind: NodeKind::FlowSubstep,
                shape: Shape::Rect {
                    x: sx - sub.w / 2.0,
                    y: sy - sub.h / 2.0,
                    w: sub.w,
                    h: sub.h,
                },
                lines: sub.lines.clone(),
                font_size: font_item,
                fill: theme.color("substepFill").to_string(),
                stroke: theme.color("substepStroke").to_string(),
                stroke_width,
                text_color: theme.color("substepText").to_string(),
                corner_radius: 4.0,
                array_index: Some(j),
            });
            // L-shaped connector: out of the step sideways, along the
            // elbow, into the substep.
            let (ax, ay) = to_xy(step_centers[i], cross_extent(&sized_steps[i]) / 2.0);
            let (bx, by) = to_xy(step_centers[i], elbow_cross);
            let (ex, ey) = to_xy(sub_main, elbow_cross);
            let (fx, fy) = to_xy(sub_main, sub_cross);
            decorations.push(Primitive::Path {
                d: format!("M {ax:.2} {ay:.2} L {bx:.2} {by:.2} L {ex:.2} {ey:.2} L {fx:.2} {fy:.2}"),
                stroke: theme.color("lineColor").to_string(),
                stroke_width,
            });
        }
    }

    if let Some(title) = &spec.title {
        if let Some(first) = sized_steps.first() {
            // Above the first step in both orientations.
            let (tx, ty) = if vertical {
                (0.0, step_centers[0] - first.h / 2.0 - cfg.title_gap)
            } else {
                (step_centers[0], -first.h / 2.0 - cfg.title_gap)
            };
            decorations.push(Primitive::Text {
                x: tx,
                y: ty,
                text: title.text.clone(),
                font_size: font_title,
                color: theme.color("titleFill").to_string(),
                anchor: TextAnchor::Middle,
                bold: true,
            });
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
        decorations,
        bounds: Bounds::empty(),
        session: Some(SessionHandle {
            diagram_type: spec.diagram_type(),
            center: spec::Point { x: 0.0, y: 0.0 },
            domain: DragDomain::Free,
            particles: Vec::new(),
            nodes: session_nodes,
        }),
    })
}
