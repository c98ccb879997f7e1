//! Flowchart: a vertical sequence with a shape per step kind. Start and end
//! are pill-shaped, decisions are diamonds, everything else a rectangle.

use crate::config::LayoutConfig;
use crate::spec::{self, FlowchartStepKind, NodeKind, Spec, SpecBody};
use crate::theme::Theme;

use super::types::{Bounds, Connection, Layout, PositionedNode, Shape};
use super::{text, LayoutError};

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let cfg = config.flowchart.clone();
    let font_item = theme.size("fontItem");
    let stroke_width = theme.size("strokeWidth");

    let steps = match &spec.body {
        SpecBody::Flowchart { steps } => steps.clone(),
        _ => unreachable!("dispatched on body"),
    };

    let mut nodes = Vec::with_capacity(steps.len());
    let mut connections = Vec::with_capacity(steps.len().saturating_sub(1));
    let mut cursor = 0.0f32;
    for (i, step) in steps.iter().enumerate() {
        let lines = text::wrap_label(
            &step.text.text,
            font_item,
            cfg.max_text_width,
            &theme.font_family,
            config.fast_text_metrics,
        );
        let (mut w, mut h) = super::text_rect_size(
            &lines,
            font_item,
            theme,
            config,
            cfg.node_padding,
            cfg.min_node_width,
            cfg.min_node_height,
        );
        // Diamond text sits inside the inscribed rect, so the shape grows.
        if step.kind == FlowchartStepKind::Decision {
            w *= cfg.diamond_scale;
            h *= cfg.diamond_scale;
        }

        let cy = cursor + h / 2.0;
        cursor += h + cfg.step_gap;

        let (fill_key, shape, corner_radius) = match step.kind {
            FlowchartStepKind::Start => (
                "startFill",
                Shape::Rect {
                    x: -w / 2.0,
                    y: cy - h / 2.0,
                    w,
                    h,
                },
                h / 2.0,
            ),
            FlowchartStepKind::End => (
                "endFill",
                Shape::Rect {
                    x: -w / 2.0,
                    y: cy - h / 2.0,
                    w,
                    h,
                },
                h / 2.0,
            ),
            FlowchartStepKind::Decision => (
                "decisionFill",
                Shape::Diamond {
                    cx: 0.0,
                    cy,
                    w,
                    h,
                },
                0.0,
            ),
            FlowchartStepKind::Process => (
                "processFill",
                Shape::Rect {
                    x: -w / 2.0,
                    y: cy - h / 2.0,
                    w,
                    h,
                },
                4.0,
            ),
        };
        let node_id = spec::flow_step_id(i);
        let text_key = format!("{}Text", fill_key.strip_suffix("Fill").unwrap_or(fill_key));
        nodes.push(PositionedNode {
            node_id: node_id.clone(),
            kind: NodeKind::FlowStep,
            shape,
            lines,
            font_size: font_item,
            fill: theme.color(fill_key).to_string(),
            stroke: theme.color("stepStroke").to_string(),
            stroke_width,
            text_color: theme.color(&text_key).to_string(),
            corner_radius,
            array_index: Some(i),
        });
        if i > 0 {
            connections.push(Connection::arrow(
                spec::flow_step_id(i - 1),
                node_id,
                theme.color("lineColor"),
                stroke_width,
            ));
        }
    }

    Ok(Layout {
        diagram_type: spec.diagram_type(),
        nodes,
        connections,
        decorations: Vec::new(),
        bounds: Bounds::empty(),
        session: None,
    })
}
