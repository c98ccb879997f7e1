use std::path::Path;

use anyhow::Result;
use log::error;
use thiserror::Error;

use crate::config::Config;
use crate::events::{EngineEvent, EventBus};
use crate::layout::geometry::{connection_endpoints, edge_point};
use crate::layout::types::{Connection, Layout, Primitive, Shape, TextAnchor};
use crate::layout::{compute_layout, LayoutError};
use crate::spec::{Spec, SpecError};
use crate::theme::{Theme, ThemeError, ThemeResolver};
use crate::viewport::ViewBox;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

pub struct RenderOutput {
    pub svg: String,
    pub layout: Layout,
}

/// Render pipeline: validate, resolve theme, lay out, emit SVG. Owns the
/// theme resolver so imported themes survive across renders.
pub struct Renderer {
    resolver: ThemeResolver,
    pub config: Config,
}

impl Renderer {
    pub fn new(config: Config) -> Self {
        Self {
            resolver: ThemeResolver::new(),
            config,
        }
    }

    pub fn resolver_mut(&mut self) -> &mut ThemeResolver {
        &mut self.resolver
    }

    /// Full render of a spec. Validation failures abort before any layout
    /// work; nothing is drawn from a bad spec.
    pub fn render(&mut self, spec: &mut Spec, bus: &mut EventBus) -> Result<RenderOutput, RenderError> {
        if let Err(err) = spec.validate() {
            error!("spec rejected: {err}");
            return Err(err.into());
        }
        let theme = self.resolver.resolve(
            spec.diagram_type(),
            &self.config.render.font_family,
            &self.config.theme,
            spec.style.as_ref(),
        )?;
        let layout = compute_layout(spec, &theme, &self.config.layout)?;
        let svg = render_svg(&layout, &theme, &self.config, None, None);
        bus.emit(EngineEvent::Rendered {
            diagram_type: layout.diagram_type,
        });
        Ok(RenderOutput { svg, layout })
    }
}

/// Serialize a layout to SVG. `view_box` defaults to the content bounds
/// plus export padding; `transform` is the zoom-group transform, identity
/// when fits alone frame the content.
pub fn render_svg(
    layout: &Layout,
    theme: &Theme,
    config: &Config,
    view_box: Option<ViewBox>,
    transform: Option<&str>,
) -> String {
    let mut svg = String::new();
    let (vb_x, vb_y, vb_w, vb_h) = match view_box {
        Some(vb) => (vb.x, vb.y, vb.w.max(1.0), vb.h.max(1.0)),
        None => {
            let bounds = layout.bounds.expanded(config.viewport.export_padding);
            (
                bounds.min_x,
                bounds.min_y,
                bounds.width().max(1.0),
                bounds.height().max(1.0),
            )
        }
    };
    let width = config.render.width;
    let height = config.render.height;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"{vb_x:.2} {vb_y:.2} {vb_w:.2} {vb_h:.2}\" preserveAspectRatio=\"xMidYMid meet\">",
    ));
    svg.push_str(&format!(
        "<rect x=\"{vb_x:.2}\" y=\"{vb_y:.2}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.color("background")
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.color("lineColor")
    ));
    svg.push_str("</defs>");

    svg.push_str(&format!(
        "<g class=\"zoom-group\" transform=\"{}\">",
        transform.unwrap_or("translate(0 0) scale(1)")
    ));

    // connections go under nodes
    for conn in &layout.connections {
        render_connection(&mut svg, layout, conn, theme);
    }
    for decoration in &layout.decorations {
        render_primitive(&mut svg, decoration, theme);
    }

    for node in &layout.nodes {
        match node.shape {
            Shape::Circle { cx, cy, r } => {
                svg.push_str(&format!(
                    "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
                    node.fill, node.stroke, node.stroke_width
                ));
            }
            Shape::Rect { x, y, w, h } => {
                svg.push_str(&format!(
                    "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"{rx:.2}\" ry=\"{rx:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
                    node.fill,
                    node.stroke,
                    node.stroke_width,
                    rx = node.corner_radius
                ));
            }
            Shape::Ellipse { cx, cy, rx, ry } => {
                svg.push_str(&format!(
                    "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
                    node.fill, node.stroke, node.stroke_width
                ));
            }
            Shape::Diamond { cx, cy, w, h } => {
                let (hw, hh) = (w / 2.0, h / 2.0);
                svg.push_str(&format!(
                    "<polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
                    cx, cy - hh,
                    cx + hw, cy,
                    cx, cy + hh,
                    cx - hw, cy,
                    node.fill, node.stroke, node.stroke_width
                ));
            }
        }
        let center = node.shape.center();
        text_lines_svg(
            &mut svg,
            center.x,
            center.y,
            &node.lines,
            node.font_size,
            &node.text_color,
            theme,
            config,
        );
    }

    svg.push_str("</g>");
    svg.push_str("</svg>");
    svg
}

fn render_connection(svg: &mut String, layout: &Layout, conn: &Connection, theme: &Theme) {
    let from = layout.node(&conn.from).map(|n| n.shape);
    let to = layout.node(&conn.to).map(|n| n.shape);
    let (start, end) = match (from, to) {
        (Some(from), Some(to)) => {
            let (mut start, mut end) = connection_endpoints(&from, &to);
            if let Some(anchor) = conn.from_anchor {
                start = anchor;
                end = edge_point(&to, start);
            }
            if let Some(anchor) = conn.to_anchor {
                end = anchor;
                start = edge_point(&from, end);
            }
            (start, end)
        }
        _ => {
            log::warn!("connection references missing node {} -> {}", conn.from, conn.to);
            return;
        }
    };
    let marker = if conn.arrow {
        " marker-end=\"url(#arrow)\""
    } else {
        ""
    };
    svg.push_str(&format!(
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{}\"{marker}/>",
        start.x, start.y, end.x, end.y, conn.stroke, conn.stroke_width
    ));

    if let Some(label) = &conn.label {
        let mid_x = (start.x + end.x) / 2.0;
        let mid_y = (start.y + end.y) / 2.0;
        let font_size = theme.size("fontItem") * 0.85;
        let approx_w = label.chars().count() as f32 * font_size * 0.56;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\"/>",
            mid_x - approx_w / 2.0 - 4.0,
            mid_y - font_size / 2.0 - 3.0,
            approx_w + 8.0,
            font_size + 6.0,
            theme.color("background")
        ));
        svg.push_str(&format!(
            "<text x=\"{mid_x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{font_size}\" fill=\"{}\">{}</text>",
            mid_y + font_size * 0.35,
            theme.font_family,
            theme.color("lineColor"),
            escape_xml(label)
        ));
    }
}

fn render_primitive(svg: &mut String, primitive: &Primitive, theme: &Theme) {
    match primitive {
        Primitive::Circle {
            cx,
            cy,
            r,
            fill,
            stroke,
            stroke_width,
            dashed,
        } => {
            let dash = if *dashed { " stroke-dasharray=\"6 4\"" } else { "" };
            svg.push_str(&format!(
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"{dash}/>",
                fill.as_deref().unwrap_or("none")
            ));
        }
        Primitive::Line {
            x1,
            y1,
            x2,
            y2,
            stroke,
            stroke_width,
        } => {
            svg.push_str(&format!(
                "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>"
            ));
        }
        Primitive::Polygon {
            points,
            fill,
            stroke,
            stroke_width,
        } => {
            let coords: Vec<String> = points.iter().map(|p| format!("{:.2},{:.2}", p.x, p.y)).collect();
            svg.push_str(&format!(
                "<polygon points=\"{}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>",
                coords.join(" ")
            ));
        }
        Primitive::Path {
            d,
            stroke,
            stroke_width,
        } => {
            svg.push_str(&format!(
                "<path d=\"{d}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>"
            ));
        }
        Primitive::Text {
            x,
            y,
            text,
            font_size,
            color,
            anchor,
            bold,
        } => {
            let weight = if *bold { " font-weight=\"bold\"" } else { "" };
            svg.push_str(&format!(
                "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{}\" font-family=\"{}\" font-size=\"{font_size}\" fill=\"{color}\"{weight}>{}</text>",
                anchor.as_str(),
                theme.font_family,
                escape_xml(text)
            ));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn text_lines_svg(
    svg: &mut String,
    x: f32,
    y: f32,
    lines: &[String],
    font_size: f32,
    fill: &str,
    theme: &Theme,
    config: &Config,
) {
    if lines.iter().all(|l| l.is_empty()) {
        return;
    }
    let line_height = font_size * config.layout.label_line_height;
    let total_height = lines.len() as f32 * line_height;
    // first baseline sits so the block centers on y
    let start_y = y - total_height / 2.0 + font_size * 0.85;
    svg.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{font_size}\" fill=\"{fill}\">",
        theme.font_family
    ));
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        svg.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    svg.push_str("</text>");
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{svg}");
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = config.render.font_family.clone();
    if let Some(size) = usvg::Size::from_wh(config.render.width, config.render.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
