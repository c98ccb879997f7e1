//! Per-diagram-type layout kernels.
//!
//! Each kernel turns a spec into positioned geometry anchored at the origin:
//! nodes, connections, decorations and a tight bounding box. Shared
//! sub-algorithms (donut ring packing, uniform radii, custom-position
//! reconciliation) live here; everything type-specific lives in the
//! submodules.

pub mod brace;
pub mod bridge;
pub mod bubble;
pub mod circle;
pub mod concept;
pub mod double_bubble;
pub mod flow;
pub mod flowchart;
pub mod geometry;
pub mod mindmap;
pub mod multi_flow;
pub mod text;
pub mod tree;
pub mod types;

use thiserror::Error;

use crate::config::LayoutConfig;
use crate::position_store::{self, PositionClass};
use crate::spec::{Family, NodeDimensions, Point, Spec, SpecBody, SpecError};
use crate::theme::Theme;

use types::Layout;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("mind map spec carries no positioning data")]
    MissingPositions,
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Lay out a spec. Takes the spec mutably because a `PartialCustom` family
/// triggers an even redistribution that writes positions back.
pub fn compute_layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let mut layout = match &spec.body {
        SpecBody::BubbleMap { .. } => bubble::layout(spec, theme, config),
        SpecBody::CircleMap { .. } => circle::layout(spec, theme, config),
        SpecBody::DoubleBubbleMap { .. } => double_bubble::layout(spec, theme, config),
        SpecBody::MultiFlowMap { .. } => multi_flow::layout(spec, theme, config),
        SpecBody::BridgeMap { .. } => bridge::layout(spec, theme, config),
        SpecBody::FlowMap { .. } => flow::layout(spec, theme, config),
        SpecBody::Flowchart { .. } => flowchart::layout(spec, theme, config),
        SpecBody::Mindmap { .. } => mindmap::layout(spec, theme, config),
        SpecBody::TreeMap { .. } => tree::layout(spec, theme, config),
        SpecBody::BraceMap { .. } => brace::layout(spec, theme, config),
        SpecBody::ConceptMap { .. } => concept::layout(spec, theme, config),
    }?;
    layout.recompute_bounds();
    Ok(layout)
}

/// Center-to-peripheral distance for a donut ring of `n` nodes of radius
/// `r` around a topic of radius `topic_r`.
///
/// The radial constraint keeps peripherals clear of the topic; the
/// circumferential constraint widens the ring until `n` nodes fit around it
/// without touching. Spacing tightens slightly as the ring fills up.
pub(crate) fn donut_distance(n: usize, r: f32, topic_r: f32, margin: f32, floor: f32) -> f32 {
    if n == 0 {
        return floor;
    }
    let spacing = match n {
        0..=3 => 2.0,
        4..=6 => 2.05,
        _ => 2.1,
    };
    let radial = topic_r + 0.5 * topic_r + r + margin;
    let circumferential = spacing * r * n as f32 / std::f32::consts::TAU;
    radial.max(circumferential).max(floor)
}

/// Default ring angle of slot `i` of `n`, in radians, starting at the top
/// and proceeding clockwise.
pub(crate) fn ring_angle(i: usize, n: usize) -> f32 {
    (i as f32 * std::f32::consts::TAU / n as f32) - std::f32::consts::FRAC_PI_2
}

/// Radius of a circle that encloses the wrapped label with padding.
pub(crate) fn text_circle_radius(
    lines: &[String],
    font_size: f32,
    theme: &Theme,
    config: &LayoutConfig,
    padding: f32,
    min_radius: f32,
) -> f32 {
    let width = text::max_line_width(
        lines,
        font_size,
        &theme.font_family,
        config.fast_text_metrics,
    );
    let height = lines.len() as f32 * font_size * config.label_line_height;
    let half_diag = ((width / 2.0).powi(2) + (height / 2.0).powi(2)).sqrt();
    (half_diag + padding).max(min_radius)
}

/// Width and height of a rectangle that encloses the wrapped label.
pub(crate) fn text_rect_size(
    lines: &[String],
    font_size: f32,
    theme: &Theme,
    config: &LayoutConfig,
    padding: f32,
    min_w: f32,
    min_h: f32,
) -> (f32, f32) {
    let width = text::max_line_width(
        lines,
        font_size,
        &theme.font_family,
        config.fast_text_metrics,
    );
    let height = lines.len() as f32 * font_size * config.label_line_height;
    (
        (width + 2.0 * padding).max(min_w),
        (height + 2.0 * padding).max(min_h),
    )
}

/// A node whose text was emptied keeps its stored size so it does not
/// collapse.
pub(crate) fn preserved_radius(spec: &Spec, node_id: &str, text: &str, computed: f32) -> f32 {
    if !text.trim().is_empty() {
        return computed;
    }
    match spec.node_dimensions.get(node_id) {
        Some(NodeDimensions::Radius { r }) => computed.max(*r),
        Some(NodeDimensions::Rect { w, h }) => computed.max(w.max(*h) / 2.0),
        None => computed,
    }
}

pub(crate) fn preserved_rect(
    spec: &Spec,
    node_id: &str,
    text: &str,
    computed: (f32, f32),
) -> (f32, f32) {
    if !text.trim().is_empty() {
        return computed;
    }
    match spec.node_dimensions.get(node_id) {
        Some(NodeDimensions::Rect { w, h }) => (computed.0.max(*w), computed.1.max(*h)),
        Some(NodeDimensions::Radius { r }) => (computed.0.max(r * 2.0), computed.1.max(r * 2.0)),
        None => computed,
    }
}

/// Reconcile one family with `_customPositions` and return its rendered
/// positions, in `family.ids` order.
///
/// `AllCustom` uses stored positions verbatim, `None` uses the defaults
/// without storing them, and `PartialCustom` redistributes the defaults
/// into the store so the next render sees `AllCustom`.
pub(crate) fn resolve_family_positions<F>(
    spec: &mut Spec,
    family: Family,
    mut default_position: F,
) -> Vec<Point>
where
    F: FnMut(&str) -> Point,
{
    let ids = family.ids(spec);
    match position_store::classify(spec, family) {
        PositionClass::AllCustom => ids
            .iter()
            .map(|id| {
                position_store::get_position(spec, id).unwrap_or_else(|| default_position(id))
            })
            .collect(),
        PositionClass::None => ids.iter().map(|id| default_position(id)).collect(),
        PositionClass::PartialCustom => {
            position_store::even_redistribute(spec, family, &mut default_position);
            ids.iter()
                .map(|id| {
                    position_store::get_position(spec, id).unwrap_or_else(|| default_position(id))
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn donut_distance_grows_with_crowding() {
        // few nodes: the radial constraint dominates
        let sparse = donut_distance(3, 30.0, 60.0, 20.0, 130.0);
        assert!((sparse - 140.0).abs() < 1e-3); // 60 + 30 + 30 + 20

        // many nodes: the circumferential constraint dominates
        let crowded = donut_distance(24, 30.0, 60.0, 20.0, 130.0);
        let expected = 2.1 * 30.0 * 24.0 / std::f32::consts::TAU;
        assert!((crowded - expected).abs() < 1e-3);
        assert!(crowded > sparse);
    }

    #[test]
    fn donut_distance_never_drops_below_the_floor() {
        assert_eq!(donut_distance(1, 5.0, 5.0, 2.0, 130.0), 130.0);
    }

    #[test]
    fn ring_angles_start_at_the_top() {
        let first = ring_angle(0, 4);
        assert!((first + std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        // slot 1 of 4 points right
        assert!(ring_angle(1, 4).abs() < 1e-6);
    }

    #[test]
    fn preserved_radius_only_applies_to_empty_text() {
        let mut spec: Spec = serde_json::from_value(serde_json::json!({
            "type": "bubble_map",
            "topic": "T",
            "attributes": [""],
            "_node_dimensions": {"attribute_0": {"r": 48.0}},
        }))
        .unwrap();
        assert_eq!(preserved_radius(&spec, "attribute_0", "", 30.0), 48.0);
        assert_eq!(preserved_radius(&spec, "attribute_0", "hi", 30.0), 30.0);
        spec.node_dimensions.clear();
        assert_eq!(preserved_radius(&spec, "attribute_0", "", 30.0), 30.0);
    }
}
