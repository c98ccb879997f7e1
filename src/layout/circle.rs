//! Circle map: the bubble-map ring with context nodes and an enclosing
//! boundary circle.

use crate::config::LayoutConfig;
use crate::spec::{Family, Spec};
use crate::theme::Theme;

use super::bubble::{radial_layout, RadialParams};
use super::types::{Layout, Primitive};
use super::LayoutError;

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let circle_cfg = config.circle.clone();
    let outcome = radial_layout(
        spec,
        theme,
        config,
        RadialParams {
            bubble: &circle_cfg.bubble,
            family: Family::Context,
            fill_key: "contextFill",
            stroke_key: "contextStroke",
            text_key: "contextText",
            spokes: false,
        },
    );
    let mut layout = outcome.layout;
    layout.decorations.push(Primitive::Circle {
        cx: 0.0,
        cy: 0.0,
        r: outcome.ring.outer_r + circle_cfg.boundary_padding,
        fill: None,
        stroke: theme.color("boundaryStroke").to_string(),
        stroke_width: circle_cfg.boundary_stroke_width,
        dashed: false,
    });
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::{Bounds, Primitive};

    #[test]
    fn boundary_circle_encloses_every_node() {
        let mut spec: Spec = serde_json::from_value(serde_json::json!({
            "type": "circle_map",
            "topic": "Weather",
            "context": ["wind", "rain", "clouds", "sun", "snow"],
        }))
        .unwrap();
        let theme = crate::theme::ThemeResolver::new()
            .resolve(
                crate::spec::DiagramType::CircleMap,
                "sans-serif",
                &Default::default(),
                None,
            )
            .unwrap();
        let config = LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        };
        let mut layout = layout(&mut spec, &theme, &config).unwrap();
        layout.recompute_bounds();

        let boundary_r = match layout.decorations[0] {
            Primitive::Circle { r, .. } => r,
            _ => panic!("first decoration should be the boundary"),
        };
        let mut node_bounds = Bounds::empty();
        for node in &layout.nodes {
            node_bounds.include(node.shape.bounds());
        }
        assert!(node_bounds.max_x <= boundary_r);
        assert!(node_bounds.max_y <= boundary_r);
        assert!(node_bounds.min_x >= -boundary_r);
        // no spokes in a circle map
        assert!(layout.connections.is_empty());
    }
}
