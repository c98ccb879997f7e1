use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::theme::TokenValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    /// Lower bound for the uniform peripheral radius.
    pub min_node_radius: f32,
    pub min_topic_radius: f32,
    pub text_padding: f32,
    /// Margin between the outer node edge and the visual ring.
    pub ring_margin: f32,
    /// Gap between the topic edge and the inner drag ring.
    pub ring_gap: f32,
    /// Floor for the center-to-peripheral distance.
    pub distance_floor: f32,
    pub max_text_width: f32,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            min_node_radius: 30.0,
            min_topic_radius: 55.0,
            text_padding: 8.0,
            ring_margin: 20.0,
            ring_gap: 10.0,
            distance_floor: 130.0,
            max_text_width: 110.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    pub bubble: BubbleConfig,
    /// Padding between the outer node ring and the boundary circle.
    pub boundary_padding: f32,
    pub boundary_stroke_width: f32,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            bubble: BubbleConfig::default(),
            boundary_padding: 24.0,
            boundary_stroke_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleBubbleConfig {
    pub min_topic_radius: f32,
    pub min_node_radius: f32,
    pub text_padding: f32,
    /// Horizontal distance between the two topic centers.
    pub topic_gap: f32,
    /// Horizontal offset of the difference columns from their topic.
    pub column_offset: f32,
    /// Vertical padding between stacked circles in one column.
    pub stack_padding: f32,
    pub max_text_width: f32,
}

impl Default for DoubleBubbleConfig {
    fn default() -> Self {
        Self {
            min_topic_radius: 55.0,
            min_node_radius: 28.0,
            text_padding: 8.0,
            topic_gap: 340.0,
            column_offset: 170.0,
            stack_padding: 14.0,
            max_text_width: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiFlowConfig {
    pub event_padding: f32,
    pub node_padding: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    /// Horizontal offset of the cause/effect columns from the event center.
    pub column_offset: f32,
    pub stack_padding: f32,
    /// Vertical inset on the event edges before slotting arrow endpoints.
    pub slot_margin: f32,
    pub max_text_width: f32,
}

impl Default for MultiFlowConfig {
    fn default() -> Self {
        Self {
            event_padding: 16.0,
            node_padding: 10.0,
            min_node_width: 110.0,
            min_node_height: 44.0,
            column_offset: 260.0,
            stack_padding: 18.0,
            slot_margin: 12.0,
            max_text_width: 140.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub min_section_width: f32,
    pub text_padding: f32,
    /// Vertical distance from the main line to node centers.
    pub pair_gap: f32,
    pub triangle_size: f32,
    pub separator_label: String,
    pub line_stroke_width: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            min_section_width: 120.0,
            text_padding: 10.0,
            pair_gap: 42.0,
            triangle_size: 14.0,
            separator_label: "as".to_string(),
            line_stroke_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub node_padding: f32,
    pub min_step_width: f32,
    pub min_step_height: f32,
    /// Base gap between consecutive steps; grows when substeps overhang.
    pub step_gap: f32,
    /// Gap between a step and its substep column.
    pub substep_offset: f32,
    pub substep_gap: f32,
    pub substep_padding: f32,
    pub title_gap: f32,
    pub stroke_width: f32,
    pub max_text_width: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            node_padding: 12.0,
            min_step_width: 120.0,
            min_step_height: 44.0,
            step_gap: 46.0,
            substep_offset: 60.0,
            substep_gap: 12.0,
            substep_padding: 8.0,
            title_gap: 36.0,
            stroke_width: 2.0,
            max_text_width: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowchartConfig {
    pub node_padding: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    pub step_gap: f32,
    /// Extra width multiplier for decision diamonds so text fits the inset.
    pub diamond_scale: f32,
    pub max_text_width: f32,
}

impl Default for FlowchartConfig {
    fn default() -> Self {
        Self {
            node_padding: 12.0,
            min_node_width: 120.0,
            min_node_height: 44.0,
            step_gap: 52.0,
            diamond_scale: 1.6,
            max_text_width: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MindmapConfig {
    pub rect_padding: f32,
    pub min_topic_radius: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    pub max_text_width: f32,
    /// Text prefix marking the reserved agent branch that is never drawn.
    pub reserved_branch_marker: String,
}

impl Default for MindmapConfig {
    fn default() -> Self {
        Self {
            rect_padding: 10.0,
            min_topic_radius: 50.0,
            min_node_width: 80.0,
            min_node_height: 36.0,
            max_text_width: 160.0,
            reserved_branch_marker: "Additional Aspect".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub node_padding: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    pub branch_gap: f32,
    pub level_gap: f32,
    pub child_gap: f32,
    pub max_text_width: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            node_padding: 10.0,
            min_node_width: 90.0,
            min_node_height: 38.0,
            branch_gap: 40.0,
            level_gap: 60.0,
            child_gap: 14.0,
            max_text_width: 130.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BraceConfig {
    pub node_padding: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    pub column_gap: f32,
    pub part_gap: f32,
    pub subpart_gap: f32,
    pub max_text_width: f32,
}

impl Default for BraceConfig {
    fn default() -> Self {
        Self {
            node_padding: 10.0,
            min_node_width: 90.0,
            min_node_height: 36.0,
            column_gap: 70.0,
            part_gap: 26.0,
            subpart_gap: 10.0,
            max_text_width: 130.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptConfig {
    pub bubble: BubbleConfig,
    pub relationship_font_size: f32,
}

impl Default for ConceptConfig {
    fn default() -> Self {
        Self {
            bubble: BubbleConfig {
                max_text_width: 120.0,
                ..BubbleConfig::default()
            },
            relationship_font_size: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub label_line_height: f32,
    /// Skip real font metrics for ASCII text; useful in tests and benches.
    pub fast_text_metrics: bool,
    pub bubble: BubbleConfig,
    pub circle: CircleConfig,
    pub double_bubble: DoubleBubbleConfig,
    pub multi_flow: MultiFlowConfig,
    pub bridge: BridgeConfig,
    pub flow: FlowConfig,
    pub flowchart: FlowchartConfig,
    pub mindmap: MindmapConfig,
    pub tree: TreeConfig,
    pub brace: BraceConfig,
    pub concept: ConceptConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_line_height: 1.25,
            fast_text_metrics: false,
            bubble: BubbleConfig::default(),
            circle: CircleConfig::default(),
            double_bubble: DoubleBubbleConfig::default(),
            multi_flow: MultiFlowConfig::default(),
            bridge: BridgeConfig::default(),
            flow: FlowConfig::default(),
            flowchart: FlowchartConfig::default(),
            mindmap: MindmapConfig::default(),
            tree: TreeConfig::default(),
            brace: BraceConfig::default(),
            concept: ConceptConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Negative repels, as in the usual charge convention.
    pub charge_strength: f32,
    pub collide_padding: f32,
    pub center_strength: f32,
    pub target_strength: f32,
    /// Fraction of velocity removed per tick.
    pub velocity_decay: f32,
    pub alpha_decay: f32,
    pub alpha_stop: f32,
    pub max_settle_ticks: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            charge_strength: -120.0,
            collide_padding: 4.0,
            center_strength: 0.02,
            target_strength: 0.12,
            velocity_decay: 0.4,
            alpha_decay: 0.08,
            alpha_stop: 0.01,
            max_settle_ticks: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Hold duration before a pointer-down arms into a drag.
    pub hold_ms: u64,
    /// Pointer travel that cancels the hold gesture.
    pub move_threshold_px: f32,
    pub clone_opacity: f32,
    pub source_opacity: f32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            hold_ms: 1000,
            move_threshold_px: 10.0,
            clone_opacity: 0.6,
            source_opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub wheel_zoom_factor: f32,
    /// Fit padding as a fraction of the smaller content dimension.
    pub fit_padding_ratio: f32,
    pub export_padding: f32,
    /// Refit when the visible area drops below this fraction of the
    /// content extent.
    pub autofit_threshold: f32,
    pub resize_debounce_ms: u64,
    pub properties_panel_width: f32,
    pub think_panel_width: f32,
    pub assistant_panel_width: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.1,
            zoom_max: 10.0,
            wheel_zoom_factor: 1.1,
            fit_padding_ratio: 0.10,
            export_padding: 20.0,
            autofit_threshold: 0.9,
            resize_debounce_ms: 150,
            properties_panel_width: 320.0,
            think_panel_width: 400.0,
            assistant_panel_width: 450.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub font_family: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Theme token overrides applied on top of the per-type defaults.
    pub theme: BTreeMap<String, TokenValue>,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub sim: SimConfig,
    pub drag: DragConfig,
    pub viewport: ViewportConfig,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config: Config = json5::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.viewport.zoom_min < config.viewport.zoom_max);
        assert!(config.sim.alpha_stop > 0.0 && config.sim.alpha_stop < 1.0);
        assert!(config.drag.hold_ms > 0);
    }

    #[test]
    fn partial_config_merges_over_defaults() {
        let config: Config =
            json5::from_str(r#"{ layout: { bubble: { min_node_radius: 12 } } }"#).unwrap();
        assert_eq!(config.layout.bubble.min_node_radius, 12.0);
        // untouched sections keep their defaults
        assert_eq!(
            config.layout.flow.step_gap,
            LayoutConfig::default().flow.step_gap
        );
    }
}
