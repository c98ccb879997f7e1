use std::path::Path;

use thinkmap_renderer::config::Config;
use thinkmap_renderer::events::EventBus;
use thinkmap_renderer::layout::types::Layout;
use thinkmap_renderer::render::Renderer;
use thinkmap_renderer::spec::Spec;

fn test_config() -> Config {
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    config
}

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.contains("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.contains("</svg>"), "{fixture}: missing </svg tag");
}

fn render_fixture(path: &Path) -> (String, Layout) {
    let input = std::fs::read_to_string(path).expect("fixture read failed");
    let mut spec = Spec::from_json(&input).expect("parse failed");
    let mut renderer = Renderer::new(test_config());
    let mut bus = EventBus::new();
    let output = renderer.render(&mut spec, &mut bus).expect("render failed");
    (output.svg, output.layout)
}

fn fixture_path(rel: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel)
}

#[test]
fn render_all_fixtures() {
    // Keep this list explicit so new diagram types must be added intentionally.
    let candidates = [
        "bubble_map.json",
        "circle_map.json",
        "double_bubble_map.json",
        "multi_flow_map.json",
        "bridge_map.json",
        "flow_map.json",
        "flowchart.json",
        "mindmap.json",
        "tree_map.json",
        "brace_map.json",
        "concept_map.json",
    ];

    for rel in candidates {
        let path = fixture_path(rel);
        assert!(path.exists(), "fixture missing: {}", rel);
        let (svg, layout) = render_fixture(&path);
        assert_valid_svg(&svg, rel);
        assert!(!layout.nodes.is_empty(), "{rel}: no nodes laid out");
        assert!(
            layout.bounds.width() > 0.0 && layout.bounds.height() > 0.0,
            "{rel}: degenerate bounds"
        );
    }
}

#[test]
fn no_fixture_produces_overlapping_siblings() {
    // Circle-shaped peers must not intersect in any radial diagram.
    for rel in ["bubble_map.json", "circle_map.json", "double_bubble_map.json"] {
        let (_, layout) = render_fixture(&fixture_path(rel));
        let circles: Vec<_> = layout
            .nodes
            .iter()
            .filter_map(|n| match n.shape {
                thinkmap_renderer::layout::types::Shape::Circle { cx, cy, r } => {
                    Some((n.node_id.clone(), cx, cy, r))
                }
                _ => None,
            })
            .collect();
        for (i, a) in circles.iter().enumerate() {
            for b in circles.iter().skip(i + 1) {
                let dist = ((a.1 - b.1).powi(2) + (a.2 - b.2).powi(2)).sqrt();
                assert!(
                    dist + 0.5 >= a.3 + b.3 || dist < 1.0,
                    "{rel}: {} and {} overlap (dist {dist:.1}, radii {:.1}+{:.1})",
                    a.0,
                    b.0,
                    a.3,
                    b.3
                );
            }
        }
    }
}

#[test]
fn bubble_fixture_places_attributes_on_one_ring() {
    let (_, layout) = render_fixture(&fixture_path("bubble_map.json"));
    let mut radii = Vec::new();
    for node in &layout.nodes {
        if node.node_id.starts_with("attribute_") {
            let c = node.shape.center();
            radii.push((c.x * c.x + c.y * c.y).sqrt());
        }
    }
    assert_eq!(radii.len(), 6);
    for r in &radii {
        assert!((r - radii[0]).abs() < 0.5, "uneven ring: {radii:?}");
    }
}

#[test]
fn multi_flow_fixture_keeps_causes_left_of_effects() {
    let (_, layout) = render_fixture(&fixture_path("multi_flow_map.json"));
    let event_x = layout.node("multi-flow-event").unwrap().shape.center().x;
    for node in &layout.nodes {
        if node.node_id.starts_with("multi-flow-cause-") {
            assert!(node.shape.center().x < event_x);
        }
        if node.node_id.starts_with("multi-flow-effect-") {
            assert!(node.shape.center().x > event_x);
        }
    }
}

#[test]
fn bridge_fixture_renders_separators_between_pairs() {
    let (svg, layout) = render_fixture(&fixture_path("bridge_map.json"));
    // 4 pairs, 8 nodes, separators live in the decoration list
    assert_eq!(
        layout
            .nodes
            .iter()
            .filter(|n| n.node_id.starts_with("bridge-"))
            .count(),
        8
    );
    assert!(svg.contains("<polygon"));
    assert!(svg.contains(">as<"));
    assert!(svg.contains("part to whole"));
}

#[test]
fn flow_fixture_orders_steps_down_the_page() {
    let (_, layout) = render_fixture(&fixture_path("flow_map.json"));
    let mut prev = f32::NEG_INFINITY;
    for i in 0..4 {
        let y = layout
            .node(&format!("flow-step-{i}"))
            .unwrap()
            .shape
            .center()
            .y;
        assert!(y > prev, "step {i} out of order");
        prev = y;
    }
    // substeps hang off to the side of their step
    let step1_x = layout.node("flow-step-1").unwrap().shape.center().x;
    let sub_x = layout.node("flow-substep-1-0").unwrap().shape.center().x;
    assert!(sub_x > step1_x);
}

#[test]
fn mindmap_fixture_hides_the_reserved_branch() {
    let (svg, layout) = render_fixture(&fixture_path("mindmap.json"));
    assert!(layout.node("b2").is_none());
    assert!(layout.node("c4").is_none());
    assert!(!svg.contains("Additional Aspect"));
    assert!(!svg.contains("Placeholder"));
    assert!(svg.contains("Vegetables"));
}

#[test]
fn concept_fixture_resolves_text_references() {
    let (svg, layout) = render_fixture(&fixture_path("concept_map.json"));
    assert!(layout
        .connections
        .iter()
        .any(|c| c.from == "topic_center" && c.label.as_deref() == Some("freezes into")));
    // concept-to-concept links resolve too
    assert!(layout
        .connections
        .iter()
        .any(|c| c.from.starts_with("concept_") && c.to.starts_with("concept_")));
    assert!(svg.contains("condenses into"));
}

#[test]
fn custom_positions_survive_a_render_round_trip() {
    let input = std::fs::read_to_string(fixture_path("bubble_map.json")).unwrap();
    let mut spec = Spec::from_json(&input).unwrap();
    spec.custom_positions.insert(
        "attribute_0".into(),
        thinkmap_renderer::spec::Point { x: 150.0, y: -40.0 },
    );
    // one stored position out of six: partial, so the renderer writes even
    // defaults back for the whole family
    let mut renderer = Renderer::new(test_config());
    let mut bus = EventBus::new();
    let output = renderer.render(&mut spec, &mut bus).unwrap();
    assert_eq!(spec.custom_positions.len(), 6);
    assert!(output.layout.node("attribute_0").is_some());

    // all-custom now: a second render honors every position verbatim
    let stored = spec.custom_positions.clone();
    let output = renderer.render(&mut spec, &mut bus).unwrap();
    for (id, p) in &stored {
        let c = output.layout.node(id).unwrap().shape.center();
        assert!((c.x - p.x).abs() < 1e-3 && (c.y - p.y).abs() < 1e-3);
    }
}

#[test]
fn serializing_a_rendered_spec_is_stable() {
    for rel in ["tree_map.json", "bridge_map.json", "flowchart.json"] {
        let input = std::fs::read_to_string(fixture_path(rel)).unwrap();
        let mut spec = Spec::from_json(&input).unwrap();
        let mut renderer = Renderer::new(test_config());
        let mut bus = EventBus::new();
        renderer.render(&mut spec, &mut bus).unwrap();
        let json = spec.to_json().unwrap();
        let mut reparsed = Spec::from_json(&json).unwrap();
        let again = renderer.render(&mut reparsed, &mut bus).unwrap();
        assert_valid_svg(&again.svg, rel);
    }
}
