use thinkmap_renderer::config::Config;
use thinkmap_renderer::drag::{DragController, DragPhase};
use thinkmap_renderer::events::{EngineEvent, EventBus};
use thinkmap_renderer::ops;
use thinkmap_renderer::render::Renderer;
use thinkmap_renderer::spec::{Family, Orientation, Spec, SpecBody};
use thinkmap_renderer::viewport::{Panel, ViewportManager};

fn test_config() -> Config {
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    config
}

fn spec_of(json: serde_json::Value) -> Spec {
    serde_json::from_value(json).expect("spec parse failed")
}

fn render(spec: &mut Spec) -> thinkmap_renderer::render::RenderOutput {
    let mut renderer = Renderer::new(test_config());
    let mut bus = EventBus::new();
    renderer.render(spec, &mut bus).expect("render failed")
}

#[test]
fn flip_orientation_mirrors_the_flow_axis() {
    let mut spec = spec_of(serde_json::json!({
        "type": "flow_map",
        "title": "Cook Rice",
        "steps": ["one", "two", "three"],
    }));
    let before = render(&mut spec).layout;
    let b0 = before.node("flow-step-0").unwrap().shape.center();
    let b1 = before.node("flow-step-1").unwrap().shape.center();
    assert!(b1.y > b0.y, "default orientation is vertical");

    let mut bus = EventBus::new();
    ops::flip_orientation(&mut spec, &mut bus).unwrap();
    match &spec.body {
        SpecBody::FlowMap { orientation, .. } => {
            assert_eq!(*orientation, Orientation::Horizontal)
        }
        _ => unreachable!(),
    }
    let names: Vec<&str> = bus.drain().iter().map(|e| e.name()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "view:orientation_flipped",
            "diagram:operation_completed",
            "diagram:spec_updated",
        ]
    );

    let after = render(&mut spec).layout;
    let a0 = after.node("flow-step-0").unwrap().shape.center();
    let a1 = after.node("flow-step-1").unwrap().shape.center();
    assert!(a1.x > a0.x, "flipped orientation runs left to right");
    assert!((a1.y - a0.y).abs() < 1e-3);

    // the title follows the flip and stays above the first step
    let title_y = after
        .decorations
        .iter()
        .find_map(|d| match d {
            thinkmap_renderer::layout::types::Primitive::Text { y, text, .. }
                if text == "Cook Rice" =>
            {
                Some(*y)
            }
            _ => None,
        })
        .expect("title drawn");
    let first_top = after.node("flow-step-0").unwrap().shape.bounds().min_y;
    assert!(title_y < first_top, "title must stay above the first step");
}

#[test]
fn add_and_remove_family_items_renumber_side_channels() {
    let mut spec = spec_of(serde_json::json!({
        "type": "bubble_map",
        "topic": "T",
        "attributes": ["a", "b", "c"],
        "_customPositions": {
            "attribute_0": {"x": 0.0, "y": -100.0},
            "attribute_1": {"x": 90.0, "y": 40.0},
            "attribute_2": {"x": -90.0, "y": 40.0}
        },
    }));
    let mut bus = EventBus::new();

    ops::remove_family_item(&mut spec, Family::Attributes, 1, &mut bus).unwrap();
    match &spec.body {
        SpecBody::BubbleMap { attributes, .. } => {
            assert_eq!(attributes.len(), 2);
            assert_eq!(attributes[1].text, "c");
        }
        _ => unreachable!(),
    }
    // the removed slot's position is gone and the one above it slid down
    assert!(!spec.custom_positions.contains_key("attribute_2"));
    assert_eq!(spec.custom_positions["attribute_1"].x, -90.0);

    ops::add_family_item(&mut spec, Family::Attributes, "d", &mut bus).unwrap();
    match &spec.body {
        SpecBody::BubbleMap { attributes, .. } => assert_eq!(attributes.len(), 3),
        _ => unreachable!(),
    }

    let names: Vec<&str> = bus.drain().iter().map(|e| e.name()).collect::<Vec<_>>();
    assert_eq!(
        names
            .iter()
            .filter(|n| **n == "diagram:operation_completed")
            .count(),
        2
    );
}

#[test]
fn emptying_a_node_keeps_its_footprint() {
    let mut spec = spec_of(serde_json::json!({
        "type": "bubble_map",
        "topic": "Ocean",
        "attributes": ["deep blue sea", "x"],
    }));
    let before = render(&mut spec).layout;
    let r_before = match before.node("attribute_0").unwrap().shape {
        thinkmap_renderer::layout::types::Shape::Circle { r, .. } => r,
        _ => unreachable!(),
    };

    let mut bus = EventBus::new();
    ops::edit_node_text(
        &mut spec,
        "attribute_0",
        "",
        Some(thinkmap_renderer::spec::NodeDimensions::Radius { r: r_before }),
        &mut bus,
    )
    .unwrap();

    let after = render(&mut spec).layout;
    let r_after = match after.node("attribute_0").unwrap().shape {
        thinkmap_renderer::layout::types::Shape::Circle { r, .. } => r,
        _ => unreachable!(),
    };
    assert!((r_after - r_before).abs() < 1e-3, "emptied node shrank");
}

#[test]
fn bubble_drag_round_trip_changes_only_side_channels() {
    let mut spec = spec_of(serde_json::json!({
        "type": "bubble_map",
        "topic": "T",
        "attributes": ["a", "b", "c", "d", "e"],
    }));
    let output = render(&mut spec);
    let session = output.layout.session.expect("bubble map is draggable");
    let order_before: Vec<String> = match &spec.body {
        SpecBody::BubbleMap { attributes, .. } => {
            attributes.iter().map(|a| a.text.clone()).collect()
        }
        _ => unreachable!(),
    };

    // press, hold, release in place: the order must not change
    let mut ctl = DragController::new(
        test_config().drag,
        test_config().sim,
    );
    let mut bus = EventBus::new();
    let p = session.particles[2].clone();
    ctl.pointer_down(&session, p.x, p.y, 0);
    ctl.poll(&session, 2000, &mut bus);
    assert_eq!(ctl.phase(), DragPhase::DraggingFreeForm);
    ctl.pointer_up(&mut spec, &session, p.x, p.y, &mut bus);

    let order_after: Vec<String> = match &spec.body {
        SpecBody::BubbleMap { attributes, .. } => {
            attributes.iter().map(|a| a.text.clone()).collect()
        }
        _ => unreachable!(),
    };
    assert_eq!(order_before, order_after);

    // positions were committed evenly; the next render matches them
    assert_eq!(spec.custom_positions.len(), 5);
    let stored = spec.custom_positions.clone();
    let relayout = render(&mut spec).layout;
    for (id, p) in &stored {
        let c = relayout.node(id).unwrap().shape.center();
        assert!(
            (c.x - p.x).abs() < 1.0 && (c.y - p.y).abs() < 1.0,
            "{id} moved visibly after a no-op drag"
        );
    }
}

#[test]
fn flow_step_drop_reorders_steps() {
    let mut spec = spec_of(serde_json::json!({
        "type": "flow_map",
        "steps": ["first", "second", "third"],
    }));
    let output = render(&mut spec);
    let session = output.layout.session.unwrap();
    let src = session
        .nodes
        .iter()
        .find(|n| n.node_id == "flow-step-0")
        .unwrap()
        .shape
        .center();
    let dst = session
        .nodes
        .iter()
        .find(|n| n.node_id == "flow-step-2")
        .unwrap()
        .shape
        .center();

    let mut ctl = DragController::new(test_config().drag, test_config().sim);
    let mut bus = EventBus::new();
    ctl.pointer_down(&session, src.x, src.y, 0);
    ctl.poll(&session, 2000, &mut bus);
    assert_eq!(ctl.phase(), DragPhase::DraggingHierarchical);
    ctl.pointer_move(&session, dst.x, dst.y, &mut bus);
    ctl.pointer_up(&mut spec, &session, dst.x, dst.y, &mut bus);

    match &spec.body {
        SpecBody::FlowMap { steps, .. } => {
            let texts: Vec<&str> = steps.iter().map(|s| s.text.text.as_str()).collect();
            assert_eq!(texts, vec!["second", "third", "first"]);
        }
        _ => unreachable!(),
    }
}

#[test]
fn operation_snapshot_restores_the_previous_spec() {
    let mut spec = spec_of(serde_json::json!({
        "type": "tree_map",
        "topic": "T",
        "children": [
            {"text": "A", "children": ["a1"]},
            {"text": "B", "children": []},
        ],
    }));
    let mut bus = EventBus::new();
    ops::move_branch(&mut spec, 0, 1, &mut bus).unwrap();

    let snapshot = bus
        .drain()
        .into_iter()
        .find_map(|e| match e {
            EngineEvent::OperationCompleted { snapshot, .. } => Some(snapshot),
            _ => None,
        })
        .expect("operation event carries a snapshot");

    // the snapshot is the pre-operation document: applying it undoes the move
    match &snapshot.body {
        SpecBody::TreeMap { children, .. } => assert_eq!(children[0].text.text, "A"),
        _ => unreachable!(),
    }
    match &spec.body {
        SpecBody::TreeMap { children, .. } => assert_eq!(children[0].text.text, "B"),
        _ => unreachable!(),
    }
}

#[test]
fn panel_fit_reserves_the_strip_and_resize_refits() {
    let mut spec = spec_of(serde_json::json!({
        "type": "circle_map",
        "topic": "T",
        "context": ["a", "b", "c"],
    }));
    let output = render(&mut spec);
    let config = test_config();
    let mut viewport = ViewportManager::new(config.viewport.clone(), 1200.0, 800.0);
    let mut bus = EventBus::new();

    viewport.fit_to_full_canvas(&output.layout.bounds, &mut bus);
    let full = viewport.view_box();

    viewport.open_panel(Panel::Assistant);
    viewport.fit_to_canvas_with_panel(&output.layout.bounds, &mut bus);
    let panel = viewport.view_box();
    assert!(panel.w > full.w, "panel fit must widen the viewBox");

    // resize while the panel is open: the debounced refit keeps panel mode
    bus.drain();
    viewport.window_resized(900.0, 700.0, 10_000);
    viewport.poll(&output.layout.bounds, 10_200, &mut bus);
    let events = bus.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        EngineEvent::ViewFitted {
            mode: thinkmap_renderer::events::FitMode::Panel
        }
    ));
}

#[test]
fn zoom_events_track_direction_and_level() {
    let config = test_config();
    let mut viewport = ViewportManager::new(config.viewport, 800.0, 600.0);
    let mut bus = EventBus::new();
    viewport.wheel_zoom(-1.0, 0.0, 0.0, &mut bus);
    viewport.wheel_zoom(1.0, 0.0, 0.0, &mut bus);
    let events = bus.drain();
    match (&events[0], &events[1]) {
        (
            EngineEvent::ViewZoomed {
                direction: d1,
                level: l1,
            },
            EngineEvent::ViewZoomed {
                direction: d2,
                level: l2,
            },
        ) => {
            assert_eq!(*d1, thinkmap_renderer::events::ZoomDirection::In);
            assert_eq!(*d2, thinkmap_renderer::events::ZoomDirection::Out);
            assert!(*l1 > 1.0);
            assert!((l2 - 1.0).abs() < 1e-3);
        }
        _ => panic!("expected two zoom events"),
    }
}

#[test]
fn bridge_drag_moves_both_nodes_of_a_pair() {
    let mut spec = spec_of(serde_json::json!({
        "type": "bridge_map",
        "analogies": [
            {"left": "wheel", "right": "car"},
            {"left": "wing", "right": "bird"},
            {"left": "petal", "right": "flower"},
        ],
    }));
    let output = render(&mut spec);
    let session = output.layout.session.unwrap();
    let p = session
        .particles
        .iter()
        .find(|p| p.node_id == "bridge-left-2")
        .unwrap()
        .clone();
    let first_x = session
        .particles
        .iter()
        .find(|p| p.node_id == "bridge-left-0")
        .unwrap()
        .x;

    let mut ctl = DragController::new(test_config().drag, test_config().sim);
    let mut bus = EventBus::new();
    ctl.pointer_down(&session, p.x, p.y, 0);
    ctl.poll(&session, 2000, &mut bus);
    // drag the last pair left past the first
    for step in 0..20 {
        let t = step as f32 / 19.0;
        ctl.pointer_move(&session, p.x + t * (first_x - p.x - 80.0), p.y, &mut bus);
    }
    ctl.pointer_up(&mut spec, &session, first_x - 80.0, p.y, &mut bus);

    match &spec.body {
        SpecBody::BridgeMap { analogies, .. } => {
            assert_eq!(analogies[0].left.text, "petal");
            assert_eq!(analogies[0].right.text, "flower");
            assert_eq!(analogies[2].left.text, "wing");
        }
        _ => unreachable!(),
    }
}
