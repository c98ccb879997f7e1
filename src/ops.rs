//! Diagram editing operations. Every operation either completes fully,
//! emitting `diagram:operation_completed` with a pre-operation snapshot for
//! undo history followed by `diagram:spec_updated`, or fails without
//! touching the spec or the event bus.

use serde_json::json;

use crate::events::{EngineEvent, EventBus};
use crate::position_store;
use crate::spec::{
    self, Family, Item, NodeDimensions, Point, Spec, SpecBody, SpecError,
};

type OpResult = Result<(), SpecError>;

fn complete(
    bus: &mut EventBus,
    operation: &str,
    snapshot: Spec,
    spec: &Spec,
    data: serde_json::Value,
) {
    bus.emit(EngineEvent::OperationCompleted {
        operation: operation.to_string(),
        snapshot,
        data,
    });
    bus.emit(EngineEvent::SpecUpdated { spec: spec.clone() });
}

/// Toggle a flow map between vertical and horizontal.
pub fn flip_orientation(spec: &mut Spec, bus: &mut EventBus) -> OpResult {
    let snapshot = spec.clone();
    let orientation = match &mut spec.body {
        SpecBody::FlowMap { orientation, .. } => {
            *orientation = orientation.flipped();
            *orientation
        }
        _ => return Err(SpecError::WrongDiagramType(spec.diagram_type())),
    };
    bus.emit(EngineEvent::OrientationFlipped { orientation });
    complete(
        bus,
        "flip_orientation",
        snapshot,
        spec,
        json!({ "orientation": orientation.as_str() }),
    );
    Ok(())
}

/// Move a top-level unit (tree/brace branch, flow step, mind-map branch)
/// from one index to another.
pub fn move_branch(spec: &mut Spec, src: usize, dst: usize, bus: &mut EventBus) -> OpResult {
    let snapshot = spec.clone();
    let len = match &mut spec.body {
        SpecBody::TreeMap { children, .. } => reorder(children, src, dst)?,
        SpecBody::BraceMap { parts, .. } => reorder(parts, src, dst)?,
        SpecBody::FlowMap { steps, .. } => reorder(steps, src, dst)?,
        SpecBody::Mindmap { children, .. } => reorder(children, src, dst)?,
        _ => return Err(SpecError::WrongDiagramType(spec.diagram_type())),
    };
    let _ = len;
    complete(
        bus,
        "move_branch",
        snapshot,
        spec,
        json!({ "from": src, "to": dst }),
    );
    Ok(())
}

fn reorder<T>(items: &mut Vec<T>, src: usize, dst: usize) -> Result<usize, SpecError> {
    if src >= items.len() || dst >= items.len() {
        return Err(SpecError::UnknownReference {
            name: format!("index {}", src.max(dst)),
        });
    }
    let item = items.remove(src);
    items.insert(dst, item);
    Ok(items.len())
}

/// Reparent a leaf child from one branch to another (tree and brace maps).
pub fn move_child_to_branch(
    spec: &mut Spec,
    src_branch: usize,
    child: usize,
    dst_branch: usize,
    bus: &mut EventBus,
) -> OpResult {
    let snapshot = spec.clone();
    let branches = match &mut spec.body {
        SpecBody::TreeMap { children, .. } => children,
        SpecBody::BraceMap { parts, .. } => parts,
        _ => return Err(SpecError::WrongDiagramType(spec.diagram_type())),
    };
    if src_branch >= branches.len() || dst_branch >= branches.len() {
        return Err(SpecError::UnknownReference {
            name: format!("branch {}", src_branch.max(dst_branch)),
        });
    }
    if child >= branches[src_branch].children.len() {
        return Err(SpecError::UnknownReference {
            name: spec::child_id(src_branch, child),
        });
    }
    let item = branches[src_branch].children.remove(child);
    branches[dst_branch].children.push(item);
    complete(
        bus,
        "move_child_to_branch",
        snapshot,
        spec,
        json!({
            "from_branch": src_branch,
            "child": child,
            "to_branch": dst_branch,
        }),
    );
    Ok(())
}

/// Append an item to a flat family (attributes, context, similarities,
/// differences, causes, effects, concepts). New nodes get no custom
/// position, so a previously dragged family re-spreads on the next render.
pub fn add_family_item(
    spec: &mut Spec,
    family: Family,
    text: &str,
    bus: &mut EventBus,
) -> OpResult {
    let snapshot = spec.clone();
    let Some(items) = family.items_mut(spec) else {
        return Err(SpecError::WrongDiagramType(spec.diagram_type()));
    };
    items.push(Item::new(text));
    let index = items.len() - 1;
    complete(
        bus,
        "add_family_item",
        snapshot,
        spec,
        json!({ "node_id": family.id(index), "text": text }),
    );
    Ok(())
}

/// Remove a family item. Position and dimension entries for higher indices
/// shift down so surviving nodes keep their placements.
pub fn remove_family_item(
    spec: &mut Spec,
    family: Family,
    index: usize,
    bus: &mut EventBus,
) -> OpResult {
    let snapshot = spec.clone();
    {
        let Some(items) = family.items_mut(spec) else {
            return Err(SpecError::WrongDiagramType(spec.diagram_type()));
        };
        if index >= items.len() {
            return Err(SpecError::UnknownReference {
                name: family.id(index),
            });
        }
        items.remove(index);
    }
    shift_side_channels(spec, family, index);
    complete(
        bus,
        "remove_family_item",
        snapshot,
        spec,
        json!({ "node_id": family.id(index) }),
    );
    Ok(())
}

fn shift_side_channels(spec: &mut Spec, family: Family, removed: usize) {
    let positions = std::mem::take(&mut spec.custom_positions);
    spec.custom_positions = shift_map(positions, family, removed);
    let dimensions = std::mem::take(&mut spec.node_dimensions);
    spec.node_dimensions = shift_map(dimensions, family, removed);
}

fn shift_map<V>(
    map: std::collections::BTreeMap<String, V>,
    family: Family,
    removed: usize,
) -> std::collections::BTreeMap<String, V> {
    map.into_iter()
        .filter_map(|(key, value)| match family.index_of(&key) {
            Some(i) if i == removed => None,
            Some(i) if i > removed => Some((renumber(&key, i - 1), value)),
            _ => Some((key, value)),
        })
        .collect()
}

/// Rewrite the trailing index of a family id. Bridge ids keep their
/// left/right side.
fn renumber(node_id: &str, new_index: usize) -> String {
    match node_id.rfind(|c: char| c == '_' || c == '-') {
        Some(pos) => format!("{}{}{}", &node_id[..pos], &node_id[pos..=pos], new_index),
        None => node_id.to_string(),
    }
}

/// Replace a node's text, locating the item by its stable id. When the new
/// text is empty the node's current dimensions are preserved so it does not
/// collapse on the next render.
pub fn edit_node_text(
    spec: &mut Spec,
    node_id: &str,
    new_text: &str,
    current_dimensions: Option<NodeDimensions>,
    bus: &mut EventBus,
) -> OpResult {
    let snapshot = spec.clone();
    let slot = find_text_mut(spec, node_id).ok_or_else(|| SpecError::UnknownReference {
        name: node_id.to_string(),
    })?;
    *slot = new_text.to_string();
    if new_text.trim().is_empty() {
        if let Some(dims) = current_dimensions {
            spec.node_dimensions.insert(node_id.to_string(), dims);
        }
    }
    complete(
        bus,
        "edit_node_text",
        snapshot,
        spec,
        json!({ "node_id": node_id, "text": new_text }),
    );
    Ok(())
}

fn find_text_mut<'a>(spec: &'a mut Spec, node_id: &str) -> Option<&'a mut String> {
    if node_id == spec::topic_id() {
        return match &mut spec.body {
            SpecBody::CircleMap { topic, .. }
            | SpecBody::BubbleMap { topic, .. }
            | SpecBody::TreeMap { topic, .. }
            | SpecBody::BraceMap { topic, .. }
            | SpecBody::Mindmap { topic, .. }
            | SpecBody::ConceptMap { topic, .. } => Some(&mut topic.text),
            _ => None,
        };
    }
    if node_id == spec::topic_left_id() {
        return match &mut spec.body {
            SpecBody::DoubleBubbleMap { left, .. } => Some(&mut left.text),
            _ => None,
        };
    }
    if node_id == spec::topic_right_id() {
        return match &mut spec.body {
            SpecBody::DoubleBubbleMap { right, .. } => Some(&mut right.text),
            _ => None,
        };
    }
    if node_id == spec::event_id() {
        return match &mut spec.body {
            SpecBody::MultiFlowMap { event, .. } => Some(&mut event.text),
            _ => None,
        };
    }
    if let Some(family) = Family::of_node_id(node_id) {
        let index = family.index_of(node_id)?;
        if family == Family::BridgePairs {
            return match &mut spec.body {
                SpecBody::BridgeMap { analogies, .. } => {
                    let pair = analogies.get_mut(index)?;
                    Some(if node_id.starts_with("bridge-left-") {
                        &mut pair.left.text
                    } else {
                        &mut pair.right.text
                    })
                }
                _ => None,
            };
        }
        return family.items_mut(spec)?.get_mut(index).map(|i| &mut i.text);
    }
    if let Some(rest) = node_id.strip_prefix("flow-step-") {
        let i: usize = rest.parse().ok()?;
        return match &mut spec.body {
            SpecBody::FlowMap { steps, .. } => steps.get_mut(i).map(|s| &mut s.text.text),
            SpecBody::Flowchart { steps } => steps.get_mut(i).map(|s| &mut s.text.text),
            _ => None,
        };
    }
    if let Some(rest) = node_id.strip_prefix("flow-substep-") {
        let (i, j) = rest.split_once('-')?;
        let (i, j): (usize, usize) = (i.parse().ok()?, j.parse().ok()?);
        return match &mut spec.body {
            SpecBody::FlowMap { steps, .. } => steps
                .get_mut(i)?
                .substeps
                .get_mut(j)
                .map(|s| &mut s.text),
            _ => None,
        };
    }
    if let Some(rest) = node_id.strip_prefix("branch_") {
        let i: usize = rest.parse().ok()?;
        return match &mut spec.body {
            SpecBody::TreeMap { children, .. } => children.get_mut(i).map(|b| &mut b.text.text),
            SpecBody::BraceMap { parts, .. } => parts.get_mut(i).map(|b| &mut b.text.text),
            _ => None,
        };
    }
    if let Some(rest) = node_id.strip_prefix("child_") {
        let (i, j) = rest.split_once('_')?;
        let (i, j): (usize, usize) = (i.parse().ok()?, j.parse().ok()?);
        return match &mut spec.body {
            SpecBody::TreeMap { children, .. } => {
                children.get_mut(i)?.children.get_mut(j).map(|c| &mut c.text)
            }
            SpecBody::BraceMap { parts, .. } => {
                parts.get_mut(i)?.children.get_mut(j).map(|c| &mut c.text)
            }
            _ => None,
        };
    }
    None
}

/// Reorder a flat family's backing array by `order` (new order given as old
/// indices) and renumber stored positions to match. Used by free-form drag
/// commits so array index always tracks visual order.
pub(crate) fn commit_family_order(
    spec: &mut Spec,
    family: Family,
    order: &[usize],
    positions: &[Point],
) {
    if let Some(items) = family.items_mut(spec) {
        let reordered: Vec<Item> = order.iter().map(|&i| items[i].clone()).collect();
        *items = reordered;
    } else if family == Family::BridgePairs {
        if let SpecBody::BridgeMap { analogies, .. } = &mut spec.body {
            let reordered = order.iter().map(|&i| analogies[i].clone()).collect();
            *analogies = reordered;
        }
    }
    position_store::clear_family(spec, family);
    let ids = family.ids(spec);
    for (id, p) in ids.iter().zip(positions) {
        position_store::put_position(spec, id, p.x, p.y);
    }
}
