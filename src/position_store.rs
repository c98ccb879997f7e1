//! Sole reader/writer of the `_customPositions` side channel.
//!
//! Layouts, the drag controller and the editing operations all go through
//! these functions; nothing else touches the map. Stale entries for ids that
//! no longer exist are ignored, not deleted, until a family-wide
//! redistribution replaces them.

use log::debug;

use crate::spec::{Family, Point, Spec};

/// Custom-position coverage of one node family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionClass {
    /// No member has a stored position; the default layout applies.
    None,
    /// Every member has a stored position; use them verbatim.
    AllCustom,
    /// Mixed coverage: siblings were added after a manual placement.
    PartialCustom,
}

pub fn get_position(spec: &Spec, node_id: &str) -> Option<Point> {
    spec.custom_positions.get(node_id).copied()
}

pub fn put_position(spec: &mut Spec, node_id: &str, x: f32, y: f32) {
    spec.custom_positions
        .insert(node_id.to_string(), Point { x, y });
}

pub fn remove_position(spec: &mut Spec, node_id: &str) {
    spec.custom_positions.remove(node_id);
}

/// Drop every stored position belonging to `family`.
pub fn clear_family(spec: &mut Spec, family: Family) {
    spec.custom_positions
        .retain(|node_id, _| !family.matches(node_id));
}

pub fn classify(spec: &Spec, family: Family) -> PositionClass {
    let ids = family.ids(spec);
    if ids.is_empty() {
        return PositionClass::None;
    }
    let stored = ids
        .iter()
        .filter(|id| spec.custom_positions.contains_key(*id))
        .count();
    if stored == 0 {
        PositionClass::None
    } else if stored == ids.len() {
        PositionClass::AllCustom
    } else {
        PositionClass::PartialCustom
    }
}

/// Replace the family's stored positions with freshly computed ones.
///
/// Runs when [`classify`] reports `PartialCustom`: manual spacing cannot
/// absorb new siblings, so the whole family snaps back to an even layout
/// and the next render sees `AllCustom`.
pub fn even_redistribute<F>(spec: &mut Spec, family: Family, mut default_position: F)
where
    F: FnMut(&str) -> Point,
{
    clear_family(spec, family);
    let ids = family.ids(spec);
    debug!(
        "even redistribute: family {:?} over {} nodes",
        family,
        ids.len()
    );
    for id in ids {
        let p = default_position(&id);
        spec.custom_positions.insert(id, p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SpecBody;

    fn bubble(attrs: &[&str]) -> Spec {
        serde_json::from_value(serde_json::json!({
            "type": "bubble_map",
            "topic": "T",
            "attributes": attrs,
        }))
        .unwrap()
    }

    #[test]
    fn classify_tracks_coverage() {
        let mut spec = bubble(&["a", "b", "c"]);
        assert_eq!(classify(&spec, Family::Attributes), PositionClass::None);

        put_position(&mut spec, "attribute_0", 1.0, 2.0);
        assert_eq!(
            classify(&spec, Family::Attributes),
            PositionClass::PartialCustom
        );

        put_position(&mut spec, "attribute_1", 3.0, 4.0);
        put_position(&mut spec, "attribute_2", 5.0, 6.0);
        assert_eq!(
            classify(&spec, Family::Attributes),
            PositionClass::AllCustom
        );
    }

    #[test]
    fn empty_family_classifies_none() {
        let spec = bubble(&[]);
        assert_eq!(classify(&spec, Family::Attributes), PositionClass::None);
    }

    #[test]
    fn stale_entries_do_not_affect_classification() {
        let mut spec = bubble(&["a"]);
        // left over from a render when the family had more members
        put_position(&mut spec, "attribute_7", 0.0, 0.0);
        assert_eq!(classify(&spec, Family::Attributes), PositionClass::None);
    }

    #[test]
    fn redistribute_replaces_exactly_the_family() {
        let mut spec = bubble(&["a", "b"]);
        put_position(&mut spec, "attribute_0", 99.0, 99.0);
        put_position(&mut spec, "topic_center", 1.0, 1.0);

        even_redistribute(&mut spec, Family::Attributes, |id| {
            let i = Family::Attributes.index_of(id).unwrap() as f32;
            Point { x: i * 10.0, y: 0.0 }
        });

        assert_eq!(
            get_position(&spec, "attribute_0"),
            Some(Point { x: 0.0, y: 0.0 })
        );
        assert_eq!(
            get_position(&spec, "attribute_1"),
            Some(Point { x: 10.0, y: 0.0 })
        );
        // unrelated entries survive
        assert_eq!(
            get_position(&spec, "topic_center"),
            Some(Point { x: 1.0, y: 1.0 })
        );
        assert_eq!(
            classify(&spec, Family::Attributes),
            PositionClass::AllCustom
        );
    }

    #[test]
    fn redistribute_covers_both_bridge_sides() {
        let mut spec: Spec = serde_json::from_value(serde_json::json!({
            "type": "bridge_map",
            "analogies": [
                {"left": "wheel", "right": "car"},
                {"left": "wing", "right": "plane"},
            ],
        }))
        .unwrap();
        assert!(matches!(spec.body, SpecBody::BridgeMap { .. }));
        even_redistribute(&mut spec, Family::BridgePairs, |_| Point { x: 0.0, y: 0.0 });
        assert_eq!(spec.custom_positions.len(), 4);
        assert!(spec.custom_positions.contains_key("bridge-left-1"));
        assert!(spec.custom_positions.contains_key("bridge-right-1"));
    }
}
