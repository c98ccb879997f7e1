//! Per-render drag session state.
//!
//! Each render of a draggable diagram produces one [`SessionHandle`] carried
//! on the [`Layout`](crate::layout::Layout). The drag controller receives it
//! explicitly; there is no process-wide simulation state.

use crate::sim::{Particle, RingBounds};
use crate::spec::{DiagramType, NodeKind, Point};

use crate::layout::types::Shape;

/// Domain constraint the drag runs under.
#[derive(Debug, Clone, PartialEq)]
pub enum DragDomain {
    /// Peripherals confined to an annulus around the topic (circle/bubble).
    Ring(RingBounds),
    /// Peripherals locked to vertical columns (double-bubble, multi-flow).
    /// Column x positions are also stored per particle.
    Columns(Vec<f32>),
    /// Horizontal-only movement on fixed rows (bridge map).
    Horizontal,
    /// Unconstrained movement with exact position commit (concept map) or
    /// hierarchical clone dragging (mind/tree/brace/flow maps).
    Free,
}

/// One hit-testable node of the rendered diagram. Kept separate from the
/// particle list because non-draggable nodes (topic, event, boundary) still
/// participate in hit testing and drop-target raycasts.
#[derive(Debug, Clone)]
pub struct SessionNode {
    pub node_id: String,
    pub kind: NodeKind,
    pub shape: Shape,
}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub diagram_type: DiagramType,
    pub center: Point,
    pub domain: DragDomain,
    /// Draggable peripherals, seeded at their rendered positions.
    pub particles: Vec<Particle>,
    pub nodes: Vec<SessionNode>,
}

impl SessionHandle {
    /// Topmost node under the pointer. Later nodes draw above earlier ones,
    /// so the scan runs back to front.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&SessionNode> {
        self.nodes.iter().rev().find(|n| n.shape.contains(x, y))
    }

    /// Ring bounds when the domain is a ring.
    pub fn ring(&self) -> Option<RingBounds> {
        match self.domain {
            DragDomain::Ring(ring) => Some(ring),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_test_prefers_the_topmost_node() {
        let handle = SessionHandle {
            diagram_type: DiagramType::BubbleMap,
            center: Point { x: 0.0, y: 0.0 },
            domain: DragDomain::Free,
            particles: Vec::new(),
            nodes: vec![
                SessionNode {
                    node_id: "topic_center".into(),
                    kind: NodeKind::Topic,
                    shape: Shape::Circle {
                        cx: 0.0,
                        cy: 0.0,
                        r: 100.0,
                    },
                },
                SessionNode {
                    node_id: "attribute_0".into(),
                    kind: NodeKind::Attribute,
                    shape: Shape::Circle {
                        cx: 0.0,
                        cy: 0.0,
                        r: 30.0,
                    },
                },
            ],
        };
        assert_eq!(handle.hit_test(0.0, 0.0).unwrap().node_id, "attribute_0");
        assert_eq!(handle.hit_test(0.0, 80.0).unwrap().node_id, "topic_center");
        assert!(handle.hit_test(0.0, 500.0).is_none());
    }
}
