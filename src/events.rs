use std::collections::VecDeque;

use serde_json::Value;

use crate::spec::{DiagramType, NodeKind, Orientation, Spec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    Full,
    Panel,
    Export,
}

impl FitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Full => "full",
            FitMode::Panel => "panel",
            FitMode::Export => "export",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Hierarchical,
    FreeForm,
}

/// Engine-to-host notifications. The host drains the queue after every call
/// into the engine; a `SpecUpdated` drives a full re-render.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Rendered {
        diagram_type: DiagramType,
    },
    SpecUpdated {
        spec: Spec,
    },
    OperationCompleted {
        operation: String,
        snapshot: Spec,
        data: Value,
    },
    DragStarted {
        node_id: String,
        node_kind: NodeKind,
        diagram_type: DiagramType,
        drag_mode: DragMode,
    },
    DragEnded {
        node_id: String,
    },
    ViewZoomed {
        direction: ZoomDirection,
        level: f32,
    },
    ViewFitted {
        mode: FitMode,
    },
    OrientationFlipped {
        orientation: Orientation,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Rendered { .. } => "diagram:rendered",
            EngineEvent::SpecUpdated { .. } => "diagram:spec_updated",
            EngineEvent::OperationCompleted { .. } => "diagram:operation_completed",
            EngineEvent::DragStarted { .. } => "drag:started",
            EngineEvent::DragEnded { .. } => "drag:ended",
            EngineEvent::ViewZoomed { .. } => "view:zoomed",
            EngineEvent::ViewFitted { .. } => "view:fitted",
            EngineEvent::OrientationFlipped { .. } => "view:orientation_flipped",
        }
    }
}

/// Single-threaded queued event bus. Everything runs on one cooperative
/// loop, so a plain queue is enough; no locks, no subscribers to re-enter.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: EngineEvent) {
        self.queue.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue_in_order() {
        let mut bus = EventBus::new();
        bus.emit(EngineEvent::DragEnded {
            node_id: "attribute_0".into(),
        });
        bus.emit(EngineEvent::ViewFitted {
            mode: FitMode::Full,
        });
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "drag:ended");
        assert_eq!(events[1].name(), "view:fitted");
        assert!(bus.is_empty());
    }
}
