use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A declarative thinking-map diagram plus the persisted side channels.
///
/// The whole struct is the serialization unit: two specs with the same
/// user-visible content but different side channels render differently, so
/// `_customPositions` and friends round-trip through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Item>,

    #[serde(flatten)]
    pub body: SpecBody,

    /// User-committed node positions, keyed by stable node id.
    #[serde(
        rename = "_customPositions",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub custom_positions: BTreeMap<String, Point>,

    /// Preserved node sizes for nodes whose text has been emptied.
    #[serde(
        rename = "_node_dimensions",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub node_dimensions: BTreeMap<String, NodeDimensions>,

    /// Optional viewport-derived sizing hint.
    #[serde(
        rename = "_recommended_dimensions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recommended_dimensions: Option<RecommendedDimensions>,

    /// Per-spec theme token overrides, merged by the dispatcher.
    #[serde(rename = "_style", default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeDimensions {
    Rect { w: f32, h: f32 },
    Radius { r: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendedDimensions {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub padding: f32,
}

/// A text item in a spec array. Older specs store bare strings, newer ones
/// `{"text": …}` objects; both deserialize to the normalized form and the
/// normalized form is what gets written back.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Item {
    pub text: String,
}

impl Item {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object {
                text: String,
                #[serde(flatten)]
                _rest: BTreeMap<String, Value>,
            },
        }
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) | Raw::Object { text, .. } => Ok(Item { text }),
        }
    }
}

/// A branch with leaf children (tree map) or a part with subparts (brace map).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub text: Item,
    #[serde(default)]
    pub children: Vec<Item>,
}

/// Recursive mind-map node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindNode {
    pub text: Item,
    #[serde(default)]
    pub children: Vec<MindNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogyPair {
    pub left: Item,
    pub right: Item,
}

/// A flow-map step. Bare strings are accepted for steps with no substeps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowStep {
    pub text: Item,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub substeps: Vec<Item>,
}

impl<'de> Deserialize<'de> for FlowStep {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object {
                text: Item,
                #[serde(default)]
                substeps: Vec<Item>,
            },
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => FlowStep {
                text: Item::new(text),
                substeps: Vec::new(),
            },
            Raw::Object { text, substeps } => FlowStep { text, substeps },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowchartStepKind {
    Start,
    End,
    Decision,
    #[default]
    Process,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowchartStep {
    pub text: Item,
    #[serde(default)]
    pub kind: FlowchartStepKind,
}

impl<'de> Deserialize<'de> for FlowchartStep {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object {
                text: Item,
                #[serde(default)]
                kind: FlowchartStepKind,
            },
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => FlowchartStep {
                text: Item::new(text),
                kind: FlowchartStepKind::Process,
            },
            Raw::Object { text, kind } => FlowchartStep { text, kind },
        })
    }
}

/// Labeled link between two concept-map nodes, referenced by text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Vertical => Orientation::Horizontal,
            Orientation::Horizontal => Orientation::Vertical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
        }
    }
}

/// Positioned mind-map payload produced by an external positioning agent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentLayout {
    #[serde(default)]
    pub positions: BTreeMap<String, AgentNode>,
    #[serde(default)]
    pub connections: Vec<AgentConnection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNode {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConnection {
    pub from: AgentPoint,
    pub to: AgentPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentPoint {
    pub x: f32,
    pub y: f32,
}

/// Type-specific payload, tagged by `"type"` in the JSON form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpecBody {
    CircleMap {
        topic: Item,
        #[serde(default)]
        context: Vec<Item>,
    },
    BubbleMap {
        topic: Item,
        #[serde(default)]
        attributes: Vec<Item>,
    },
    DoubleBubbleMap {
        left: Item,
        right: Item,
        #[serde(default)]
        similarities: Vec<Item>,
        #[serde(default)]
        left_differences: Vec<Item>,
        #[serde(default)]
        right_differences: Vec<Item>,
    },
    TreeMap {
        topic: Item,
        #[serde(default)]
        children: Vec<Branch>,
    },
    BraceMap {
        topic: Item,
        #[serde(default)]
        parts: Vec<Branch>,
    },
    FlowMap {
        #[serde(default)]
        steps: Vec<FlowStep>,
        #[serde(default)]
        orientation: Orientation,
    },
    MultiFlowMap {
        event: Item,
        #[serde(default)]
        causes: Vec<Item>,
        #[serde(default)]
        effects: Vec<Item>,
    },
    BridgeMap {
        #[serde(default)]
        analogies: Vec<AnalogyPair>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimension: Option<Item>,
    },
    Mindmap {
        topic: Item,
        #[serde(default)]
        children: Vec<MindNode>,
        #[serde(rename = "_layout", default, skip_serializing_if = "Option::is_none")]
        layout: Option<AgentLayout>,
    },
    ConceptMap {
        topic: Item,
        #[serde(default)]
        concepts: Vec<Item>,
        #[serde(default)]
        relationships: Vec<Relationship>,
    },
    Flowchart {
        #[serde(default)]
        steps: Vec<FlowchartStep>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramType {
    CircleMap,
    BubbleMap,
    DoubleBubbleMap,
    TreeMap,
    BraceMap,
    FlowMap,
    MultiFlowMap,
    BridgeMap,
    Mindmap,
    ConceptMap,
    Flowchart,
}

impl DiagramType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagramType::CircleMap => "circle_map",
            DiagramType::BubbleMap => "bubble_map",
            DiagramType::DoubleBubbleMap => "double_bubble_map",
            DiagramType::TreeMap => "tree_map",
            DiagramType::BraceMap => "brace_map",
            DiagramType::FlowMap => "flow_map",
            DiagramType::MultiFlowMap => "multi_flow_map",
            DiagramType::BridgeMap => "bridge_map",
            DiagramType::Mindmap => "mindmap",
            DiagramType::ConceptMap => "concept_map",
            DiagramType::Flowchart => "flowchart",
        }
    }

    /// Diagrams whose nodes reparent on drag rather than float freely.
    pub fn uses_hierarchical_drag(self) -> bool {
        matches!(
            self,
            DiagramType::Mindmap
                | DiagramType::TreeMap
                | DiagramType::BraceMap
                | DiagramType::FlowMap
        )
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a positioned node. Part of the external interface because drag
/// eligibility and commit policy key off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Topic,
    TopicLeft,
    TopicRight,
    Boundary,
    Title,
    Attribute,
    Context,
    Similarity,
    LeftDiff,
    RightDiff,
    Event,
    Cause,
    Effect,
    BridgeLeft,
    BridgeRight,
    Dimension,
    FlowStep,
    FlowSubstep,
    Branch,
    Child,
    Concept,
}

impl NodeKind {
    /// Non-draggable kinds per diagram type: anchors, titles and the
    /// boundary ring never enter a drag.
    pub fn is_draggable(self, diagram_type: DiagramType) -> bool {
        match self {
            NodeKind::Topic | NodeKind::Title | NodeKind::Event | NodeKind::Dimension => false,
            NodeKind::Boundary => false,
            NodeKind::TopicLeft | NodeKind::TopicRight => {
                diagram_type != DiagramType::DoubleBubbleMap
            }
            _ => true,
        }
    }
}

impl Spec {
    pub fn diagram_type(&self) -> DiagramType {
        match self.body {
            SpecBody::CircleMap { .. } => DiagramType::CircleMap,
            SpecBody::BubbleMap { .. } => DiagramType::BubbleMap,
            SpecBody::DoubleBubbleMap { .. } => DiagramType::DoubleBubbleMap,
            SpecBody::TreeMap { .. } => DiagramType::TreeMap,
            SpecBody::BraceMap { .. } => DiagramType::BraceMap,
            SpecBody::FlowMap { .. } => DiagramType::FlowMap,
            SpecBody::MultiFlowMap { .. } => DiagramType::MultiFlowMap,
            SpecBody::BridgeMap { .. } => DiagramType::BridgeMap,
            SpecBody::Mindmap { .. } => DiagramType::Mindmap,
            SpecBody::ConceptMap { .. } => DiagramType::ConceptMap,
            SpecBody::Flowchart { .. } => DiagramType::Flowchart,
        }
    }

    /// Minimal per-type validation. Renderers call this first and abort
    /// without touching the canvas when it fails.
    pub fn validate(&self) -> Result<(), SpecError> {
        match &self.body {
            SpecBody::CircleMap { topic, .. }
            | SpecBody::BubbleMap { topic, .. }
            | SpecBody::TreeMap { topic, .. }
            | SpecBody::BraceMap { topic, .. }
            | SpecBody::ConceptMap { topic, .. }
            | SpecBody::Mindmap { topic, .. } => {
                if topic.text.trim().is_empty() {
                    return Err(SpecError::EmptyField { field: "topic" });
                }
            }
            SpecBody::DoubleBubbleMap { left, right, .. } => {
                if left.text.trim().is_empty() {
                    return Err(SpecError::EmptyField { field: "left" });
                }
                if right.text.trim().is_empty() {
                    return Err(SpecError::EmptyField { field: "right" });
                }
            }
            SpecBody::FlowMap { steps, .. } => {
                if steps.is_empty() {
                    return Err(SpecError::EmptyField { field: "steps" });
                }
            }
            SpecBody::MultiFlowMap { event, .. } => {
                if event.text.trim().is_empty() {
                    return Err(SpecError::EmptyField { field: "event" });
                }
            }
            SpecBody::BridgeMap { analogies, .. } => {
                if analogies.is_empty() {
                    return Err(SpecError::EmptyField { field: "analogies" });
                }
            }
            SpecBody::Flowchart { steps } => {
                if steps.is_empty() {
                    return Err(SpecError::EmptyField { field: "steps" });
                }
            }
        }
        if let SpecBody::ConceptMap {
            topic,
            concepts,
            relationships,
        } = &self.body
        {
            for rel in relationships {
                let known = |name: &str| {
                    name == topic.text || concepts.iter().any(|c| c.text == name)
                };
                if !known(&rel.from) {
                    return Err(SpecError::UnknownReference {
                        name: rel.from.clone(),
                    });
                }
                if !known(&rel.to) {
                    return Err(SpecError::UnknownReference {
                        name: rel.to.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn from_json(input: &str) -> Result<Self, SpecError> {
        serde_json::from_str(input).map_err(SpecError::Parse)
    }

    pub fn to_json(&self) -> Result<String, SpecError> {
        serde_json::to_string_pretty(self).map_err(SpecError::Parse)
    }
}

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("spec field `{field}` is missing or empty")]
    EmptyField { field: &'static str },
    #[error("relationship references unknown node `{name}`")]
    UnknownReference { name: String },
    #[error("spec is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("operation does not apply to a {0} spec")]
    WrongDiagramType(DiagramType),
}

// --- Node id scheme -------------------------------------------------------
//
// Ids are stable across re-renders so `_customPositions` entries stay valid.
// The encoding matches the persisted format and must not change.

pub fn topic_id() -> String {
    "topic_center".to_string()
}

pub fn topic_left_id() -> String {
    "topic_left".to_string()
}

pub fn topic_right_id() -> String {
    "topic_right".to_string()
}

pub fn attribute_id(i: usize) -> String {
    format!("attribute_{i}")
}

pub fn context_id(i: usize) -> String {
    format!("context_{i}")
}

pub fn similarity_id(i: usize) -> String {
    format!("similarity_{i}")
}

pub fn left_diff_id(i: usize) -> String {
    format!("left_diff_{i}")
}

pub fn right_diff_id(i: usize) -> String {
    format!("right_diff_{i}")
}

pub fn cause_id(i: usize) -> String {
    format!("multi-flow-cause-{i}")
}

pub fn effect_id(i: usize) -> String {
    format!("multi-flow-effect-{i}")
}

pub fn event_id() -> String {
    "multi-flow-event".to_string()
}

pub fn bridge_left_id(i: usize) -> String {
    format!("bridge-left-{i}")
}

pub fn bridge_right_id(i: usize) -> String {
    format!("bridge-right-{i}")
}

pub fn flow_step_id(i: usize) -> String {
    format!("flow-step-{i}")
}

pub fn flow_substep_id(i: usize, j: usize) -> String {
    format!("flow-substep-{i}-{j}")
}

pub fn branch_id(i: usize) -> String {
    format!("branch_{i}")
}

pub fn child_id(i: usize, j: usize) -> String {
    format!("child_{i}_{j}")
}

pub fn concept_id(i: usize) -> String {
    format!("concept_{i}")
}

/// A family is the set of nodes of one role in one spec: the unit of
/// position classification and even redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Context,
    Attributes,
    Similarities,
    LeftDifferences,
    RightDifferences,
    Causes,
    Effects,
    BridgePairs,
    Concepts,
}

static FAMILY_RES: Lazy<BTreeMap<Family, Regex>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    let entries: [(Family, &str); 9] = [
        (Family::Context, r"^context_(\d+)$"),
        (Family::Attributes, r"^attribute_(\d+)$"),
        (Family::Similarities, r"^similarity_(\d+)$"),
        (Family::LeftDifferences, r"^left_diff_(\d+)$"),
        (Family::RightDifferences, r"^right_diff_(\d+)$"),
        (Family::Causes, r"^multi-flow-cause-(\d+)$"),
        (Family::Effects, r"^multi-flow-effect-(\d+)$"),
        (Family::BridgePairs, r"^bridge-(?:left|right)-(\d+)$"),
        (Family::Concepts, r"^concept_(\d+)$"),
    ];
    for (family, pattern) in entries {
        map.insert(family, Regex::new(pattern).expect("family regex"));
    }
    map
});

impl Ord for Family {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as usize).cmp(&(*other as usize))
    }
}

impl PartialOrd for Family {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Family {
    pub fn matches(self, node_id: &str) -> bool {
        FAMILY_RES[&self].is_match(node_id)
    }

    /// Array index encoded in an id of this family, if it matches.
    pub fn index_of(self, node_id: &str) -> Option<usize> {
        FAMILY_RES[&self]
            .captures(node_id)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    pub fn id(self, i: usize) -> String {
        match self {
            Family::Context => context_id(i),
            Family::Attributes => attribute_id(i),
            Family::Similarities => similarity_id(i),
            Family::LeftDifferences => left_diff_id(i),
            Family::RightDifferences => right_diff_id(i),
            Family::Causes => cause_id(i),
            Family::Effects => effect_id(i),
            Family::BridgePairs => bridge_left_id(i),
            Family::Concepts => concept_id(i),
        }
    }

    /// Number of array entries backing this family in the spec.
    pub fn len(self, spec: &Spec) -> usize {
        match (&spec.body, self) {
            (SpecBody::CircleMap { context, .. }, Family::Context) => context.len(),
            (SpecBody::BubbleMap { attributes, .. }, Family::Attributes) => attributes.len(),
            (SpecBody::DoubleBubbleMap { similarities, .. }, Family::Similarities) => {
                similarities.len()
            }
            (
                SpecBody::DoubleBubbleMap {
                    left_differences, ..
                },
                Family::LeftDifferences,
            ) => left_differences.len(),
            (
                SpecBody::DoubleBubbleMap {
                    right_differences, ..
                },
                Family::RightDifferences,
            ) => right_differences.len(),
            (SpecBody::MultiFlowMap { causes, .. }, Family::Causes) => causes.len(),
            (SpecBody::MultiFlowMap { effects, .. }, Family::Effects) => effects.len(),
            (SpecBody::BridgeMap { analogies, .. }, Family::BridgePairs) => analogies.len(),
            (SpecBody::ConceptMap { concepts, .. }, Family::Concepts) => concepts.len(),
            _ => 0,
        }
    }

    pub fn is_empty(self, spec: &Spec) -> bool {
        self.len(spec) == 0
    }

    /// Current ids of this family. Bridge pairs expand to both the left and
    /// right node of each section.
    pub fn ids(self, spec: &Spec) -> Vec<String> {
        let n = self.len(spec);
        match self {
            Family::BridgePairs => (0..n)
                .flat_map(|i| [bridge_left_id(i), bridge_right_id(i)])
                .collect(),
            _ => (0..n).map(|i| self.id(i)).collect(),
        }
    }

    /// Mutable access to the flat item array backing this family, for
    /// reorder-on-commit. Bridge pairs are not a flat item family.
    pub fn items_mut(self, spec: &mut Spec) -> Option<&mut Vec<Item>> {
        match (&mut spec.body, self) {
            (SpecBody::CircleMap { context, .. }, Family::Context) => Some(context),
            (SpecBody::BubbleMap { attributes, .. }, Family::Attributes) => Some(attributes),
            (SpecBody::DoubleBubbleMap { similarities, .. }, Family::Similarities) => {
                Some(similarities)
            }
            (
                SpecBody::DoubleBubbleMap {
                    left_differences, ..
                },
                Family::LeftDifferences,
            ) => Some(left_differences),
            (
                SpecBody::DoubleBubbleMap {
                    right_differences, ..
                },
                Family::RightDifferences,
            ) => Some(right_differences),
            (SpecBody::MultiFlowMap { causes, .. }, Family::Causes) => Some(causes),
            (SpecBody::MultiFlowMap { effects, .. }, Family::Effects) => Some(effects),
            (SpecBody::ConceptMap { concepts, .. }, Family::Concepts) => Some(concepts),
            _ => None,
        }
    }

    /// The node kind layouts assign to members of this family.
    pub fn node_kind(self) -> NodeKind {
        match self {
            Family::Context => NodeKind::Context,
            Family::Attributes => NodeKind::Attribute,
            Family::Similarities => NodeKind::Similarity,
            Family::LeftDifferences => NodeKind::LeftDiff,
            Family::RightDifferences => NodeKind::RightDiff,
            Family::Causes => NodeKind::Cause,
            Family::Effects => NodeKind::Effect,
            Family::BridgePairs => NodeKind::BridgeLeft,
            Family::Concepts => NodeKind::Concept,
        }
    }

    /// Family a node id belongs to, if any.
    pub fn of_node_id(node_id: &str) -> Option<Family> {
        FAMILY_RES
            .iter()
            .find(|(_, re)| re.is_match(node_id))
            .map(|(family, _)| *family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_accept_strings_and_objects() {
        let spec: Spec = serde_json::from_str(
            r#"{"type":"bubble_map","topic":"Ocean","attributes":["blue",{"text":"deep"}]}"#,
        )
        .unwrap();
        match &spec.body {
            SpecBody::BubbleMap { attributes, .. } => {
                assert_eq!(attributes[0].text, "blue");
                assert_eq!(attributes[1].text, "deep");
            }
            _ => panic!("wrong body"),
        }
    }

    #[test]
    fn items_serialize_normalized() {
        let spec: Spec =
            serde_json::from_str(r#"{"type":"bubble_map","topic":"T","attributes":["a"]}"#)
                .unwrap();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["attributes"][0]["text"], "a");
    }

    #[test]
    fn side_channels_round_trip() {
        let input = r#"{
            "type": "bubble_map",
            "topic": "T",
            "attributes": ["a", "b"],
            "_customPositions": {"attribute_0": {"x": 10.0, "y": -4.5}},
            "_node_dimensions": {"attribute_1": {"r": 42.0}}
        }"#;
        let spec = Spec::from_json(input).unwrap();
        assert_eq!(
            spec.custom_positions["attribute_0"],
            Point { x: 10.0, y: -4.5 }
        );
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json["_customPositions"]["attribute_0"].is_object());
        assert_eq!(json["_node_dimensions"]["attribute_1"]["r"], 42.0);
    }

    #[test]
    fn family_ids_and_indices() {
        assert!(Family::Attributes.matches("attribute_3"));
        assert_eq!(Family::Attributes.index_of("attribute_3"), Some(3));
        assert!(!Family::Attributes.matches("attribute_x"));
        assert_eq!(Family::Causes.id(2), "multi-flow-cause-2");
        assert!(Family::BridgePairs.matches("bridge-right-0"));
        assert_eq!(Family::of_node_id("similarity_1"), Some(Family::Similarities));
        assert_eq!(Family::of_node_id("topic_center"), None);
    }

    #[test]
    fn flow_steps_accept_plain_strings() {
        let spec: Spec = serde_json::from_str(
            r#"{"type":"flow_map","steps":["rinse",{"text":"boil","substeps":["salt"]}]}"#,
        )
        .unwrap();
        match &spec.body {
            SpecBody::FlowMap { steps, .. } => {
                assert!(steps[0].substeps.is_empty());
                assert_eq!(steps[1].substeps[0].text, "salt");
            }
            _ => panic!("wrong body"),
        }
    }

    #[test]
    fn validate_rejects_empty_topic() {
        let spec: Spec =
            serde_json::from_str(r#"{"type":"bubble_map","topic":"  ","attributes":[]}"#).unwrap();
        assert!(matches!(
            spec.validate(),
            Err(SpecError::EmptyField { field: "topic" })
        ));
    }

    #[test]
    fn validate_rejects_unknown_relationship_target() {
        let spec: Spec = serde_json::from_str(
            r#"{"type":"concept_map","topic":"T","concepts":["a"],
                "relationships":[{"from":"T","to":"missing"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            spec.validate(),
            Err(SpecError::UnknownReference { .. })
        ));
    }

    #[test]
    fn draggable_kinds_per_type() {
        assert!(!NodeKind::Topic.is_draggable(DiagramType::BubbleMap));
        assert!(NodeKind::Attribute.is_draggable(DiagramType::BubbleMap));
        assert!(!NodeKind::Boundary.is_draggable(DiagramType::CircleMap));
        assert!(!NodeKind::TopicLeft.is_draggable(DiagramType::DoubleBubbleMap));
        assert!(!NodeKind::Event.is_draggable(DiagramType::MultiFlowMap));
        assert!(!NodeKind::Dimension.is_draggable(DiagramType::BridgeMap));
    }
}
