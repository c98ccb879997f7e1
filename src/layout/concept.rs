//! Concept map: topic-centered ring of concepts plus labeled relationship
//! arrows between arbitrary nodes. Nodes drag freely and commit their exact
//! released position.

use crate::config::LayoutConfig;
use crate::session::DragDomain;
use crate::spec::{self, Family, Spec, SpecBody};
use crate::theme::Theme;

use super::bubble::{radial_layout, RadialParams};
use super::types::{Connection, Layout};
use super::LayoutError;

pub fn layout(
    spec: &mut Spec,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let concept_cfg = config.concept.clone();
    let outcome = radial_layout(
        spec,
        theme,
        config,
        RadialParams {
            bubble: &concept_cfg.bubble,
            family: Family::Concepts,
            fill_key: "conceptFill",
            stroke_key: "conceptStroke",
            text_key: "conceptText",
            spokes: false,
        },
    );
    let mut layout = outcome.layout;

    // Relationships reference nodes by their text; validation has already
    // checked every reference resolves.
    let (topic, concepts, relationships) = match &spec.body {
        SpecBody::ConceptMap {
            topic,
            concepts,
            relationships,
        } => (topic, concepts, relationships),
        _ => unreachable!("dispatched on body"),
    };
    let node_id_for = |name: &str| -> Option<String> {
        if name == topic.text {
            return Some(spec::topic_id());
        }
        concepts
            .iter()
            .position(|c| c.text == name)
            .map(spec::concept_id)
    };
    let stroke_width = theme.size("strokeWidth");
    for rel in relationships {
        let (Some(from), Some(to)) = (node_id_for(&rel.from), node_id_for(&rel.to)) else {
            continue;
        };
        let mut conn = Connection::arrow(from, to, theme.color("lineColor"), stroke_width);
        conn.label = rel.label.clone();
        layout.connections.push(conn);
    }

    // Exact-position commit: no ring, no columns.
    if let Some(session) = layout.session.as_mut() {
        session.domain = DragDomain::Free;
    }
    Ok(layout)
}
