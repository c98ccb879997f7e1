use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::spec::DiagramType;

/// A theme token: a color string or a numeric size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenValue {
    Size(f32),
    Color(String),
}

pub type TokenMap = BTreeMap<String, TokenValue>;

/// Flat resolved token map for one render.
#[derive(Debug, Clone)]
pub struct Theme {
    pub diagram_type: DiagramType,
    pub font_family: String,
    tokens: TokenMap,
}

impl Theme {
    pub fn color(&self, key: &str) -> &str {
        match self.tokens.get(key) {
            Some(TokenValue::Color(value)) => value,
            _ => "#000000",
        }
    }

    pub fn size(&self, key: &str) -> f32 {
        match self.tokens.get(key) {
            Some(TokenValue::Size(value)) => *value,
            _ => 14.0,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.tokens.contains_key(key)
    }

    pub fn tokens(&self) -> &TokenMap {
        &self.tokens
    }
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("no theme defined for diagram type {0}")]
    Unavailable(DiagramType),
}

/// Merges default, imported, and per-call theme overrides.
///
/// Resolution order: per-type default, then the imported theme (consumed on
/// first resolve, never again), then user overrides, then the spec's
/// `_style`. Afterwards every `*Fill` without a paired `*Text` gets a
/// luminance-derived black/white text color.
#[derive(Debug, Default)]
pub struct ThemeResolver {
    imported: Option<TokenMap>,
}

impl ThemeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a theme loaded from a saved file. It applies to the next
    /// resolve only.
    pub fn import(&mut self, tokens: TokenMap) {
        self.imported = Some(tokens);
    }

    pub fn resolve(
        &mut self,
        diagram_type: DiagramType,
        font_family: &str,
        user_overrides: &TokenMap,
        spec_style: Option<&Value>,
    ) -> Result<Theme, ThemeError> {
        let mut tokens =
            default_tokens(diagram_type).ok_or(ThemeError::Unavailable(diagram_type))?;
        if let Some(imported) = self.imported.take() {
            for (key, value) in imported {
                tokens.insert(key, value);
            }
        }
        for (key, value) in user_overrides {
            tokens.insert(key.clone(), value.clone());
        }
        if let Some(style) = spec_style {
            merge_style_value(&mut tokens, style);
        }
        derive_text_tokens(&mut tokens);
        Ok(Theme {
            diagram_type,
            font_family: font_family.to_string(),
            tokens,
        })
    }
}

fn merge_style_value(tokens: &mut TokenMap, style: &Value) {
    let Some(map) = style.as_object() else {
        return;
    };
    for (key, value) in map {
        match value {
            Value::String(color) => {
                tokens.insert(key.clone(), TokenValue::Color(color.clone()));
            }
            Value::Number(number) => {
                if let Some(size) = number.as_f64() {
                    tokens.insert(key.clone(), TokenValue::Size(size as f32));
                }
            }
            _ => {}
        }
    }
}

/// For every `*Fill` without a `*Text`, derive black or white by relative
/// luminance of the fill, thresholded at 0.5.
fn derive_text_tokens(tokens: &mut TokenMap) {
    let mut derived: Vec<(String, TokenValue)> = Vec::new();
    for (key, value) in tokens.iter() {
        let Some(stem) = key.strip_suffix("Fill") else {
            continue;
        };
        let text_key = format!("{stem}Text");
        if tokens.contains_key(&text_key) {
            continue;
        }
        if let TokenValue::Color(fill) = value {
            let text = if relative_luminance(fill).unwrap_or(0.0) > 0.5 {
                "#000000"
            } else {
                "#ffffff"
            };
            derived.push((text_key, TokenValue::Color(text.to_string())));
        }
    }
    for (key, value) in derived {
        tokens.insert(key, value);
    }
}

/// Relative luminance of a `#rgb` / `#rrggbb` color in [0, 1].
pub fn relative_luminance(color: &str) -> Option<f32> {
    let (r, g, b) = parse_hex_color(color)?;
    Some((0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0)
}

pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (i, ch) in hex.chars().enumerate() {
                let v = ch.to_digit(16)? as u8;
                out[i] = v * 16 + v;
            }
            Some((out[0], out[1], out[2]))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        _ => None,
    }
}

fn color(value: &str) -> TokenValue {
    TokenValue::Color(value.to_string())
}

fn size(value: f32) -> TokenValue {
    TokenValue::Size(value)
}

fn base_tokens() -> TokenMap {
    let mut t = TokenMap::new();
    t.insert("background".into(), color("#ffffff"));
    t.insert("lineColor".into(), color("#64748b"));
    t.insert("strokeWidth".into(), size(2.0));
    t.insert("fontTopic".into(), size(18.0));
    t.insert("fontItem".into(), size(14.0));
    t.insert("fontTitle".into(), size(20.0));
    t
}

fn default_tokens(diagram_type: DiagramType) -> Option<TokenMap> {
    let mut t = base_tokens();
    match diagram_type {
        DiagramType::BubbleMap => {
            t.insert("topicFill".into(), color("#2563eb"));
            t.insert("topicStroke".into(), color("#1e40af"));
            t.insert("attributeFill".into(), color("#dbeafe"));
            t.insert("attributeStroke".into(), color("#60a5fa"));
        }
        DiagramType::CircleMap => {
            t.insert("topicFill".into(), color("#2563eb"));
            t.insert("topicStroke".into(), color("#1e40af"));
            t.insert("contextFill".into(), color("#e0f2fe"));
            t.insert("contextStroke".into(), color("#38bdf8"));
            t.insert("boundaryStroke".into(), color("#94a3b8"));
        }
        DiagramType::DoubleBubbleMap => {
            t.insert("topicFill".into(), color("#2563eb"));
            t.insert("topicStroke".into(), color("#1e40af"));
            t.insert("similarityFill".into(), color("#dcfce7"));
            t.insert("similarityStroke".into(), color("#4ade80"));
            t.insert("differenceFill".into(), color("#fee2e2"));
            t.insert("differenceStroke".into(), color("#f87171"));
        }
        DiagramType::MultiFlowMap => {
            t.insert("eventFill".into(), color("#1e293b"));
            t.insert("eventStroke".into(), color("#0f172a"));
            t.insert("causeFill".into(), color("#fef9c3"));
            t.insert("causeStroke".into(), color("#facc15"));
            t.insert("effectFill".into(), color("#fae8ff"));
            t.insert("effectStroke".into(), color("#d946ef"));
        }
        DiagramType::BridgeMap => {
            t.insert("pairFill".into(), color("#eef2ff"));
            t.insert("pairStroke".into(), color("#818cf8"));
            t.insert("dimensionFill".into(), color("#f1f5f9"));
        }
        DiagramType::FlowMap => {
            t.insert("stepFill".into(), color("#e0e7ff"));
            t.insert("stepStroke".into(), color("#6366f1"));
            t.insert("substepFill".into(), color("#f5f3ff"));
            t.insert("substepStroke".into(), color("#a78bfa"));
            t.insert("titleFill".into(), color("#1e293b"));
        }
        DiagramType::Flowchart => {
            t.insert("startFill".into(), color("#bbf7d0"));
            t.insert("endFill".into(), color("#fecaca"));
            t.insert("decisionFill".into(), color("#fef08a"));
            t.insert("processFill".into(), color("#e2e8f0"));
            t.insert("stepStroke".into(), color("#475569"));
        }
        DiagramType::Mindmap => {
            t.insert("topicFill".into(), color("#0ea5e9"));
            t.insert("topicStroke".into(), color("#0369a1"));
            t.insert("branchFill".into(), color("#e0f2fe"));
            t.insert("branchStroke".into(), color("#38bdf8"));
            t.insert("childFill".into(), color("#f8fafc"));
            t.insert("childStroke".into(), color("#94a3b8"));
        }
        DiagramType::TreeMap | DiagramType::BraceMap => {
            t.insert("topicFill".into(), color("#334155"));
            t.insert("branchFill".into(), color("#e2e8f0"));
            t.insert("branchStroke".into(), color("#64748b"));
            t.insert("childFill".into(), color("#f8fafc"));
            t.insert("childStroke".into(), color("#94a3b8"));
        }
        DiagramType::ConceptMap => {
            t.insert("topicFill".into(), color("#7c3aed"));
            t.insert("topicStroke".into(), color("#5b21b6"));
            t.insert("conceptFill".into(), color("#ede9fe"));
            t.insert("conceptStroke".into(), color("#a78bfa"));
        }
    }
    Some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_fill_gets_white_text() {
        let mut resolver = ThemeResolver::new();
        let theme = resolver
            .resolve(DiagramType::BubbleMap, "sans-serif", &TokenMap::new(), None)
            .unwrap();
        // #2563eb is dark, #dbeafe is light
        assert_eq!(theme.color("topicText"), "#ffffff");
        assert_eq!(theme.color("attributeText"), "#000000");
    }

    #[test]
    fn imported_theme_is_consumed_once() {
        let mut resolver = ThemeResolver::new();
        let mut imported = TokenMap::new();
        imported.insert("topicFill".into(), TokenValue::Color("#ffffff".into()));
        resolver.import(imported);

        let first = resolver
            .resolve(DiagramType::BubbleMap, "sans-serif", &TokenMap::new(), None)
            .unwrap();
        assert_eq!(first.color("topicFill"), "#ffffff");

        let second = resolver
            .resolve(DiagramType::BubbleMap, "sans-serif", &TokenMap::new(), None)
            .unwrap();
        assert_eq!(second.color("topicFill"), "#2563eb");
    }

    #[test]
    fn user_overrides_beat_imported() {
        let mut resolver = ThemeResolver::new();
        let mut imported = TokenMap::new();
        imported.insert("topicFill".into(), TokenValue::Color("#111111".into()));
        resolver.import(imported);
        let mut user = TokenMap::new();
        user.insert("topicFill".into(), TokenValue::Color("#222222".into()));
        let theme = resolver
            .resolve(DiagramType::BubbleMap, "sans-serif", &user, None)
            .unwrap();
        assert_eq!(theme.color("topicFill"), "#222222");
    }

    #[test]
    fn spec_style_merges_last() {
        let mut resolver = ThemeResolver::new();
        let style = serde_json::json!({"attributeFill": "#123456", "fontItem": 17});
        let theme = resolver
            .resolve(
                DiagramType::BubbleMap,
                "sans-serif",
                &TokenMap::new(),
                Some(&style),
            )
            .unwrap();
        assert_eq!(theme.color("attributeFill"), "#123456");
        assert_eq!(theme.size("fontItem"), 17.0);
    }

    #[test]
    fn explicit_text_token_is_not_overwritten() {
        let mut resolver = ThemeResolver::new();
        let mut user = TokenMap::new();
        user.insert("topicText".into(), TokenValue::Color("#ff0000".into()));
        let theme = resolver
            .resolve(DiagramType::BubbleMap, "sans-serif", &user, None)
            .unwrap();
        assert_eq!(theme.color("topicText"), "#ff0000");
    }

    #[test]
    fn luminance_parses_short_hex() {
        assert!(relative_luminance("#fff").unwrap() > 0.99);
        assert!(relative_luminance("#000").unwrap() < 0.01);
        assert!(relative_luminance("not-a-color").is_none());
    }
}
