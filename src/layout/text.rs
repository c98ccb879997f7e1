//! Greedy word wrapping over measured text widths.

use crate::text_metrics;

/// Wrap `text` so each line's measured width stays within `max_width`.
///
/// Explicit newlines are hard breaks. A single word wider than `max_width`
/// keeps its own line unchanged. Always returns at least one line, and no
/// line ever contains a newline.
pub fn wrap<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    for segment in text.split('\n') {
        wrap_segment(segment, max_width, &measure, &mut lines);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn wrap_segment<F>(segment: &str, max_width: f32, measure: &F, lines: &mut Vec<String>)
where
    F: Fn(&str) -> f32,
{
    let words: Vec<&str> = segment.split_whitespace().collect();
    if words.is_empty() {
        lines.push(String::new());
        return;
    }
    let mut current = String::new();
    for word in words {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    lines.push(current);
}

/// Wrap using the crate's font metrics.
pub fn wrap_label(
    text: &str,
    font_size: f32,
    max_width: f32,
    font_family: &str,
    fast_metrics: bool,
) -> Vec<String> {
    wrap(text, max_width, |line| {
        text_metrics::text_width(line, font_size, font_family, fast_metrics)
    })
}

/// Widest measured line of an already wrapped label.
pub fn max_line_width(
    lines: &[String],
    font_size: f32,
    font_family: &str,
    fast_metrics: bool,
) -> f32 {
    lines
        .iter()
        .map(|line| text_metrics::text_width(line, font_size, font_family, fast_metrics))
        .fold(0.0, f32::max)
}
