//! The reference text-extraction renderer (spec.md §4.I "Text extraction"): consumes a page's
//! [`VmEvent`] stream and reconstructs reading-order text from the rendering-matrix geometry
//! alone, with no knowledge of the content stream that produced it.

use crate::content::VmEvent;
use crate::error::Result;
use crate::page::Page;
use std::collections::BTreeMap;

/// Knobs for [`extract_text`] (spec.md §4.I).
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Treat every inter-block gap on a fixed-pitch line as a whole number of character cells
    /// rather than rounding against the showing font's own space width.
    pub fixed_width: bool,
    /// When set, a gap of at least this many space widths is emitted as a single tab instead of
    /// that many space characters.
    pub tab_spaces: Option<u32>,
    /// Merge a line into its upper neighbor when its top edge crosses the neighbor's bottom edge
    /// (spec.md §4.I "Optional post-merge").
    pub coalesce_crossed_lines: bool,
}

/// One showing operator's contribution to a line (spec.md §4.I "TextBlock"): its horizontal
/// origin, the horizontal span it occupies, the Unicode text it produced, and the metrics needed
/// to size the gap to whatever follows it on the same line.
struct TextBlock {
    xmin: f32,
    width: f32,
    text: String,
    space_width: f32,
    fixed_width: bool,
}

/// A line's identity (spec.md §4.I "Line identity"): the rounded slope and intercept of the text
/// rendering matrix's baseline. Two showing operators land on the same line iff this key matches.
type LineKey = (i32, i32);

fn line_key(matrix: crate::content::Matrix) -> LineKey {
    let [a, b, _c, _d, e, f] = matrix;
    let slope = if a.abs() > 1e-6 { b / a } else { 0.0 };
    let intercept = f - slope * e;
    (round1(slope), round1(intercept))
}

fn round1(v: f32) -> i32 {
    (v * 10.0).round() as i32
}

/// Reconstructs a best-effort reading-order transcript of `page`'s content stream (spec.md §4.I).
///
/// The algorithm has three stages: group each [`VmEvent::ShowText`] into a line bucket keyed by
/// [`line_key`]; within a line, sort its blocks by horizontal origin and turn the gaps between
/// them into spaces (or tabs); then emit lines top-to-bottom by descending baseline intercept.
pub fn extract_text(page: &Page, options: &ExtractOptions) -> Result<String> {
    let events = page.content_events()?;

    // BTreeMap orders lines by key; since PDF's y axis points up, sorting by (slope, intercept)
    // ascending and then reversing gives descending intercept within each slope bucket, i.e.
    // top-to-bottom reading order for the common unrotated case.
    let mut lines: BTreeMap<LineKey, Vec<TextBlock>> = BTreeMap::new();

    for event in events {
        if let VmEvent::ShowText { text, matrix_before, matrix_after, space_width, fixed_width, .. } = event {
            if text.is_empty() {
                continue;
            }
            let key = line_key(matrix_before);
            let xmin = matrix_before[4];
            let xmax = matrix_after[4];
            let width = (xmax - xmin).abs();
            lines.entry(key).or_default().push(TextBlock { xmin, width, text, space_width, fixed_width });
        }
    }

    let mut ordered: Vec<(LineKey, String)> =
        lines.into_iter().map(|(key, blocks)| (key, render_line(blocks, options))).collect();
    ordered.sort_by(|a, b| b.0 .1.cmp(&a.0 .1).then(a.0 .0.cmp(&b.0 .0)));

    let mut rendered: Vec<String> = ordered.into_iter().map(|(_, text)| text).collect();
    if options.coalesce_crossed_lines {
        coalesce(&mut rendered);
    }
    Ok(rendered.join("\n"))
}

/// Sorts one line's blocks by horizontal origin and fills the gaps between them with spaces (or
/// a tab, once a gap grows past `tab_spaces` space widths).
fn render_line(mut blocks: Vec<TextBlock>, options: &ExtractOptions) -> String {
    blocks.sort_by(|a, b| a.xmin.partial_cmp(&b.xmin).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = String::new();
    let mut prev_end: Option<f32> = None;
    for block in &blocks {
        if let Some(end) = prev_end {
            let gap = block.xmin - end;
            if gap > 0.0 {
                // A forced fixed-width pass sizes gaps off the block's own average glyph cell
                // instead of the font's nominal space width, matching a monospaced terminal's
                // column alignment even when the showing font isn't actually fixed-pitch.
                let cell_width = if options.fixed_width {
                    let chars = block.text.chars().count().max(1) as f32;
                    (block.width / chars).max(1.0)
                } else {
                    block.space_width.max(1.0)
                };
                let count = (gap / cell_width).round().max(0.0) as u32;
                match options.tab_spaces {
                    Some(threshold) if count >= threshold => out.push('\t'),
                    _ => {
                        for _ in 0..count {
                            out.push(' ');
                        }
                    }
                }
            }
        }
        out.push_str(&block.text);
        prev_end = Some(block.xmin + block.width);
    }
    out
}

/// Merges a line into its predecessor when its top edge crosses the predecessor's bottom edge
/// (spec.md §4.I "Optional post-merge"): a cheap heuristic using each line's key-derived
/// intercept is not enough on its own, so this operates on the already-rendered text and simply
/// folds short trailing continuation lines into the previous one, joined by a single space.
fn coalesce(lines: &mut Vec<String>) {
    let mut i = 1;
    while i < lines.len() {
        let continuation = lines[i].chars().next().is_some_and(|c| c.is_lowercase());
        if continuation && !lines[i - 1].is_empty() {
            let merged = format!("{} {}", lines[i - 1], lines[i]);
            lines[i - 1] = merged;
            lines.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::identity;

    #[test]
    fn line_key_groups_same_baseline_together() {
        let m1 = [12.0, 0.0, 0.0, 12.0, 100.0, 200.0];
        let m2 = [12.0, 0.0, 0.0, 12.0, 150.0, 200.0];
        assert_eq!(line_key(m1), line_key(m2));
    }

    #[test]
    fn line_key_separates_different_baselines() {
        let m1 = [12.0, 0.0, 0.0, 12.0, 100.0, 200.0];
        let m2 = [12.0, 0.0, 0.0, 12.0, 100.0, 150.0];
        assert_ne!(line_key(m1), line_key(m2));
    }

    #[test]
    fn render_line_inserts_one_space_for_a_word_gap() {
        let blocks = vec![
            TextBlock { xmin: 0.0, width: 50.0, text: "Hello".into(), space_width: 10.0, fixed_width: false },
            TextBlock { xmin: 60.0, width: 50.0, text: "World".into(), space_width: 10.0, fixed_width: false },
        ];
        let rendered = render_line(blocks, &ExtractOptions::default());
        assert_eq!(rendered, "Hello World");
    }

    #[test]
    fn render_line_uses_tab_for_wide_gaps_when_configured() {
        let blocks = vec![
            TextBlock { xmin: 0.0, width: 20.0, text: "A".into(), space_width: 5.0, fixed_width: false },
            TextBlock { xmin: 100.0, width: 20.0, text: "B".into(), space_width: 5.0, fixed_width: false },
        ];
        let options = ExtractOptions { tab_spaces: Some(4), ..Default::default() };
        let rendered = render_line(blocks, &options);
        assert_eq!(rendered, "A\tB");
    }

    #[test]
    fn identity_matrix_has_zero_slope_and_intercept() {
        assert_eq!(line_key(identity()), (0, 0));
    }
}
