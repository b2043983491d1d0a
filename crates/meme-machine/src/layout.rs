//! Caption layout: word wrapping and line placement inside a region.

use crate::font::FontMetrics;
use crate::types::{CaptionRegion, DrawCommand, VerticalAnchor};

/// How caption text flows into its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Greedy word wrap against the region width.
    WordWrap,
    /// Everything on one line, even if it overflows.
    SingleLine,
}

/// Split a caption into lines no wider than `max_width`.
///
/// Words are whitespace-separated; runs of whitespace collapse to a single
/// space. A word too wide for `max_width` is kept whole on its own line
/// rather than truncated, so a line can exceed the limit. Empty input
/// yields no lines.
pub fn wrap_caption(
    text: &str,
    max_width: u32,
    metrics: &dyn FontMetrics,
    mode: WrapMode,
) -> Vec<String> {
    let mut words = text.split_whitespace();
    let first = match words.next() {
        Some(w) => w,
        None => return Vec::new(),
    };

    if mode == WrapMode::SingleLine {
        let mut line = first.to_string();
        for word in words {
            line.push(' ');
            line.push_str(word);
        }
        return vec![line];
    }

    let mut lines = Vec::new();
    let mut current = first.to_string();
    for word in words {
        let candidate = format!("{current} {word}");
        if metrics.measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    lines.push(current);
    lines
}

/// Place a caption inside its region, one draw command per line.
///
/// Each line is centered horizontally on its own. The block of lines is
/// centered vertically or anchored with its last baseline on the region's
/// bottom edge, per the region's anchor. Coordinates are baseline origins
/// and may fall outside the region when the text does not fit.
pub fn layout_caption(
    text: &str,
    region: &CaptionRegion,
    metrics: &dyn FontMetrics,
    mode: WrapMode,
) -> Vec<DrawCommand> {
    let lines = wrap_caption(text, region.rect.w, metrics, mode);
    if lines.is_empty() {
        return Vec::new();
    }

    let n = lines.len() as i64;
    let line_height = metrics.line_height() as i64;
    let block_height = n * line_height - metrics.line_spacing() as i64;

    let rect = region.rect;
    let first_baseline = match region.anchor {
        VerticalAnchor::Center => {
            let top = rect.y as i64 + (rect.h as i64 - block_height).div_euclid(2);
            top + metrics.ascent() as i64
        }
        VerticalAnchor::Bottom => rect.bottom() as i64 - (n - 1) * line_height,
    };

    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let x = rect.x as i64 + (rect.w as i64 - metrics.measure(&line) as i64).div_euclid(2);
            let y = first_baseline + i as i64 * line_height;
            DrawCommand {
                text: line,
                x: x as i32,
                y: y as i32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::BlockFont;
    use crate::types::{Rect, TextColor};

    fn region(x: u32, y: u32, w: u32, h: u32, anchor: VerticalAnchor) -> CaptionRegion {
        CaptionRegion {
            rect: Rect { x, y, w, h },
            color: TextColor::Black,
            anchor,
        }
    }

    #[test]
    fn test_wrap_empty_text() {
        let font = BlockFont::new(1);
        assert!(wrap_caption("", 100, &font, WrapMode::WordWrap).is_empty());
        assert!(wrap_caption("   \t  ", 100, &font, WrapMode::WordWrap).is_empty());
        assert!(wrap_caption("", 100, &font, WrapMode::SingleLine).is_empty());
    }

    #[test]
    fn test_wrap_single_line_collapses_whitespace() {
        let font = BlockFont::new(1);
        let lines = wrap_caption("a   b\tc", 5, &font, WrapMode::SingleLine);
        assert_eq!(lines, vec!["a b c"]);
    }

    #[test]
    fn test_wrap_greedy_fill() {
        let font = BlockFont::new(1);
        // "aa bb" is 5 chars = 29 px; adding " cc" makes 8 chars = 47 px.
        let lines = wrap_caption("aa bb cc", 29, &font, WrapMode::WordWrap);
        assert_eq!(lines, vec!["aa bb", "cc"]);
    }

    #[test]
    fn test_wrap_exact_fit_stays_on_line() {
        let font = BlockFont::new(1);
        assert_eq!(font.measure("aa bb"), 29);
        let lines = wrap_caption("aa bb", 29, &font, WrapMode::WordWrap);
        assert_eq!(lines, vec!["aa bb"]);
    }

    #[test]
    fn test_wrap_lines_fit_width() {
        let font = BlockFont::new(1);
        let text = "the quick brown fox jumps over the lazy dog";
        let lines = wrap_caption(text, 60, &font, WrapMode::WordWrap);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(font.measure(line) <= 60, "line too wide: {line:?}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_overlong_word_kept_whole() {
        let font = BlockFont::new(1);
        let lines = wrap_caption("a incomprehensibilities b", 30, &font, WrapMode::WordWrap);
        assert!(lines.contains(&"incomprehensibilities".to_string()));
        assert!(font.measure("incomprehensibilities") > 30);
    }

    #[test]
    fn test_layout_empty_caption() {
        let font = BlockFont::new(1);
        let r = region(0, 0, 100, 100, VerticalAnchor::Center);
        assert!(layout_caption("", &r, &font, WrapMode::WordWrap).is_empty());
    }

    #[test]
    fn test_layout_single_line_centered() {
        let font = BlockFont::new(1);
        let r = region(60, 50, 130, 60, VerticalAnchor::Center);
        let commands = layout_caption("hi", &r, &font, WrapMode::WordWrap);
        assert_eq!(commands.len(), 1);
        // x = 60 + (130 - 11) / 2, baseline = 50 + (60 + 7) / 2
        assert_eq!(commands[0].x, 119);
        assert_eq!(commands[0].y, 83);
    }

    #[test]
    fn test_layout_single_line_matches_closed_form() {
        // For one line, centering the block equals y + (h + ascent) / 2.
        let font = BlockFont::new(3);
        let r = region(10, 20, 200, 77, VerticalAnchor::Center);
        let commands = layout_caption("ok", &r, &font, WrapMode::WordWrap);
        let expected = 20 + (77 + font.ascent() as i32) / 2;
        assert_eq!(commands[0].y, expected);
    }

    #[test]
    fn test_layout_bottom_anchor_last_baseline_on_edge() {
        let font = BlockFont::new(1);
        let r = region(10, 10, 280, 180, VerticalAnchor::Bottom);
        let commands = layout_caption("hello", &r, &font, WrapMode::WordWrap);
        assert_eq!(commands[0].y, 190);
    }

    #[test]
    fn test_layout_bottom_anchor_stacks_upward() {
        let font = BlockFont::new(1);
        let r = region(0, 0, 35, 100, VerticalAnchor::Bottom);
        let commands = layout_caption("aaaa bbbb cccc", &r, &font, WrapMode::WordWrap);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[2].y, 100);
        assert_eq!(commands[1].y, 100 - font.line_height() as i32);
        assert_eq!(commands[0].y, 100 - 2 * font.line_height() as i32);
    }

    #[test]
    fn test_layout_three_lines_roughly_symmetric() {
        let font = BlockFont::new(1);
        let r = region(50, 50, 35, 60, VerticalAnchor::Center);
        let commands = layout_caption("aaaa bbbb cccc", &r, &font, WrapMode::WordWrap);
        assert_eq!(commands.len(), 3);

        let top_gap = commands[0].y - font.ascent() as i32 - 50;
        let bottom_gap = (50 + 60) - commands[2].y;
        assert!((top_gap - bottom_gap).abs() <= font.line_height() as i32);
    }

    #[test]
    fn test_layout_lines_centered_independently() {
        let font = BlockFont::new(1);
        let r = region(0, 0, 100, 100, VerticalAnchor::Center);
        let commands = layout_caption("wide-line-here tiny", &r, &font, WrapMode::WordWrap);
        assert_eq!(commands.len(), 2);
        assert!(commands[0].x < commands[1].x);
    }

    #[test]
    fn test_layout_overflowing_word_goes_negative() {
        let font = BlockFont::new(1);
        let r = region(0, 0, 10, 50, VerticalAnchor::Center);
        let commands = layout_caption("wwwww", &r, &font, WrapMode::WordWrap);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].text, "wwwww");
        assert!(commands[0].x < 0);
    }
}
