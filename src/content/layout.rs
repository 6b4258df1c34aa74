use serde::{Deserialize, Serialize};

use crate::gaze::{Rect, WordFrames, WordRect};

use super::article::Article;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl FontSize {
    pub const ALL: [FontSize; 3] = [FontSize::Small, FontSize::Medium, FontSize::Large];

    pub fn points(self) -> f64 {
        match self {
            FontSize::Small => 14.0,
            FontSize::Medium => 18.0,
            FontSize::Large => 22.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FontSize::Small => "Small",
            FontSize::Medium => "Medium",
            FontSize::Large => "Large",
        }
    }
}

/// Placement of the text column on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub line_spacing: f64,
    pub paragraph_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 20.0,
            origin_y: 120.0,
            width: 350.0,
            line_spacing: 8.0,
            paragraph_spacing: 16.0,
        }
    }
}

// Approximate system-font metrics, relative to the point size.
const GLYPH_WIDTH: f64 = 0.55;
const LINE_HEIGHT: f64 = 1.3;
// Highlighted words carry a tinted background with this much padding.
const HIGHLIGHT_PAD_X: f64 = 6.0;
const HIGHLIGHT_PAD_Y: f64 = 4.0;

/// Reference flow layout: words fill a line left to right and wrap when the
/// next one would overflow the column.
///
/// Only vocabulary words are published as word rectangles; other words still
/// take up space. A token's trailing punctuation ("garden.") is not part of
/// the published word.
pub fn layout_article(article: &Article, font_size: FontSize, config: &LayoutConfig) -> WordFrames {
    let size = font_size.points();
    let glyph = size * GLYPH_WIDTH;
    let line_height = size * LINE_HEIGHT + 2.0 * HIGHLIGHT_PAD_Y;

    let mut rects = Vec::new();
    let mut y = config.origin_y;

    for paragraph in article.paragraphs() {
        let mut x = config.origin_x;
        for token in paragraph {
            let label = token.trim_matches(|c: char| c.is_ascii_punctuation());
            let highlighted = article.difficult_words.contains(label);

            let text_width = token.chars().count() as f64 * glyph;
            let width = if highlighted {
                text_width + 2.0 * HIGHLIGHT_PAD_X
            } else {
                text_width
            };

            if x > config.origin_x && x + width > config.origin_x + config.width {
                x = config.origin_x;
                y += line_height + config.line_spacing;
            }

            if highlighted {
                rects.push(WordRect::new(label, Rect::new(x, y, width, line_height)));
            }

            x += width + glyph;
        }
        y += line_height + config.paragraph_spacing;
    }

    WordFrames::new(rects)
}
