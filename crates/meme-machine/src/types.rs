//! Core data types for meme templates, caption regions, and draw plans.

use serde::{Deserialize, Serialize};

/// A meme template from the catalog: a hosted image plus the precomputed
/// sentence embedding of its title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub embedding: Vec<f32>,
}

/// A rectangle region in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    /// Shrink the rectangle by `margin` pixels on each side, clamping so the
    /// result never becomes empty.
    pub fn inset(&self, margin: u32) -> Rect {
        let dx = margin.min(self.w.saturating_sub(1) / 2);
        let dy = margin.min(self.h.saturating_sub(1) / 2);
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            w: self.w - 2 * dx,
            h: self.h - 2 * dy,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
}

/// Caption ink color, chosen for contrast against the region it goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextColor {
    Black,
    White,
}

/// Where the caption block sits vertically inside its region.
///
/// A detected caption box centers its text; the full-image fallback anchors
/// the last line at the bottom edge, where photo-meme captions go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAnchor {
    Center,
    Bottom,
}

/// The caption area derived from a template image. Never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CaptionRegion {
    pub rect: Rect,
    pub color: TextColor,
    pub anchor: VerticalAnchor,
}

/// One laid-out caption line with its absolute baseline origin.
///
/// Coordinates are signed: a single word wider than its region is kept
/// whole, so its origin may fall left of the region. The rasterizer clips
/// at the image edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawCommand {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

/// Best catalog match for a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMatch {
    pub id: String,
    pub url: String,
    pub similarity: f32,
}

/// Errors that can occur in the meme composition library.
#[derive(thiserror::Error, Debug)]
pub enum MemeError {
    #[error("catalog has no templates")]
    EmptyCatalog,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

/// Convenience result type.
pub type MemeResult<T> = Result<T, MemeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inset_normal() {
        let r = Rect { x: 50, y: 40, w: 150, h: 80 };
        let inner = r.inset(10);
        assert_eq!(inner, Rect { x: 60, y: 50, w: 130, h: 60 });
    }

    #[test]
    fn test_inset_clamps_small_rect() {
        let r = Rect { x: 0, y: 0, w: 12, h: 5 };
        let inner = r.inset(10);
        assert!(inner.w >= 1 && inner.h >= 1);
        assert!(inner.right() <= r.right());
        assert!(inner.bottom() <= r.bottom());
    }

    #[test]
    fn test_inset_one_pixel() {
        let r = Rect { x: 3, y: 3, w: 1, h: 1 };
        assert_eq!(r.inset(10), r);
    }
}
