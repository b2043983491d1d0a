//! Meme Machine core: template matching, caption region detection, text
//! layout, and rendering.

pub mod catalog;
pub mod compose;
pub mod embedder;
pub mod embedding;
pub mod font;
pub mod layout;
pub mod matcher;
pub mod region;
pub mod render;
pub mod types;

pub use catalog::TemplateCatalog;
pub use compose::{compose_meme, ComposedMeme};
pub use embedder::{TextEmbedder, EMBEDDING_DIM};
pub use embedding::LocalTextEmbedder;
pub use font::{BlockFont, FontMetrics};
pub use layout::{layout_caption, wrap_caption, WrapMode};
pub use matcher::{cosine_similarity, match_template, rank_templates};
pub use region::{detect_caption_region, CAPTION_MARGIN, MIN_CAPTION_AREA, WHITE_THRESHOLD};
pub use render::{draw_caption, encode_jpeg, JPEG_QUALITY};
pub use types::*;
