//! Text embedding abstraction.

use crate::types::MemeResult;

/// Embedding dimension produced by the bundled MiniLM model.
pub const EMBEDDING_DIM: usize = 384;

/// Turns a piece of text into a dense vector for similarity search.
///
/// Implementations must be safe to call from a blocking worker thread.
pub trait TextEmbedder: Send + Sync {
    /// Embed a single text into a vector. The result should be
    /// L2-normalized so that dot product equals cosine similarity.
    fn embed(&self, text: &str) -> MemeResult<Vec<f32>>;

    /// Dimension of the vectors this embedder produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}
