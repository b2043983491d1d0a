//! Sentence embedding via ONNX Runtime.
//!
//! Runs all-MiniLM-L6-v2 locally: tokenize, infer, mean-pool under the
//! attention mask, L2 normalize. Produces the same vectors the catalog's
//! precomputed template embeddings were built with.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use crate::embedder::{TextEmbedder, EMBEDDING_DIM};
use crate::types::{MemeError, MemeResult};

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

/// ONNX-backed sentence embedder using all-MiniLM-L6-v2.
#[derive(Debug)]
pub struct LocalTextEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: the session is only touched under the Mutex, and Tokenizer is
// Send + Sync on its own.
unsafe impl Send for LocalTextEmbedder {}
unsafe impl Sync for LocalTextEmbedder {}

impl LocalTextEmbedder {
    /// Load the model and tokenizer from disk.
    pub fn new(model_path: &Path, tokenizer_path: &Path) -> MemeResult<Self> {
        if !model_path.exists() {
            return Err(MemeError::Embedding(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(MemeError::Embedding(format!(
                "Tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(1)?))
            .and_then(|mut b| b.commit_from_file(model_path))
            .map_err(|e| MemeError::Embedding(format!("Failed to load ONNX model: {e}")))?;

        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| MemeError::Embedding(format!("Failed to load tokenizer: {e}")))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| MemeError::Embedding(format!("Failed to set truncation: {e}")))?;

        tracing::info!(tokenizer = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

impl TextEmbedder for LocalTextEmbedder {
    fn embed(&self, text: &str) -> MemeResult<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| MemeError::Embedding(format!("Tokenization failed: {e}")))?;

        let seq_len = encoding.get_ids().len();
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids = vec![0i64; seq_len];

        let shape = vec![1i64, seq_len as i64];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| MemeError::Embedding(format!("Failed to create input tensor: {e}")))?;
        // The mask vec is reused below for mean pooling, so the tensor gets a copy.
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
                .map_err(|e| MemeError::Embedding(format!("Failed to create input tensor: {e}")))?;
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
                .map_err(|e| MemeError::Embedding(format!("Failed to create input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| MemeError::Embedding(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            })
            .map_err(|e| MemeError::Embedding(format!("ONNX inference failed: {e}")))?;

        // Output name varies by ONNX export. Try common names, fall back to index 0.
        let token_embeddings = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (out_shape, data) = token_embeddings
            .try_extract_tensor::<f32>()
            .map_err(|e| MemeError::Embedding(format!("Failed to extract output: {e}")))?;

        let dims: &[i64] = &out_shape;
        if dims.len() != 3 || dims[2] != EMBEDDING_DIM as i64 {
            return Err(MemeError::Embedding(format!(
                "Unexpected output shape {dims:?}, expected [1, seq, {EMBEDDING_DIM}]"
            )));
        }
        let hidden_dim = dims[2] as usize;
        let actual_seq_len = dims[1] as usize;

        // Mean pooling over real tokens only.
        let mut sum = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;
        for s in 0..actual_seq_len.min(seq_len) {
            let mask = attention_mask[s] as f32;
            if mask > 0.0 {
                let offset = s * hidden_dim;
                for d in 0..hidden_dim {
                    sum[d] += data[offset + d] * mask;
                }
                count += mask;
            }
        }
        if count > 0.0 {
            for v in &mut sum {
                *v /= count;
            }
        }

        Ok(l2_normalize(&sum))
    }
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
