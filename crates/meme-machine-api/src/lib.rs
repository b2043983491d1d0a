//! HTTP service and capability wiring for the meme generator.
//!
//! The library side of the binary: configuration loading, the LLM and
//! image-fetch capabilities, the generation pipeline, and the axum
//! router. The composition primitives themselves live in the
//! `meme-machine` crate.

pub mod config;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod pipeline;
pub mod publish;
pub mod server;

pub use config::MemeConfig;
pub use error::ApiError;
pub use pipeline::{MemeOutcome, MemePipeline, MAX_PROMPT_CHARS};
