//! Request-level error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::fetch::FetchError;
use crate::generate::GenerateError;
use crate::publish::PublishError;
use meme_machine::MemeError;

/// Everything that can go wrong while serving one meme request.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("prompt is {chars} characters, limit is {limit}")]
    PromptTooLong { chars: usize, limit: usize },

    #[error("prompt rejected by moderation")]
    Rejected,

    #[error("template fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("generation failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Meme(#[from] MemeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::EmptyPrompt | ApiError::PromptTooLong { .. } | ApiError::Rejected => {
                StatusCode::BAD_REQUEST
            }

            ApiError::Fetch(_) => StatusCode::BAD_GATEWAY,

            ApiError::Generate(_)
            | ApiError::Publish(_)
            | ApiError::Meme(_)
            | ApiError::Io(_)
            | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
