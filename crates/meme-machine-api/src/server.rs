//! HTTP surface: router, handlers, and the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::pipeline::MemePipeline;

/// Body of `POST /generate_meme`.
#[derive(Debug, Deserialize)]
pub struct GenerateMemeRequest {
    #[serde(default)]
    pub user_id: String,
    pub prompt: String,
}

/// Success body of `POST /generate_meme`. The JPEG travels inline as
/// base64 so a UI can show it without another round trip.
#[derive(Debug, Serialize)]
pub struct GenerateMemeResponse {
    pub prompt: String,
    pub template_url: String,
    pub caption: String,
    pub image: String,
    pub meme_path: String,
    pub post_url: String,
}

/// Build the axum router with all endpoints.
pub fn router(pipeline: Arc<MemePipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/generate_meme", post(generate_meme))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(pipeline)
}

/// Run the HTTP server until ctrl-c.
pub async fn serve(addr: SocketAddr, pipeline: Arc<MemePipeline>) -> anyhow::Result<()> {
    let app = router(pipeline);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "The Meme Machine is up and running!" }))
}

async fn health(State(pipeline): State<Arc<MemePipeline>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "templates": pipeline.catalog().len(),
    }))
}

async fn generate_meme(
    State(pipeline): State<Arc<MemePipeline>>,
    Json(request): Json<GenerateMemeRequest>,
) -> Result<Json<GenerateMemeResponse>, ApiError> {
    let outcome = pipeline
        .generate(&request.user_id, &request.prompt)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "meme request failed");
            e
        })?;

    Ok(Json(GenerateMemeResponse {
        prompt: outcome.prompt,
        template_url: outcome.template.url,
        caption: outcome.caption,
        image: outcome.image_b64,
        meme_path: outcome.meme_path.display().to_string(),
        post_url: outcome.post_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt; // for `collect`
    use image::DynamicImage;
    use std::path::Path;
    use tower::ServiceExt; // for `oneshot`

    use meme_machine::{BlockFont, MemeResult, TemplateCatalog, TemplateRecord, WrapMode};

    use crate::fetch::{FetchError, ImageSource};
    use crate::generate::{CaptionWriter, GenerateError, PromptModerator, Verdict};
    use crate::publish::{MemePublisher, PublishError};

    struct FixedEmbedder(Vec<f32>);

    impl meme_machine::TextEmbedder for FixedEmbedder {
        fn embed(&self, _text: &str) -> MemeResult<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn dimensions(&self) -> usize {
            self.0.len()
        }
    }

    struct StaticCaption(&'static str);

    #[async_trait]
    impl CaptionWriter for StaticCaption {
        async fn write_caption(&self, _prompt: &str) -> Result<String, GenerateError> {
            Ok(self.0.to_string())
        }
    }

    struct Always(Verdict);

    #[async_trait]
    impl PromptModerator for Always {
        async fn review(&self, _prompt: &str) -> Result<Verdict, GenerateError> {
            Ok(self.0)
        }
    }

    struct LocalImage(DynamicImage);

    #[async_trait]
    impl ImageSource for LocalImage {
        async fn fetch(&self, _url: &str) -> Result<DynamicImage, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct FixedPost;

    #[async_trait]
    impl MemePublisher for FixedPost {
        async fn publish(&self, _title: &str, _path: &Path) -> Result<String, PublishError> {
            Ok("https://posts.example/abc".to_string())
        }
    }

    fn test_pipeline(dir: &tempfile::TempDir, verdict: Verdict) -> Arc<MemePipeline> {
        let catalog = TemplateCatalog::from_records(vec![TemplateRecord {
            id: "drake".to_string(),
            url: "https://example.com/drake.jpg".to_string(),
            name: Some("Drake".to_string()),
            embedding: vec![1.0, 0.0],
        }])
        .unwrap();

        let template =
            DynamicImage::ImageRgb8(image::RgbImage::from_pixel(300, 200, image::Rgb([40, 40, 40])));

        Arc::new(MemePipeline::new(
            Arc::new(catalog),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Arc::new(Always(verdict)),
            Arc::new(StaticCaption("works on my machine")),
            Arc::new(LocalImage(template)),
            Arc::new(FixedPost),
            BlockFont::new(1),
            WrapMode::WordWrap,
            dir.path().join("images"),
        ))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_pipeline(&dir, Verdict::Allowed));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "The Meme Machine is up and running!");
    }

    #[tokio::test]
    async fn test_health_reports_templates() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_pipeline(&dir, Verdict::Allowed));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["templates"], 1);
    }

    #[tokio::test]
    async fn test_generate_meme_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_pipeline(&dir, Verdict::Allowed));

        let response = app
            .oneshot(post_json(
                "/generate_meme",
                json!({"user_id": "u1", "prompt": "deadline at midnight"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["prompt"], "deadline at midnight");
        assert_eq!(body["template_url"], "https://example.com/drake.jpg");
        assert_eq!(body["caption"], "works on my machine");
        assert_eq!(body["post_url"], "https://posts.example/abc");
        assert!(!body["image"].as_str().unwrap().is_empty());
        assert!(body["meme_path"].as_str().unwrap().ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_generate_meme_empty_prompt_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_pipeline(&dir, Verdict::Allowed));

        let response = app
            .oneshot(post_json(
                "/generate_meme",
                json!({"user_id": "u1", "prompt": "   "}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_generate_meme_rejected_prompt_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_pipeline(&dir, Verdict::Rejected));

        let response = app
            .oneshot(post_json(
                "/generate_meme",
                json!({"user_id": "u1", "prompt": "something unpleasant"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("moderation"));
    }

    #[tokio::test]
    async fn test_generate_meme_overlong_prompt_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_pipeline(&dir, Verdict::Allowed));

        let long_prompt = "a".repeat(301);
        let response = app
            .oneshot(post_json(
                "/generate_meme",
                json!({"user_id": "u1", "prompt": long_prompt}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
