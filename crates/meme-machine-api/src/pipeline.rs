//! The request pipeline: moderate, match, caption, fetch, compose, publish.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use meme_machine::{
    compose_meme, encode_jpeg, match_template, BlockFont, MemeError, TemplateCatalog,
    TemplateMatch, TextEmbedder, WrapMode,
};

use crate::error::ApiError;
use crate::fetch::ImageSource;
use crate::generate::{CaptionWriter, PromptModerator, Verdict};
use crate::publish::MemePublisher;

/// Longest accepted prompt, in characters.
pub const MAX_PROMPT_CHARS: usize = 300;

/// Everything a served meme request produces.
#[derive(Debug, Clone)]
pub struct MemeOutcome {
    pub prompt: String,
    pub template: TemplateMatch,
    pub caption: String,
    pub meme_path: PathBuf,
    pub post_url: String,
    pub image_b64: String,
}

/// Owns the capabilities and drives one prompt through to a published meme.
pub struct MemePipeline {
    catalog: Arc<TemplateCatalog>,
    embedder: Arc<dyn TextEmbedder>,
    moderator: Arc<dyn PromptModerator>,
    captioner: Arc<dyn CaptionWriter>,
    images: Arc<dyn ImageSource>,
    publisher: Arc<dyn MemePublisher>,
    font: BlockFont,
    wrap: WrapMode,
    output_dir: PathBuf,
}

impl MemePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        embedder: Arc<dyn TextEmbedder>,
        moderator: Arc<dyn PromptModerator>,
        captioner: Arc<dyn CaptionWriter>,
        images: Arc<dyn ImageSource>,
        publisher: Arc<dyn MemePublisher>,
        font: BlockFont,
        wrap: WrapMode,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            catalog,
            embedder,
            moderator,
            captioner,
            images,
            publisher,
            font,
            wrap,
            output_dir,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Run one prompt end to end. No retries at any step; the first failure
    /// fails the request.
    pub async fn generate(&self, user_id: &str, prompt: &str) -> Result<MemeOutcome, ApiError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::EmptyPrompt);
        }
        let chars = prompt.chars().count();
        if chars > MAX_PROMPT_CHARS {
            return Err(ApiError::PromptTooLong {
                chars,
                limit: MAX_PROMPT_CHARS,
            });
        }

        tracing::info!(user_id, prompt, "meme request");

        if self.moderator.review(prompt).await? == Verdict::Rejected {
            tracing::info!(user_id, "prompt rejected by moderation");
            return Err(ApiError::Rejected);
        }

        // Template matching runs the blocking embedder off the async worker;
        // the caption call is pure I/O. Both proceed at once.
        let match_task = {
            let embedder = Arc::clone(&self.embedder);
            let catalog = Arc::clone(&self.catalog);
            let prompt = prompt.to_string();
            tokio::task::spawn_blocking(move || {
                match_template(embedder.as_ref(), &prompt, &catalog)
            })
        };
        let (matched, caption) = tokio::join!(match_task, self.captioner.write_caption(prompt));
        let template = matched??;
        let caption = caption?;

        tracing::info!(
            template = %template.id,
            similarity = template.similarity,
            caption,
            "template matched"
        );

        let img = self.images.fetch(&template.url).await?;

        let font = self.font;
        let wrap = self.wrap;
        let caption_text = caption.clone();
        let (composed, jpeg) = tokio::task::spawn_blocking(move || {
            let composed = compose_meme(&img, &caption_text, &font, wrap);
            let jpeg = encode_jpeg(&composed.image)?;
            Ok::<_, MemeError>((composed, jpeg))
        })
        .await??;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let meme_path = self.output_dir.join(output_filename());
        tokio::fs::write(&meme_path, &jpeg).await?;

        tracing::info!(
            path = %meme_path.display(),
            lines = composed.lines,
            "meme written"
        );

        let post_url = self.publisher.publish(&caption, &meme_path).await?;
        tracing::info!(post_url, "meme published");

        use base64::Engine;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&jpeg);

        Ok(MemeOutcome {
            prompt: prompt.to_string(),
            template,
            caption,
            meme_path,
            post_url,
            image_b64,
        })
    }
}

/// UTC-timestamped name with a short random suffix so concurrent requests
/// in the same second never collide.
fn output_filename() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}_{}.jpg", Utc::now().format("%Y%m%d_%H%M%S"), &id[..8])
}
