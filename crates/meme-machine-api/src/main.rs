//! Meme Machine command line entry point.
//!
//! The default subcommand starts the HTTP service. The remaining
//! subcommands are offline helpers for working with catalogs and
//! composing captions onto local images without a running server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use meme_machine::{
    compose_meme, encode_jpeg, rank_templates, BlockFont, LocalTextEmbedder, TemplateCatalog,
    TextEmbedder,
};
use meme_machine_api::config::{self, parse_wrap_mode, MemeConfig};
use meme_machine_api::fetch::HttpImageSource;
use meme_machine_api::generate::{
    AllowAll, CaptionWriter, EchoCaptioner, GeminiClient, PromptModerator,
};
use meme_machine_api::pipeline::MemePipeline;
use meme_machine_api::publish::{DiskPublisher, MemePublisher, WebhookPublisher};
use meme_machine_api::server;

#[derive(Parser)]
#[command(name = "meme-machine", version, about = "Turn a one-line idea into a captioned meme")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service (default).
    Serve {
        /// Listen address (host:port), overriding the configuration.
        #[arg(long)]
        addr: Option<String>,
    },
    /// Caption a local image without the model or the network.
    Compose {
        /// Path to the template image.
        image: String,

        /// Caption text to lay out on the image.
        caption: String,

        /// Output JPEG path.
        #[arg(short, long, default_value = "meme.jpg")]
        out: String,

        /// Wrap strategy: word or single.
        #[arg(long, default_value = "word")]
        wrap: String,

        /// Font scale in pixels per font dot.
        #[arg(long, default_value_t = 3)]
        font_scale: u32,
    },
    /// Rank catalog templates against a prompt.
    Match {
        /// The idea to match templates against.
        prompt: String,

        /// How many templates to show.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Check that a template catalog loads cleanly.
    Validate {
        /// Catalog path, overriding the configuration.
        catalog: Option<String>,
    },
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);
    let mut config = MemeConfig::load_from(&config_path)?;

    let default_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.server.log_level.clone());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve { addr: None }) {
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            run_serve(config).await
        }
        Commands::Compose {
            image,
            caption,
            out,
            wrap,
            font_scale,
        } => run_compose(&image, &caption, &out, &wrap, font_scale),
        Commands::Match { prompt, top } => run_match(&config, &prompt, top),
        Commands::Validate { catalog } => {
            let path = catalog.unwrap_or_else(|| config.catalog.path.clone());
            run_validate(&path);
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "meme-machine",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

/// Load everything the pipeline needs and serve HTTP until shutdown.
async fn run_serve(config: MemeConfig) -> anyhow::Result<()> {
    let addr = config.listen_addr()?;

    let catalog = TemplateCatalog::load(Path::new(&config.catalog.path))
        .with_context(|| format!("failed to load template catalog from {}", config.catalog.path))?;
    tracing::info!(
        templates = catalog.len(),
        dimensions = catalog.dimensions(),
        path = %config.catalog.path,
        "template catalog loaded"
    );

    let embedder: Arc<dyn TextEmbedder> = Arc::new(LocalTextEmbedder::new(
        Path::new(&config.embedding.model_path),
        Path::new(&config.embedding.tokenizer_path),
    )?);
    check_embedding_dimensions(&catalog, embedder.as_ref())?;

    // Without an API key the service still runs, with deterministic
    // stand-ins for captioning and moderation.
    let gemini = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Some(Arc::new(GeminiClient::new(
            config.caption.api_base.clone(),
            config.caption.model.clone(),
            key,
            config.caption.max_words,
        )?)),
        _ => {
            tracing::warn!("GEMINI_API_KEY not set, using echo captions and allow-all moderation");
            None
        }
    };

    let captioner: Arc<dyn CaptionWriter> = match &gemini {
        Some(client) => client.clone(),
        None => Arc::new(EchoCaptioner::new(config.caption.max_words)),
    };

    let moderator: Arc<dyn PromptModerator> = if !config.moderation.enabled {
        tracing::warn!("prompt moderation disabled by configuration");
        Arc::new(AllowAll)
    } else {
        match &gemini {
            Some(client) => client.clone(),
            None => Arc::new(AllowAll),
        }
    };

    let publisher: Arc<dyn MemePublisher> = match config.publish.mode.as_str() {
        "disk" => Arc::new(DiskPublisher),
        "webhook" => {
            let url = config
                .publish
                .webhook_url
                .clone()
                .context("publish.mode is \"webhook\" but publish.webhook_url is not set")?;
            Arc::new(WebhookPublisher::new(url)?)
        }
        other => anyhow::bail!("unknown publish mode {other:?} (expected \"disk\" or \"webhook\")"),
    };

    let pipeline = MemePipeline::new(
        Arc::new(catalog),
        embedder,
        moderator,
        captioner,
        Arc::new(HttpImageSource::new()?),
        publisher,
        BlockFont::new(config.compose.font_scale),
        config.wrap_mode(),
        PathBuf::from(&config.compose.output_dir),
    );

    server::serve(addr, Arc::new(pipeline)).await
}

/// Caption a local image and write the JPEG, entirely offline.
fn run_compose(
    image: &str,
    caption: &str,
    out: &str,
    wrap: &str,
    font_scale: u32,
) -> anyhow::Result<()> {
    let img = image::open(image).with_context(|| format!("failed to open image {image}"))?;
    let font = BlockFont::new(font_scale);
    let composed = compose_meme(&img, caption, &font, parse_wrap_mode(wrap));
    let jpeg = encode_jpeg(&composed.image)?;

    let out_path = Path::new(out);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out_path, &jpeg).with_context(|| format!("failed to write {out}"))?;

    let region = composed.region;
    println!("Wrote {out}");
    println!(
        "  Caption region: {}x{} at ({}, {}) in {:?}",
        region.rect.w, region.rect.h, region.rect.x, region.rect.y, region.color
    );
    println!("  Lines: {}", composed.lines);
    Ok(())
}

/// Embed the prompt and print the closest catalog templates.
fn run_match(config: &MemeConfig, prompt: &str, top: usize) -> anyhow::Result<()> {
    let catalog = TemplateCatalog::load(Path::new(&config.catalog.path))
        .with_context(|| format!("failed to load template catalog from {}", config.catalog.path))?;
    let embedder = LocalTextEmbedder::new(
        Path::new(&config.embedding.model_path),
        Path::new(&config.embedding.tokenizer_path),
    )?;
    check_embedding_dimensions(&catalog, &embedder)?;

    let ranked = rank_templates(&embedder, prompt, &catalog, top)?;
    for (rank, m) in ranked.iter().enumerate() {
        println!("{:>2}. {:<28} {:.4}  {}", rank + 1, m.id, m.similarity, m.url);
    }
    Ok(())
}

/// Load a catalog and print its stats, exiting nonzero when it is broken.
fn run_validate(path: &str) {
    match TemplateCatalog::load(Path::new(path)) {
        Ok(catalog) => {
            println!("Valid catalog: {path}");
            println!("  Templates: {}", catalog.len());
            match catalog.dimensions() {
                Some(dim) => println!("  Embedding dimensions: {dim}"),
                None => println!("  Embedding dimensions: (empty)"),
            }
        }
        Err(err) => {
            eprintln!("Invalid catalog {path}: {err}");
            std::process::exit(1);
        }
    }
}

/// Refuse a catalog whose embeddings do not match the model's output size.
/// Every similarity would come out 0.0 and the first record would always win.
fn check_embedding_dimensions(
    catalog: &TemplateCatalog,
    embedder: &dyn TextEmbedder,
) -> anyhow::Result<()> {
    let model_dim = embedder.dimensions();
    if let Some(dim) = catalog.dimensions() {
        if dim != model_dim {
            anyhow::bail!(
                "catalog embeddings have {dim} dimensions but the model produces {model_dim}; \
                 rebuild the catalog with the serving model"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct FixedDims(usize);

    impl TextEmbedder for FixedDims {
        fn embed(&self, _text: &str) -> meme_machine::MemeResult<Vec<f32>> {
            Ok(vec![0.0; self.0])
        }

        fn dimensions(&self) -> usize {
            self.0
        }
    }

    fn record_with_dims(dims: usize) -> meme_machine::TemplateRecord {
        meme_machine::TemplateRecord {
            id: "classic".to_string(),
            url: "https://example.com/classic.png".to_string(),
            name: None,
            embedding: vec![0.5; dims],
        }
    }

    #[test]
    fn test_dimension_check_rejects_mismatched_catalog() {
        let catalog = TemplateCatalog::from_records(vec![record_with_dims(3)]).unwrap();
        let err = check_embedding_dimensions(&catalog, &FixedDims(384)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("3 dimensions") && msg.contains("384"), "got {msg}");
    }

    #[test]
    fn test_dimension_check_accepts_matching_and_empty() {
        let three = TemplateCatalog::from_records(vec![record_with_dims(3)]).unwrap();
        assert!(check_embedding_dimensions(&three, &FixedDims(3)).is_ok());

        let empty = TemplateCatalog::from_records(vec![]).unwrap();
        assert!(check_embedding_dimensions(&empty, &FixedDims(384)).is_ok());
    }

    #[test]
    fn test_run_compose_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.png");
        RgbImage::from_pixel(120, 80, Rgb([40, 40, 40]))
            .save(&template)
            .unwrap();

        let out = dir.path().join("out/meme.jpg");
        run_compose(
            template.to_str().unwrap(),
            "hello there",
            out.to_str().unwrap(),
            "word",
            1,
        )
        .unwrap();

        let written = image::open(&out).unwrap();
        assert_eq!(written.width(), 120);
        assert_eq!(written.height(), 80);
    }

    #[test]
    fn test_run_compose_missing_image_errors() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("meme.jpg");
        let result = run_compose("/nonexistent/template.png", "hi", out.to_str().unwrap(), "word", 1);
        assert!(result.is_err());
        assert!(!out.exists());
    }
}
