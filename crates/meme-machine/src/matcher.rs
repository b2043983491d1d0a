//! Template matching: pick the catalog entry closest to a prompt embedding.

use crate::catalog::TemplateCatalog;
use crate::embedder::TextEmbedder;
use crate::types::{MemeError, MemeResult, TemplateMatch};

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Fail when the query embedding cannot be compared against the catalog.
/// Without this, every similarity is 0.0 and the first record always wins.
fn check_query_dimensions(query: &[f32], catalog: &TemplateCatalog) -> MemeResult<()> {
    match catalog.dimensions() {
        Some(dim) if dim != query.len() => Err(MemeError::Catalog(format!(
            "catalog embeddings have {dim} dimensions but the query has {}",
            query.len()
        ))),
        _ => Ok(()),
    }
}

/// Embed the prompt and return the single best-matching template.
///
/// Every prompt matches something: there is no similarity floor, a weak
/// best match is still the best match. Ties keep the earliest record.
/// A query whose length differs from the catalog's dimensionality is a
/// `Catalog` error, not a zero-similarity scan.
pub fn match_template(
    embedder: &dyn TextEmbedder,
    prompt: &str,
    catalog: &TemplateCatalog,
) -> MemeResult<TemplateMatch> {
    if catalog.is_empty() {
        return Err(MemeError::EmptyCatalog);
    }

    let query = embedder.embed(prompt)?;
    check_query_dimensions(&query, catalog)?;

    let records = catalog.records();
    let mut best = &records[0];
    let mut best_similarity = cosine_similarity(&query, &best.embedding);

    for record in &records[1..] {
        let similarity = cosine_similarity(&query, &record.embedding);
        if similarity > best_similarity {
            best = record;
            best_similarity = similarity;
        }
    }

    Ok(TemplateMatch {
        id: best.id.clone(),
        url: best.url.clone(),
        similarity: best_similarity,
    })
}

/// Embed the prompt and return the top-k templates by similarity,
/// best first. Ties preserve catalog order. Dimensions are checked the
/// same way as [`match_template`].
pub fn rank_templates(
    embedder: &dyn TextEmbedder,
    prompt: &str,
    catalog: &TemplateCatalog,
    top_k: usize,
) -> MemeResult<Vec<TemplateMatch>> {
    if catalog.is_empty() {
        return Err(MemeError::EmptyCatalog);
    }

    let query = embedder.embed(prompt)?;
    check_query_dimensions(&query, catalog)?;

    let mut matches: Vec<TemplateMatch> = catalog
        .records()
        .iter()
        .map(|r| TemplateMatch {
            id: r.id.clone(),
            url: r.url.clone(),
            similarity: cosine_similarity(&query, &r.embedding),
        })
        .collect();

    matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_k);
    Ok(matches)
}
