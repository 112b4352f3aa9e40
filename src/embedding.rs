use crate::error::{Error, Result};

/// Turns text into fixed-length embedding vectors.
///
/// The same embedder (same model) must be used for ingestion and for
/// queries, otherwise stored and query vectors are not comparable.
pub trait Embedder {
    /// Embed a batch of texts, returning one vector per input in order.
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    fn embed_query(&mut self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::Embedding("no embedding returned".into()))
    }
}

impl<E: Embedder + ?Sized> Embedder for &mut E {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }
}

/// Cosine distance (`1 - cosine similarity`) between two vectors.
///
/// A zero-length vector is treated as unrelated to everything (distance 1).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
