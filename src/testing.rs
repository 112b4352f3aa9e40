//! Deterministic stand-ins shared by unit and integration tests.

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::Path,
};

use crate::{
    embedding::Embedder,
    error::{Error, Result},
    text_util::tokenize,
};

const DIMENSION: usize = 64;

/// Bag-of-words embedder: each token bumps one hashed bucket, so texts
/// sharing words end up close under cosine distance.
#[derive(Debug, Default)]
pub struct BagOfWordsEmbedder {
    /// Number of `embed` calls so far.
    pub calls: usize,
}

impl Embedder for BagOfWordsEmbedder {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls += 1;
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

/// Embedder that always fails.
#[derive(Debug, Default)]
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&mut self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::Embedding("model unavailable".into()))
    }
}

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    for token in tokenize(text) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        vector[(hasher.finish() % DIMENSION as u64) as usize] += 1.0;
    }
    vector
}

/// Build a small, valid PDF with one Helvetica text line per page.
pub fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    for (i, text) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", escape(text));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}\nendstream",
            stream.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(
            format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes(),
        );
    }

    let xref_offset = out.len();
    out.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1)
            .as_bytes(),
    );
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\n\
             startxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );

    out
}

/// Write [`minimal_pdf`] output to `path`.
pub fn write_pdf(path: &Path, pages: &[&str]) -> std::io::Result<()> {
    std::fs::write(path, minimal_pdf(pages))
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}
