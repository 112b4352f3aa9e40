use std::path::Path;

use kdam::{BarExt, tqdm};
use rayon::prelude::*;

use crate::{
    chunking::{ChunkingConfig, chunk_text},
    embedding::Embedder,
    error::Result,
    pdf::{PageText, read_pages},
    text_util::normalize_whitespace,
    vector_db::{ChunkMetadata, VectorDb},
    walker::discover_pdfs,
};

/// Number of chunks embedded and inserted per batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub batch_size: usize,
    pub chunking: ChunkingConfig,
    /// Draw a progress bar on stderr while embedding.
    pub show_progress: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            chunking: ChunkingConfig::default(),
            show_progress: false,
        }
    }
}

/// A chunk of page text ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// PDF files that could be opened.
    pub files_read: usize,
    /// PDF files that could not be opened at all.
    pub files_skipped: usize,
    /// Pages with no text after whitespace normalization.
    pub pages_skipped: usize,
    /// Pages whose text extraction failed.
    pub pages_failed: usize,
    pub chunks_stored: usize,
    pub batches_written: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// No text was found; the existing collection was left untouched.
    EmptyCorpus(IngestReport),
    /// The collection was replaced with freshly embedded chunks.
    Stored(IngestReport),
}

impl IngestOutcome {
    pub fn report(&self) -> &IngestReport {
        match self {
            IngestOutcome::EmptyCorpus(report)
            | IngestOutcome::Stored(report) => report,
        }
    }
}

/// Read every PDF directly inside `dir` and chunk its pages.
///
/// Records come out in file-name, then page, then chunk order. Files that
/// cannot be opened are logged and skipped; a missing directory is an
/// error.
pub fn collect_chunks(
    dir: &Path,
    chunking: ChunkingConfig,
) -> Result<(Vec<ChunkRecord>, IngestReport)> {
    let files = discover_pdfs(dir)?;
    tracing::debug!(
        dir = %dir.display(),
        files = files.len(),
        "discovered PDF files"
    );

    // Extract in parallel, then chunk sequentially to keep a stable order.
    let extracted: Vec<_> = files
        .par_iter()
        .map(|file| (file, read_pages(&file.path)))
        .collect();

    let mut report = IngestReport::default();
    let mut records = Vec::new();

    for (file, pages) in extracted {
        match pages {
            Ok(pages) => {
                report.files_read += 1;
                records.extend(chunk_pages(
                    &file.name,
                    &pages,
                    chunking,
                    &mut report,
                ));
            }
            Err(e) => {
                tracing::warn!(
                    file = %file.name,
                    error = %e,
                    "skipping unreadable PDF"
                );
                report.files_skipped += 1;
            }
        }
    }

    Ok((records, report))
}

/// Chunk the pages of one file.
///
/// A failed page is logged, counted in `pages_failed` and then handled like
/// an empty page. Page numbers are 1-based positions in `pages`.
fn chunk_pages(
    source: &str,
    pages: &[PageText],
    chunking: ChunkingConfig,
    report: &mut IngestReport,
) -> Vec<ChunkRecord> {
    let mut records = Vec::new();

    for (index, page) in pages.iter().enumerate() {
        let page_number = index as u32 + 1;

        if let PageText::Failed(reason) = page {
            tracing::warn!(
                file = source,
                page = page_number,
                %reason,
                "failed to extract page text"
            );
            report.pages_failed += 1;
        }

        let text = normalize_whitespace(page.text());
        if text.is_empty() {
            report.pages_skipped += 1;
            continue;
        }

        let chunks = chunk_text(&text, chunking.max_chars, chunking.overlap);
        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            records.push(ChunkRecord {
                text: chunk,
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    page: page_number,
                    chunk: chunk_index as u32,
                },
            });
        }
    }

    records
}

/// Rebuild `collection` from the PDFs in `dir`.
///
/// Embedding runs in batches of `batch_size`, but every vector is kept in
/// memory until all batches have been embedded. Only then is the
/// collection dropped, recreated and filled, so a failing embedder leaves
/// the previous index in place. Peak memory therefore grows with the size
/// of the corpus, not with the batch size. Ids are `chunk-<n>` over the
/// global chunk order.
pub fn ingest<E: Embedder>(
    dir: &Path,
    embedder: &mut E,
    db: &VectorDb,
    collection: &str,
    options: &IngestOptions,
) -> Result<IngestOutcome> {
    let (records, mut report) = collect_chunks(dir, options.chunking)?;
    if records.is_empty() {
        tracing::warn!(dir = %dir.display(), "no text found in any PDF");
        return Ok(IngestOutcome::EmptyCorpus(report));
    }

    let batch_size = options.batch_size.max(1);
    let batch_count = records.len().div_ceil(batch_size);
    tracing::info!(
        chunks = records.len(),
        batches = batch_count,
        "embedding chunks"
    );

    let mut bar = tqdm!(
        total = batch_count,
        desc = "Embedding",
        unit = " batch",
        disable = !options.show_progress
    );

    let mut embeddings = Vec::with_capacity(records.len());
    for batch in records.chunks(batch_size) {
        let texts: Vec<String> =
            batch.iter().map(|r| r.text.clone()).collect();
        embeddings.extend(embedder.embed(&texts)?);
        bar.update(1)?;
    }
    if options.show_progress {
        bar.refresh()?;
        eprintln!();
    }

    if db.drop_collection(collection)? {
        tracing::info!(collection, "dropped existing collection");
    }
    let target = db.create_collection(collection)?;

    for (batch_index, (batch, vectors)) in records
        .chunks(batch_size)
        .zip(embeddings.chunks(batch_size))
        .enumerate()
    {
        let offset = batch_index * batch_size;
        let ids: Vec<String> = (offset..offset + batch.len())
            .map(|i| format!("chunk-{i}"))
            .collect();
        let documents: Vec<String> =
            batch.iter().map(|r| r.text.clone()).collect();
        let metadatas: Vec<ChunkMetadata> =
            batch.iter().map(|r| r.metadata.clone()).collect();

        target.add(&ids, &documents, vectors, &metadatas)?;
        report.chunks_stored += batch.len();
        report.batches_written += 1;
    }

    tracing::info!(
        collection,
        chunks = report.chunks_stored,
        files = report.files_read,
        "ingestion complete"
    );

    Ok(IngestOutcome::Stored(report))
}
