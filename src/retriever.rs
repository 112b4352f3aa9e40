use crate::{
    embedding::Embedder,
    error::Result,
    vector_db::{Collection, QueryHit},
};

/// Default number of nearest chunks requested per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Result of a retrieval attempt.
///
/// Query-time faults do not propagate: they leave `chunks` empty and
/// describe the problem in `error`. An empty collection yields no chunks and
/// no error.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval<T = String> {
    pub chunks: Vec<T>,
    pub error: Option<String>,
}

impl<T> Retrieval<T> {
    fn from_result(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(chunks) => Self {
                chunks,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "retrieval failed");
                Self {
                    chunks: Vec::new(),
                    error: Some(format!("Error querying vector store: {e}")),
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Embed `question` and fetch the texts of the `top_k` nearest chunks,
/// nearest first.
pub fn retrieve_chunks<E: Embedder>(
    question: &str,
    embedder: &mut E,
    collection: &Collection,
    top_k: usize,
) -> Retrieval {
    Retrieval::from_result(
        embedder
            .embed_query(question)
            .and_then(|vector| collection.query_documents(&vector, top_k)),
    )
}

/// Same lookup as [`retrieve_chunks`], keeping each hit's id, metadata and
/// distance.
pub fn retrieve_sources<E: Embedder>(
    question: &str,
    embedder: &mut E,
    collection: &Collection,
    top_k: usize,
) -> Retrieval<QueryHit> {
    Retrieval::from_result(
        embedder
            .embed_query(question)
            .and_then(|vector| collection.query(&vector, top_k)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{BagOfWordsEmbedder, FailingEmbedder, bag_of_words},
        vector_db::{ChunkMetadata, VectorDb},
    };

    const TEXTS: [&str; 3] = [
        "Employees get 12 sick leaves per year.",
        "Working hours are 9 to 6.",
        "The WFH policy allows two remote days per week.",
    ];

    fn seeded() -> (tempfile::TempDir, VectorDb, Collection) {
        let tmp = tempfile::tempdir().unwrap();
        let db = VectorDb::open(&tmp.path().join("index.redb")).unwrap();
        let collection = db.create_collection("kb").unwrap();

        let ids: Vec<String> =
            (0..TEXTS.len()).map(|i| format!("chunk-{i}")).collect();
        let documents: Vec<String> =
            TEXTS.iter().map(|t| t.to_string()).collect();
        let embeddings: Vec<Vec<f32>> =
            TEXTS.iter().map(|t| bag_of_words(t)).collect();
        let metadatas: Vec<ChunkMetadata> = (0..TEXTS.len())
            .map(|i| ChunkMetadata {
                source: "handbook.pdf".into(),
                page: 1,
                chunk: i as u32,
            })
            .collect();
        collection
            .add(&ids, &documents, &embeddings, &metadatas)
            .unwrap();

        (tmp, db, collection)
    }

    #[test]
    fn nearest_chunk_comes_first() {
        let (_tmp, _db, collection) = seeded();
        let mut embedder = BagOfWordsEmbedder::default();

        let retrieval = retrieve_chunks(
            "How many sick leaves do employees get?",
            &mut embedder,
            &collection,
            DEFAULT_TOP_K,
        );

        assert!(retrieval.is_ok());
        assert_eq!(retrieval.chunks.len(), 3);
        assert_eq!(retrieval.chunks[0], TEXTS[0]);
    }

    #[test]
    fn top_k_limits_results() {
        let (_tmp, _db, collection) = seeded();
        let mut embedder = BagOfWordsEmbedder::default();

        let retrieval =
            retrieve_chunks("working hours", &mut embedder, &collection, 1);
        assert_eq!(retrieval.chunks, vec![TEXTS[1].to_string()]);
    }

    #[test]
    fn sources_carry_metadata() {
        let (_tmp, _db, collection) = seeded();
        let mut embedder = BagOfWordsEmbedder::default();

        let retrieval =
            retrieve_sources("WFH policy", &mut embedder, &collection, 1);
        assert!(retrieval.is_ok());
        assert_eq!(retrieval.chunks[0].id, "chunk-2");
        assert_eq!(retrieval.chunks[0].metadata.source, "handbook.pdf");
    }

    #[test]
    fn empty_collection_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let db = VectorDb::open(&tmp.path().join("index.redb")).unwrap();
        let collection = db.create_collection("kb").unwrap();
        let mut embedder = BagOfWordsEmbedder::default();

        let retrieval = retrieve_chunks(
            "anything",
            &mut embedder,
            &collection,
            DEFAULT_TOP_K,
        );
        assert!(retrieval.chunks.is_empty());
        assert!(retrieval.error.is_none());
    }

    #[test]
    fn embedding_failure_is_reported() {
        let (_tmp, _db, collection) = seeded();
        let mut embedder = FailingEmbedder;

        let retrieval = retrieve_chunks(
            "sick leaves",
            &mut embedder,
            &collection,
            DEFAULT_TOP_K,
        );
        assert!(retrieval.chunks.is_empty());
        let error = retrieval.error.unwrap();
        assert!(error.starts_with("Error querying vector store: "));
        assert!(error.contains("model unavailable"));
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        struct Tiny;
        impl Embedder for Tiny {
            fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
            }
        }

        let (_tmp, _db, collection) = seeded();
        let retrieval = retrieve_sources(
            "sick leaves",
            &mut Tiny,
            &collection,
            DEFAULT_TOP_K,
        );
        assert!(retrieval.chunks.is_empty());
        assert!(retrieval.error.unwrap().contains("dimension mismatch"));
    }
}
