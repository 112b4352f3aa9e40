use crate::{
    answer::{DEFAULT_MAX_UNITS, extract_answer},
    embedding::Embedder,
    error::{Error, Result},
    retriever::{DEFAULT_TOP_K, retrieve_sources},
    vector_db::{Collection, QueryHit},
};

/// An answer together with the chunks it was extracted from.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Retrieved chunks, nearest first.
    pub sources: Vec<QueryHit>,
}

/// Question answering over one collection.
///
/// Holds the embedder and collection handle for the life of the process so
/// neither is rebuilt per question.
#[derive(Debug)]
pub struct Pipeline<E> {
    embedder: E,
    collection: Collection,
    top_k: usize,
    max_units: usize,
}

impl<E: Embedder> Pipeline<E> {
    pub fn new(embedder: E, collection: Collection) -> Self {
        Self {
            embedder,
            collection,
            top_k: DEFAULT_TOP_K,
            max_units: DEFAULT_MAX_UNITS,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_max_units(mut self, max_units: usize) -> Self {
        self.max_units = max_units;
        self
    }

    /// Retrieve chunks for `question` and extract an answer from them.
    ///
    /// A failed retrieval is returned as [`Error::Retrieval`] carrying the
    /// user-facing message. A question with nothing relevant is not an
    /// error: it gets the not-found answer.
    pub fn answer(&mut self, question: &str) -> Result<Answer> {
        let retrieval = retrieve_sources(
            question,
            &mut self.embedder,
            &self.collection,
            self.top_k,
        );
        if let Some(message) = retrieval.error {
            return Err(Error::Retrieval(message));
        }

        let texts: Vec<&str> = retrieval
            .chunks
            .iter()
            .map(|hit| hit.document.as_str())
            .collect();
        let text = extract_answer(question, &texts, self.max_units);
        tracing::debug!(
            question,
            retrieved = texts.len(),
            "answered question"
        );

        Ok(Answer {
            text,
            sources: retrieval.chunks,
        })
    }
}
