use std::{path::Path, sync::Arc};

use rayon::prelude::*;
use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    TableDefinition,
    TableError,
};
use serde::{Deserialize, Serialize};

use crate::{
    embedding::cosine_distance,
    error::{Error, Result},
};

/// Default name of the collection written by ingestion and read by queries.
pub const DEFAULT_COLLECTION: &str = "company_kb";

/// Suffix of the table holding a collection's vectors.
const VECTORS_SUFFIX: &str = "::vectors";

/// Header size: 4 bytes embedding dimension.
const HEADER_SIZE: usize = 4;

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File name of the source PDF.
    pub source: String,
    /// 1-based page number.
    pub page: u32,
    /// 0-based chunk index within the page.
    pub chunk: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    document: String,
    metadata: ChunkMetadata,
}

/// One nearest-neighbor result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query vector (smaller is closer).
    pub distance: f32,
}

/// An embedded vector database holding named collections of chunks.
///
/// Each collection is two redb tables: one mapping chunk id to the JSON
/// encoded text and metadata, and one mapping chunk id to its vector.
///
/// Vector format per entry:
/// - 4 bytes: embedding dimension D (u32 LE)
/// - D * 4 bytes: f32 LE values
#[derive(Clone)]
pub struct VectorDb {
    db: Arc<Database>,
}

impl VectorDb {
    /// Open or create a vector database at the given path.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use askdocs::VectorDb;
    ///
    /// let db = VectorDb::open(&tmp.path().join("index.redb")).unwrap();
    /// assert!(!db.drop_collection("company_kb").unwrap());
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Open a database that ingestion has already written.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound {
                kind: "index",
                name: path.display().to_string(),
            });
        }
        let db = Database::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Drop a collection and all its records.
    ///
    /// Returns `false` when there was nothing to drop.
    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        let vectors_name = vectors_table_name(name);
        let txn = self.db.begin_write()?;
        let dropped_docs = txn.delete_table(docs_table(name))?;
        let dropped_vectors = txn.delete_table(vectors_table(&vectors_name))?;
        txn.commit()?;
        Ok(dropped_docs || dropped_vectors)
    }

    /// Create an empty collection, or open it if it already exists.
    pub fn create_collection(&self, name: &str) -> Result<Collection> {
        let collection = Collection::new(self.db.clone(), name);

        let txn = self.db.begin_write()?;
        txn.open_table(collection.docs())?;
        txn.open_table(collection.vectors())?;
        txn.commit()?;

        Ok(collection)
    }

    /// Open an existing collection.
    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        let collection = Collection::new(self.db.clone(), name);

        let txn = self.db.begin_read()?;
        match txn.open_table(collection.docs()) {
            Ok(_) => Ok(collection),
            Err(TableError::TableDoesNotExist(_)) => Err(Error::NotFound {
                kind: "collection",
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for VectorDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDb").finish_non_exhaustive()
    }
}

fn vectors_table_name(name: &str) -> String {
    format!("{name}{VECTORS_SUFFIX}")
}

type RecordTable<'a> = TableDefinition<'a, &'static str, &'static [u8]>;

fn docs_table(name: &str) -> RecordTable<'_> {
    TableDefinition::new(name)
}

fn vectors_table(name: &str) -> RecordTable<'_> {
    TableDefinition::new(name)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes =
        Vec::with_capacity(HEADER_SIZE + std::mem::size_of_val(vector));
    bytes.extend_from_slice(&(vector.len() as u32).to_le_bytes());
    bytes.extend_from_slice(bytemuck::cast_slice(vector));
    bytes
}

fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() < HEADER_SIZE {
        return None;
    }
    let dimension =
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if bytes.len() != HEADER_SIZE + dimension * 4 {
        return None;
    }
    // Stored values are not guaranteed to be 4-byte aligned.
    Some(bytemuck::pod_collect_to_vec(&bytes[HEADER_SIZE..]))
}

/// A handle to one named collection.
#[derive(Clone)]
pub struct Collection {
    db: Arc<Database>,
    name: String,
    vectors_name: String,
}

impl Collection {
    fn new(db: Arc<Database>, name: &str) -> Self {
        Self {
            db,
            name: name.to_string(),
            vectors_name: vectors_table_name(name),
        }
    }

    fn docs(&self) -> RecordTable<'_> {
        docs_table(&self.name)
    }

    fn vectors(&self) -> RecordTable<'_> {
        vectors_table(&self.vectors_name)
    }

    /// Insert records in a single transaction. Existing ids are overwritten.
    ///
    /// All slices must have the same length.
    pub fn add(
        &self,
        ids: &[String],
        documents: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
    ) -> Result<()> {
        let n = ids.len();
        if documents.len() != n
            || embeddings.len() != n
            || metadatas.len() != n
        {
            return Err(Error::Config(format!(
                "mismatched record batch: {n} ids, {} documents, \
                 {} embeddings, {} metadatas",
                documents.len(),
                embeddings.len(),
                metadatas.len()
            )));
        }
        if n == 0 {
            return Ok(());
        }

        let txn = self.db.begin_write()?;
        {
            let mut docs = txn.open_table(self.docs())?;
            let mut vectors = txn.open_table(self.vectors())?;
            for i in 0..n {
                let stored = serde_json::to_vec(&StoredDocument {
                    document: documents[i].clone(),
                    metadata: metadatas[i].clone(),
                })?;
                docs.insert(ids[i].as_str(), stored.as_slice())?;
                let vector = encode_vector(&embeddings[i]);
                vectors.insert(ids[i].as_str(), vector.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Number of records in the collection.
    pub fn count(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(self.docs())?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Fetch a single record's text and metadata.
    pub fn get(&self, id: &str) -> Result<Option<(String, ChunkMetadata)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(self.docs())?;
        let Some(guard) = table.get(id)? else {
            return Ok(None);
        };
        let stored: StoredDocument = serde_json::from_slice(guard.value())?;
        Ok(Some((stored.document, stored.metadata)))
    }

    /// Return the `n_results` records closest to `embedding`, nearest first.
    ///
    /// Every stored vector is compared (exact search). A stored vector whose
    /// dimension differs from the query is an error: the collection was built
    /// with a different model.
    pub fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryHit>> {
        let txn = self.db.begin_read()?;

        let mut stored = Vec::new();
        {
            let vectors = txn.open_table(self.vectors())?;
            for entry in vectors.iter()? {
                let (key, value) = entry?;
                let id = key.value().to_string();
                let vector = decode_vector(value.value()).ok_or_else(|| {
                    Error::Config(format!("corrupt vector for '{id}'"))
                })?;
                if vector.len() != embedding.len() {
                    return Err(Error::Config(format!(
                        "embedding dimension mismatch: \
                         collection has {}, query has {}",
                        vector.len(),
                        embedding.len()
                    )));
                }
                stored.push((id, vector));
            }
        }

        let mut ranked: Vec<(String, f32)> = stored
            .into_par_iter()
            .map(|(id, vector)| {
                let distance = cosine_distance(embedding, &vector);
                (id, distance)
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n_results);

        let docs = txn.open_table(self.docs())?;
        let mut hits = Vec::with_capacity(ranked.len());
        for (id, distance) in ranked {
            let Some(guard) = docs.get(id.as_str())? else {
                continue;
            };
            let stored: StoredDocument = serde_json::from_slice(guard.value())?;
            hits.push(QueryHit {
                id,
                document: stored.document,
                metadata: stored.metadata,
                distance,
            });
        }

        Ok(hits)
    }

    /// Like [`Collection::query`] but returns only the document texts.
    pub fn query_documents(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<String>> {
        Ok(self
            .query(embedding, n_results)?
            .into_iter()
            .map(|hit| hit.document)
            .collect())
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, VectorDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = VectorDb::open(&tmp.path().join("index.redb")).unwrap();
        (tmp, db)
    }

    fn meta(page: u32, chunk: u32) -> ChunkMetadata {
        ChunkMetadata {
            source: "handbook.pdf".to_string(),
            page,
            chunk,
        }
    }

    fn seed(collection: &Collection) {
        collection
            .add(
                &["chunk-0".into(), "chunk-1".into(), "chunk-2".into()],
                &["north".into(), "east".into(), "north-east".into()],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
                &[meta(1, 0), meta(1, 1), meta(2, 0)],
            )
            .unwrap();
    }

    #[test]
    fn add_and_get() {
        let (_tmp, db) = test_db();
        let collection = db.create_collection("kb").unwrap();
        seed(&collection);

        assert_eq!(collection.count().unwrap(), 3);
        let (text, metadata) = collection.get("chunk-1").unwrap().unwrap();
        assert_eq!(text, "east");
        assert_eq!(metadata, meta(1, 1));
        assert!(collection.get("chunk-9").unwrap().is_none());
    }

    #[test]
    fn query_orders_by_distance() {
        let (_tmp, db) = test_db();
        let collection = db.create_collection("kb").unwrap();
        seed(&collection);

        let hits = collection.query(&[1.0, 0.1], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "chunk-0");
        assert_eq!(hits[1].id, "chunk-2");
        assert!(hits[0].distance <= hits[1].distance);
        assert_eq!(hits[1].metadata, meta(2, 0));

        let docs = collection.query_documents(&[0.0, 1.0], 1).unwrap();
        assert_eq!(docs, vec!["east"]);
    }

    #[test]
    fn query_more_than_stored_returns_all() {
        let (_tmp, db) = test_db();
        let collection = db.create_collection("kb").unwrap();
        seed(&collection);

        assert_eq!(collection.query(&[1.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn query_empty_collection() {
        let (_tmp, db) = test_db();
        let collection = db.create_collection("kb").unwrap();
        assert!(collection.query(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let (_tmp, db) = test_db();
        let collection = db.create_collection("kb").unwrap();
        seed(&collection);

        let err = collection.query(&[1.0, 0.0, 0.0], 5).unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }

    #[test]
    fn mismatched_batch_is_rejected() {
        let (_tmp, db) = test_db();
        let collection = db.create_collection("kb").unwrap();
        let err = collection
            .add(&["chunk-0".into()], &[], &[vec![1.0]], &[meta(1, 0)])
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn drop_collection_removes_everything() {
        let (_tmp, db) = test_db();
        let collection = db.create_collection("kb").unwrap();
        seed(&collection);

        assert!(db.drop_collection("kb").unwrap());
        assert!(!db.drop_collection("kb").unwrap());
        assert!(matches!(
            db.get_collection("kb"),
            Err(Error::NotFound { kind: "collection", .. })
        ));

        let fresh = db.create_collection("kb").unwrap();
        assert_eq!(fresh.count().unwrap(), 0);
    }

    #[test]
    fn collections_are_independent() {
        let (_tmp, db) = test_db();
        let a = db.create_collection("a").unwrap();
        let b = db.create_collection("b").unwrap();
        seed(&a);

        assert_eq!(a.count().unwrap(), 3);
        assert_eq!(b.count().unwrap(), 0);
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.redb");

        {
            let db = VectorDb::open(&path).unwrap();
            seed(&db.create_collection("kb").unwrap());
        }

        {
            let db = VectorDb::open_existing(&path).unwrap();
            let collection = db.get_collection("kb").unwrap();
            assert_eq!(collection.count().unwrap(), 3);
        }
    }

    #[test]
    fn open_existing_requires_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = VectorDb::open_existing(&tmp.path().join("index.redb"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "index", .. }));
    }

    #[test]
    fn vector_encoding_roundtrip() {
        let bytes = encode_vector(&[0.5, -1.0, 2.0]);
        assert_eq!(bytes.len(), HEADER_SIZE + 12);
        assert_eq!(decode_vector(&bytes).unwrap(), vec![0.5, -1.0, 2.0]);
        assert!(decode_vector(&bytes[..5]).is_none());
    }
}
