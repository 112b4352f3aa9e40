//! askdocs - question answering over a folder of PDF documents.
//!
//! PDFs are split into overlapping chunks, embedded with a
//! sentence-transformer model and stored in an embedded
//! [redb](https://github.com/cberner/redb) vector store. Questions are
//! answered extractively: the nearest chunks are split into sentences and
//! the sentences sharing the most keywords with the question are returned.
//!
//! # Quick start
//!
//! ```no_run
//! use askdocs::{DataDir, IngestOptions, ModelManager, Pipeline, VectorDb};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let db = VectorDb::open(&data_dir.index_db()).unwrap();
//! let mut model = ModelManager::new();
//!
//! askdocs::ingestion::ingest(
//!     "docs".as_ref(),
//!     &mut model,
//!     &db,
//!     "company_kb",
//!     &IngestOptions::default(),
//! )
//! .unwrap();
//!
//! let collection = db.get_collection("company_kb").unwrap();
//! let mut pipeline = Pipeline::new(model, collection);
//! let answer = pipeline
//!     .answer("How many sick leaves do employees get?")
//!     .unwrap();
//! println!("{}", answer.text);
//! ```

pub mod answer;
pub mod chat;
pub mod chunking;
pub mod cli;
pub mod data_dir;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod model_manager;
pub mod pdf;
pub mod pipeline;
pub mod remote;
pub mod retriever;
pub mod server;
#[doc(hidden)]
pub mod testing;
pub mod text_util;
pub mod vector_db;
pub mod walker;

pub use data_dir::DataDir;
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use ingestion::{IngestOptions, IngestOutcome, IngestReport};
pub use model_manager::ModelManager;
pub use pipeline::{Answer, Pipeline};
pub use vector_db::{ChunkMetadata, Collection, QueryHit, VectorDb};
