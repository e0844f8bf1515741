//! Document ingestion and retrieval for ragdesk.
//!
//! Loaders turn uploads and fetched web pages into text, the chunker and
//! [`Ingestor`] store them as embedded chunks, and [`Retriever`] answers
//! queries against a selected knowledge base with a re-ranking pass.
//! [`RetrieverTool`] exposes retrieval to the agent graph.

pub mod chunker;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod reranker;
pub mod retriever;
pub mod selector;
pub mod sources;
pub mod tool;
pub mod web;

pub use chunker::chunk_text;
pub use error::{Result, RetrievalError};
pub use ingest::{DirectoryReport, IngestConfig, Ingestor, WebReport};
pub use loader::{clean_metadata, clean_text, parse_document, parse_document_blocking, ParsedDocument};
#[cfg(feature = "cross-encoder")]
pub use reranker::{CrossEncoderReranker, DEFAULT_RERANK_MODEL};
pub use reranker::{RankedDocument, Reranker, SimilarityReranker};
pub use retriever::{Retrieval, Retriever, RetrieverConfig, NO_DOCUMENTS_FOUND};
pub use selector::{select_knowledge_base, KbType, SelectionPolicy};
pub use sources::{collect_sources, Source};
pub use tool::{RetrieverTool, RETRIEVE_DOCUMENTS};
pub use web::{fetch_page, html_to_text, FetchedPage};
