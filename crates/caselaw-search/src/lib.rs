//! Hybrid lexical/vector query engine over the canonical decision store
//! (spec.md §4.5): intent-aware FTS5 lexical search, a brute-force cosine
//! vector leg, and reciprocal-rank fusion between the two, plus the
//! chunking/embedding machinery that feeds the vector store.

pub mod chunker;
pub mod embed;
pub mod error;
pub mod filters;
pub mod fusion;
pub mod intent;
pub mod lexical;
pub mod rows;
pub mod search;
pub mod vector;

pub use chunker::chunk_decision;
pub use embed::{Embedder, HashEmbedder, select_embedding_text};
pub use error::{Result, SearchError};
pub use filters::SearchFilters;
pub use fusion::{fuse_rrf, FusedHit, RANK_CONSTANT, WINDOW_SIZE};
pub use intent::{detect_query_intent, QueryIntent};
pub use lexical::{search_lexical, sanitize_fts5_query, LexicalHit};
pub use search::{search_hybrid, search_lexical_only, SearchResponse, SearchResultItem};
pub use vector::{
    apply_vector_schema, build_shards_parallel, build_vector_store, knn_chunks, knn_decisions,
    merge_shards, vector_store_available, EmbeddingSource, VectorBuildStats, VectorHit,
};
