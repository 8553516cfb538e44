//! Dense (and optional sparse/chunk) vector store, ported from
//! `examples/original_source/search_stack/build_vectors.py` and
//! `merge_shards.py`.
//!
//! Deviation: the original stores vectors in a `sqlite-vec` virtual table and
//! leans on that extension's native ANN index. No idiomatic Rust binding for
//! `sqlite-vec` exists in this workspace's dependency stack, so embeddings
//! are kept as little-endian float32 BLOBs in a plain table and scored with
//! a brute-force in-process cosine scan (spec.md's corpus size — Swiss
//! federal/cantonal case law — comfortably fits an in-memory scan; this is
//! noted as an explicit scaling limit, not silently papered over).

use std::collections::HashMap;
use std::path::Path;

use caselaw_core::paths::atomic_build;
use rusqlite::{Connection, OptionalExtension, params};

use crate::embed::Embedder;
use crate::error::Result;

const SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS vec_decisions (
        decision_id TEXT PRIMARY KEY,
        embedding BLOB NOT NULL,
        language TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sparse_terms (
        decision_id TEXT NOT NULL,
        token_id INTEGER NOT NULL,
        weight REAL NOT NULL,
        PRIMARY KEY (decision_id, token_id)
    );
    CREATE INDEX IF NOT EXISTS idx_sparse_token ON sparse_terms (token_id);

    CREATE TABLE IF NOT EXISTS vec_chunks (
        chunk_id TEXT PRIMARY KEY,
        embedding BLOB NOT NULL,
        language TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunk_meta (
        chunk_id TEXT PRIMARY KEY,
        decision_id TEXT NOT NULL,
        chunk_index INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_chunk_meta_decision ON chunk_meta (decision_id);
";

/// Minimum sparse weight to persist (prune near-zero weights).
pub const SPARSE_WEIGHT_THRESHOLD: f32 = 0.01;

/// Create the vector-store tables if absent.
pub fn apply_vector_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[must_use]
pub fn serialize_f32(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

#[must_use]
pub fn deserialize_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Decide whether `decision_id` belongs to the given shard (spec.md §4.4's
/// sharded build: `hash(decision_id) mod num_shards == shard_index`).
#[must_use]
pub fn in_shard(decision_id: &str, shard_index: usize, num_shards: usize) -> bool {
    if num_shards <= 1 {
        return true;
    }
    (fnv1a(decision_id.as_bytes()) as usize) % num_shards == shard_index
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VectorBuildStats {
    pub embedded: usize,
    pub skipped_no_text: usize,
    pub chunks_embedded: usize,
    pub sparse_terms_inserted: usize,
}

/// One decision's worth of input to the build pipeline.
pub struct EmbeddingSource<'a> {
    pub decision_id: &'a str,
    pub language: &'a str,
    pub regeste: Option<&'a str>,
    pub full_text: &'a str,
}

/// Build a fresh vector store at `path` from `sources`, atomically
/// (write-to-`.tmp`-then-rename, per spec.md §4.4). `shard` optionally
/// restricts the build to one `(index, count)` partition.
pub fn build_vector_store(
    path: &Path,
    sources: &[EmbeddingSource<'_>],
    embedder: &dyn Embedder,
    batch_size: usize,
    enable_sparse: bool,
    enable_chunks: bool,
    shard: Option<(usize, usize)>,
) -> Result<VectorBuildStats> {
    atomic_build(path, |tmp| -> Result<()> {
        let conn = Connection::open(tmp)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        apply_vector_schema(&conn)?;
        fill_vector_store(&conn, sources, embedder, batch_size, enable_sparse, enable_chunks, shard)?;
        Ok(())
    })?;

    // Stats are recomputed from the written file so the atomic closure
    // itself stays a simple `Result<()>`.
    let conn = Connection::open(path)?;
    recount_stats(&conn)
}

fn fill_vector_store(
    conn: &Connection,
    sources: &[EmbeddingSource<'_>],
    embedder: &dyn Embedder,
    batch_size: usize,
    enable_sparse: bool,
    enable_chunks: bool,
    shard: Option<(usize, usize)>,
) -> Result<VectorBuildStats> {
    let mut stats = VectorBuildStats::default();
    let batch_size = batch_size.max(1);

    let mut batch_ids: Vec<&str> = Vec::new();
    let mut batch_texts: Vec<String> = Vec::new();
    let mut batch_langs: Vec<&str> = Vec::new();

    let mut flush = |ids: &mut Vec<&str>, texts: &mut Vec<String>, langs: &mut Vec<&str>| -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let vectors = embedder.embed_batch(texts)?;
        insert_dense_batch(conn, ids, langs, &vectors)?;
        if enable_sparse {
            if let Some(sparse) = embedder.embed_sparse_batch(texts)? {
                stats.sparse_terms_inserted += insert_sparse_batch(conn, ids, &sparse)?;
            }
        }
        stats.embedded += ids.len();
        ids.clear();
        texts.clear();
        langs.clear();
        Ok(())
    };

    for source in sources {
        if let Some((index, count)) = shard {
            if !in_shard(source.decision_id, index, count) {
                continue;
            }
        }
        let Some(text) = crate::embed::select_embedding_text(source.regeste, source.full_text) else {
            stats.skipped_no_text += 1;
            continue;
        };

        if enable_chunks {
            let mut chunk_texts: Vec<String> = Vec::new();
            if let Some(r) = source.regeste {
                if r.chars().count() >= 20 {
                    chunk_texts.push(r.to_string());
                }
            }
            if !source.full_text.is_empty() {
                chunk_texts.extend(crate::chunker::chunk_decision(Some(source.full_text), 2, 500));
            }
            chunk_texts.truncate(3);
            if !chunk_texts.is_empty() {
                let chunk_vectors = embedder.embed_batch(&chunk_texts)?;
                stats.chunks_embedded +=
                    insert_chunk_batch(conn, source.decision_id, source.language, &chunk_texts, &chunk_vectors)?;
            }
        }

        batch_ids.push(source.decision_id);
        batch_texts.push(text);
        batch_langs.push(source.language);
        if batch_ids.len() >= batch_size {
            flush(&mut batch_ids, &mut batch_texts, &mut batch_langs)?;
        }
    }
    flush(&mut batch_ids, &mut batch_texts, &mut batch_langs)?;
    Ok(stats)
}

fn insert_dense_batch(conn: &Connection, ids: &[&str], langs: &[&str], vectors: &[Vec<f32>]) -> Result<()> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO vec_decisions (decision_id, embedding, language) VALUES (?1, ?2, ?3)")?;
    for i in 0..ids.len() {
        stmt.execute(params![ids[i], serialize_f32(&vectors[i]), langs[i]])?;
    }
    Ok(())
}

fn insert_sparse_batch(conn: &Connection, ids: &[&str], sparse: &[Vec<(u32, f32)>]) -> Result<usize> {
    let mut stmt = conn
        .prepare_cached("INSERT INTO sparse_terms (decision_id, token_id, weight) VALUES (?1, ?2, ?3)")?;
    let mut inserted = 0usize;
    for (i, terms) in sparse.iter().enumerate() {
        for &(token_id, weight) in terms {
            if weight > SPARSE_WEIGHT_THRESHOLD {
                stmt.execute(params![ids[i], token_id, f64::from(weight)])?;
                inserted += 1;
            }
        }
    }
    Ok(inserted)
}

fn insert_chunk_batch(
    conn: &Connection,
    decision_id: &str,
    language: &str,
    chunk_texts: &[String],
    vectors: &[Vec<f32>],
) -> Result<usize> {
    let mut chunk_stmt =
        conn.prepare_cached("INSERT INTO vec_chunks (chunk_id, embedding, language) VALUES (?1, ?2, ?3)")?;
    let mut meta_stmt = conn
        .prepare_cached("INSERT INTO chunk_meta (chunk_id, decision_id, chunk_index) VALUES (?1, ?2, ?3)")?;
    for (i, _) in chunk_texts.iter().enumerate() {
        let chunk_id = format!("{decision_id}__chunk_{i}");
        chunk_stmt.execute(params![chunk_id, serialize_f32(&vectors[i]), language])?;
        meta_stmt.execute(params![chunk_id, decision_id, i as i64])?;
    }
    Ok(chunk_texts.len())
}

fn recount_stats(conn: &Connection) -> Result<VectorBuildStats> {
    let embedded: i64 = conn.query_row("SELECT count(*) FROM vec_decisions", [], |r| r.get(0))?;
    let chunks_embedded: i64 = conn.query_row("SELECT count(*) FROM vec_chunks", [], |r| r.get(0))?;
    let sparse_terms_inserted: i64 = conn.query_row("SELECT count(*) FROM sparse_terms", [], |r| r.get(0))?;
    Ok(VectorBuildStats {
        embedded: embedded.max(0) as usize,
        skipped_no_text: 0,
        chunks_embedded: chunks_embedded.max(0) as usize,
        sparse_terms_inserted: sparse_terms_inserted.max(0) as usize,
    })
}

/// Build `num_shards` shard databases concurrently with `rayon`, one
/// `hash(decision_id) mod num_shards` partition each (spec.md §4.4's
/// sharded build: `build_vectors.py --shard-index/--num-shards` run as
/// separate OS processes; here the same partitioning runs as a `rayon`
/// thread pool within one process since `Embedder` is `Send + Sync`).
/// Returns one [`VectorBuildStats`] per shard, in shard order.
pub fn build_shards_parallel(
    shard_paths: &[std::path::PathBuf],
    sources: &[EmbeddingSource<'_>],
    embedder: &dyn Embedder,
    batch_size: usize,
    enable_sparse: bool,
    enable_chunks: bool,
) -> Result<Vec<VectorBuildStats>> {
    use rayon::prelude::*;

    let num_shards = shard_paths.len();
    shard_paths
        .par_iter()
        .enumerate()
        .map(|(shard_index, path)| {
            build_vector_store(
                path,
                sources,
                embedder,
                batch_size,
                enable_sparse,
                enable_chunks,
                Some((shard_index, num_shards)),
            )
        })
        .collect()
}

/// Merge several shard databases into one combined vector store
/// (ported from `merge_shards.py::merge_shards`), atomically.
pub fn merge_shards(shard_paths: &[std::path::PathBuf], output_path: &Path, enable_sparse: bool) -> Result<VectorBuildStats> {
    atomic_build(output_path, |tmp| -> Result<()> {
        let conn = Connection::open(tmp)?;
        apply_vector_schema(&conn)?;

        for shard_path in shard_paths {
            if !shard_path.exists() {
                continue;
            }
            let shard = Connection::open(shard_path)?;
            copy_table(&shard, &conn, "vec_decisions", "decision_id, embedding, language")?;
            if enable_sparse {
                let _ = copy_table(&shard, &conn, "sparse_terms", "decision_id, token_id, weight");
            }
            let _ = copy_table(&shard, &conn, "vec_chunks", "chunk_id, embedding, language");
            let _ = copy_table(&shard, &conn, "chunk_meta", "chunk_id, decision_id, chunk_index");
        }
        Ok(())
    })?;

    let conn = Connection::open(output_path)?;
    recount_stats(&conn)
}

fn copy_table(src: &Connection, dst: &Connection, table: &str, columns: &str) -> Result<()> {
    let select_sql = format!("SELECT {columns} FROM {table}");
    let mut stmt = src.prepare(&select_sql)?;
    let column_count = columns.split(',').count();
    let placeholders = vec!["?"; column_count].join(", ");
    let insert_sql = format!("INSERT OR IGNORE INTO {table} ({columns}) VALUES ({placeholders})");
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        match column_count {
            3 => {
                let a: rusqlite::types::Value = row.get(0)?;
                let b: rusqlite::types::Value = row.get(1)?;
                let c: rusqlite::types::Value = row.get(2)?;
                dst.execute(&insert_sql, params![a, b, c])?;
            }
            _ => unreachable!("all copied tables here have exactly 3 columns"),
        }
    }
    Ok(())
}

/// A single KNN hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub decision_id: String,
    pub score: f32,
}

/// Brute-force cosine KNN over `vec_decisions`, optionally restricted to a
/// language partition (spec.md §4.5's vector leg).
pub fn knn_decisions(conn: &Connection, query: &[f32], language: Option<&str>, k: usize) -> Result<Vec<VectorHit>> {
    let sql = match language {
        Some(_) => "SELECT decision_id, embedding FROM vec_decisions WHERE language = ?1",
        None => "SELECT decision_id, embedding FROM vec_decisions",
    };
    let mut stmt = conn.prepare(sql)?;
    let rows: Vec<(String, Vec<u8>)> = if let Some(lang) = language {
        stmt.query_map(params![lang], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    } else {
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut hits: Vec<VectorHit> = rows
        .into_iter()
        .map(|(decision_id, blob)| VectorHit {
            decision_id,
            score: cosine_similarity(query, &deserialize_f32(&blob)),
        })
        .collect();
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(k);
    Ok(hits)
}

/// Chunk-level KNN, collapsed to the best-scoring chunk per decision
/// (spec.md §4.4: chunk hits are attributed back to their parent decision).
pub fn knn_chunks(conn: &Connection, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
    let mut stmt = conn.prepare(
        "SELECT c.chunk_id, c.embedding, m.decision_id FROM vec_chunks c \
         JOIN chunk_meta m ON m.chunk_id = c.chunk_id",
    )?;
    let rows: Vec<(String, Vec<u8>, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut best: HashMap<String, f32> = HashMap::new();
    for (_chunk_id, blob, decision_id) in rows {
        let score = cosine_similarity(query, &deserialize_f32(&blob));
        best.entry(decision_id)
            .and_modify(|s| {
                if score > *s {
                    *s = score;
                }
            })
            .or_insert(score);
    }
    let mut hits: Vec<VectorHit> = best
        .into_iter()
        .map(|(decision_id, score)| VectorHit { decision_id, score })
        .collect();
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(k);
    Ok(hits)
}

/// Whether a vector store at `path` exists and has at least one row
/// (spec.md §4.5: hybrid search degrades to lexical-only when absent).
#[must_use]
pub fn vector_store_available(conn: &Connection) -> bool {
    conn.query_row("SELECT 1 FROM vec_decisions LIMIT 1", [], |r| r.get::<_, i64>(0))
        .optional()
        .ok()
        .flatten()
        .is_some()
}
