//! Command-line entry point (spec.md §6): five subcommands over the
//! ingest/index/serve pipeline, mirroring the layout of
//! `mcp-agent-mail-cli`'s `Cli`/`Commands`/`CliError` without its TUI and
//! share/guard surface, which this system has no equivalent of.

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use caselaw_core::{Config, PathLayout};
use caselaw_search::{EmbeddingSource, HashEmbedder};
use clap::{Parser, Subcommand};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Core(#[from] caselaw_core::Error),
    #[error(transparent)]
    Store(#[from] caselaw_store::StoreError),
    #[error(transparent)]
    Search(#[from] caselaw_search::SearchError),
    #[error(transparent)]
    Graph(#[from] caselaw_graph::GraphError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "caselaw", version, about = "Swiss court-decision retrieval and knowledge-graph toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest decision record logs into the relational store and FTS index.
    #[command(name = "build-fts")]
    BuildFts {
        /// Root directory holding `output/decisions/{court}.jsonl` record logs.
        #[arg(long)]
        output: PathBuf,
        /// Override the destination `decisions.db` path (default: `<output>/output/decisions.db`).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Re-run ingestion every N seconds instead of exiting after one pass.
        #[arg(long)]
        watch: Option<u64>,
    },
    /// Embed decisions into a vector store for semantic search.
    #[command(name = "build-vectors")]
    BuildVectors {
        /// Root directory holding `decisions.db` (same layout as `build-fts --output`).
        #[arg(long)]
        input: PathBuf,
        /// Destination vector-store path (default: `<input>/output/vectors.db`).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Embedding model identifier. Only the built-in hash embedder is
        /// available; any other value is logged and ignored.
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        batch_size: Option<usize>,
        /// Cap the number of decisions embedded, for smoke-testing a build.
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        enable_sparse: bool,
        #[arg(long)]
        enable_chunks: bool,
        #[arg(long)]
        shard_index: Option<usize>,
        #[arg(long)]
        num_shards: Option<usize>,
    },
    /// Merge sharded vector-store builds into one combined store.
    #[command(name = "merge-shards")]
    MergeShards {
        #[arg(long, num_args = 1.., required = true)]
        shards: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        enable_sparse: bool,
    },
    /// Build the reference graph (citations, statutes, appeal chains).
    #[command(name = "build-graph")]
    BuildGraph {
        /// Root directory holding `decisions.db` (mutually exclusive with `--source-db`).
        #[arg(long, conflicts_with = "source_db")]
        input: Option<PathBuf>,
        /// Direct path to a `decisions.db` file (mutually exclusive with `--input`).
        #[arg(long)]
        source_db: Option<PathBuf>,
        #[arg(long)]
        db: PathBuf,
        /// Restrict the build to these comma-separated court codes.
        #[arg(long, value_delimiter = ',')]
        courts: Option<Vec<String>>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Start the hybrid search HTTP API.
    Serve {
        /// Address to bind, loopback only.
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
        /// Root directory holding `decisions.db` / `vectors.db` / `reference_graph.db`.
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
    },
}

/// Parse argv, run the selected subcommand, and return a process exit code.
/// Progress goes to stderr via `tracing`; a single JSON stats object (when
/// the subcommand produces one) goes to stdout, per spec.md §6.
pub fn run() -> i32 {
    init_logging();
    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(Some(stats)) => {
            match serde_json::to_string_pretty(&stats) {
                Ok(rendered) => println!("{rendered}"),
                Err(err) => {
                    eprintln!("error: failed to render stats: {err}");
                    return 1;
                }
            }
            0
        }
        Ok(None) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

fn execute(command: Commands) -> CliResult<Option<serde_json::Value>> {
    match command {
        Commands::BuildFts { output, db, watch } => handle_build_fts(&output, db, watch),
        Commands::BuildVectors {
            input,
            output,
            model,
            batch_size,
            limit,
            enable_sparse,
            enable_chunks,
            shard_index,
            num_shards,
        } => handle_build_vectors(
            &input,
            output,
            model.as_deref(),
            batch_size,
            limit,
            enable_sparse,
            enable_chunks,
            shard_index,
            num_shards,
        ),
        Commands::MergeShards { shards, output, enable_sparse } => {
            handle_merge_shards(&shards, &output, enable_sparse)
        }
        Commands::BuildGraph { input, source_db, db, courts, limit } => {
            handle_build_graph(input, source_db, &db, courts, limit)
        }
        Commands::Serve { bind, data_dir } => handle_serve(&bind, &data_dir),
    }
}

fn load_all_decisions(decisions_dir: &Path) -> CliResult<Vec<caselaw_core::Decision>> {
    if !decisions_dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(decisions_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("jsonl"))
        .collect();
    entries.sort();

    let mut decisions = Vec::new();
    for path in entries {
        decisions.extend(caselaw_store::read_decisions(&path)?);
    }
    Ok(decisions)
}

fn handle_build_fts(output: &Path, db: Option<PathBuf>, watch: Option<u64>) -> CliResult<Option<serde_json::Value>> {
    let paths = PathLayout::new(output);
    let db_path = db.unwrap_or_else(|| paths.decisions_db());

    loop {
        let conn = caselaw_store::open_store(&db_path)?;
        let decisions = load_all_decisions(&paths.decisions_dir())?;
        let stats = caselaw_store::run_ingest(&conn, &decisions)?;
        tracing::info!(?stats, decisions_read = decisions.len(), "ingest pass complete");

        match watch {
            Some(interval_secs) => {
                println!("{}", serde_json::to_string(&stats)?);
                std::thread::sleep(Duration::from_secs(interval_secs));
            }
            None => return Ok(Some(serde_json::json!(stats))),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_build_vectors(
    input: &Path,
    output: Option<PathBuf>,
    model: Option<&str>,
    batch_size: Option<usize>,
    limit: Option<usize>,
    enable_sparse: bool,
    enable_chunks: bool,
    shard_index: Option<usize>,
    num_shards: Option<usize>,
) -> CliResult<Option<serde_json::Value>> {
    if let Some(model) = model {
        tracing::warn!(model, "ignoring --model: only the built-in hash embedder is available");
    }
    let shard = match (shard_index, num_shards) {
        (Some(index), Some(count)) => Some((index, count)),
        (None, None) => None,
        _ => {
            return Err(CliError::InvalidArgument(
                "--shard-index and --num-shards must be given together".into(),
            ))
        }
    };

    let paths = PathLayout::new(input);
    let store_conn = rusqlite::Connection::open_with_flags(
        paths.decisions_db(),
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
    )
    .map_err(caselaw_store::StoreError::from)?;
    let rows = caselaw_store::list_embedding_inputs(&store_conn, limit)?;
    let sources: Vec<EmbeddingSource<'_>> = rows
        .iter()
        .map(|row| EmbeddingSource {
            decision_id: &row.decision_id,
            language: &row.language,
            regeste: row.regeste.as_deref(),
            full_text: &row.full_text,
        })
        .collect();

    let config = Config::from_env();
    let batch_size = batch_size.unwrap_or(config.embed_batch_size);
    let embedder = HashEmbedder::from_config(&config);
    let output_path = output.unwrap_or_else(|| paths.vectors_db());

    tracing::info!(decisions = sources.len(), output = %output_path.display(), "building vector store");
    let stats = caselaw_search::build_vector_store(
        &output_path,
        &sources,
        &embedder,
        batch_size,
        enable_sparse,
        enable_chunks,
        shard,
    )?;
    Ok(Some(serde_json::json!(stats)))
}

fn handle_merge_shards(shards: &[PathBuf], output: &Path, enable_sparse: bool) -> CliResult<Option<serde_json::Value>> {
    tracing::info!(shards = shards.len(), output = %output.display(), "merging vector-store shards");
    let stats = caselaw_search::merge_shards(shards, output, enable_sparse)?;
    Ok(Some(serde_json::json!(stats)))
}

fn handle_build_graph(
    input: Option<PathBuf>,
    source_db: Option<PathBuf>,
    db: &Path,
    courts: Option<Vec<String>>,
    limit: Option<usize>,
) -> CliResult<Option<serde_json::Value>> {
    let store_db_path = match (input, source_db) {
        (Some(input), None) => PathLayout::new(input).decisions_db(),
        (None, Some(source_db)) => source_db,
        (None, None) => {
            return Err(CliError::InvalidArgument("one of --input or --source-db is required".into()))
        }
        (Some(_), Some(_)) => unreachable!("clap enforces --input/--source-db mutual exclusion"),
    };

    let store_conn = rusqlite::Connection::open_with_flags(&store_db_path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(caselaw_store::StoreError::from)?;
    let mut rows = caselaw_graph::load_decision_rows(&store_conn)?;
    if let Some(courts) = &courts {
        let allowed: std::collections::HashSet<&str> = courts.iter().map(String::as_str).collect();
        rows.retain(|row| allowed.contains(row.court.as_str()));
    }
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    tracing::info!(decisions = rows.len(), db = %db.display(), "building reference graph");
    let stats = caselaw_graph::build_reference_graph(db, &rows)?;
    Ok(Some(serde_json::json!(stats)))
}

fn handle_serve(bind: &str, data_dir: &Path) -> CliResult<Option<serde_json::Value>> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|err| CliError::InvalidArgument(format!("invalid --bind address {bind:?}: {err}")))?;
    let paths = PathLayout::new(data_dir);
    let state = Arc::new(caselaw_server::AppState::open(&paths)?);
    tracing::info!(%addr, data_dir = %data_dir.display(), "starting caselaw-server");
    caselaw_server::serve(addr, state)?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caselaw_core::DecisionBuilder;

    #[test]
    fn load_all_decisions_returns_empty_for_a_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(load_all_decisions(&missing).unwrap().is_empty());
    }

    #[test]
    fn load_all_decisions_reads_every_jsonl_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathLayout::new(dir.path());
        std::fs::create_dir_all(paths.decisions_dir()).unwrap();

        let mut bger_log = caselaw_store::JsonlRecordLog::open_append(paths.decisions_log("bger")).unwrap();
        bger_log
            .write(&DecisionBuilder::new("bger", "CH", "4A_1/2020", "de", "https://x/1").build())
            .unwrap();
        drop(bger_log);
        let mut bge_log = caselaw_store::JsonlRecordLog::open_append(paths.decisions_log("bge")).unwrap();
        bge_log
            .write(&DecisionBuilder::new("bge", "CH", "1C_1/2021", "de", "https://x/2").build())
            .unwrap();
        drop(bge_log);

        let decisions = load_all_decisions(&paths.decisions_dir()).unwrap();
        assert_eq!(decisions.len(), 2);
    }

    #[test]
    fn build_fts_ingests_record_logs_into_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathLayout::new(dir.path());
        std::fs::create_dir_all(paths.decisions_dir()).unwrap();
        let mut log = caselaw_store::JsonlRecordLog::open_append(paths.decisions_log("bger")).unwrap();
        log.write(&DecisionBuilder::new("bger", "CH", "4A_1/2020", "de", "https://x/1").build())
            .unwrap();
        drop(log);

        let stats = handle_build_fts(dir.path(), None, None).unwrap().unwrap();
        assert_eq!(stats["inserted"], 1);
        assert!(paths.decisions_db().exists());
    }

    #[test]
    fn build_graph_rejects_when_neither_input_nor_source_db_given() {
        let err = handle_build_graph(None, None, Path::new("graph.db"), None, None).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn build_vectors_requires_shard_index_and_num_shards_together() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathLayout::new(dir.path());
        caselaw_store::open_store(&paths.decisions_db()).unwrap();
        let err = handle_build_vectors(dir.path(), None, None, None, None, false, false, Some(0), None)
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn build_graph_builds_from_an_input_directory() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathLayout::new(dir.path());
        let conn = caselaw_store::open_store(&paths.decisions_db()).unwrap();
        caselaw_store::insert_decision(
            &conn,
            &DecisionBuilder::new("bger", "ZH", "4A_1/2020", "de", "https://x/1")
                .full_text("Art. 41 OR")
                .build(),
        )
        .unwrap();
        drop(conn);

        let graph_path = dir.path().join("reference_graph.db");
        let stats = handle_build_graph(Some(dir.path().to_path_buf()), None, &graph_path, None, None)
            .unwrap()
            .unwrap();
        assert!(graph_path.exists());
        assert_eq!(stats["decisions_processed"], 1);
    }
}
