//! # Conversion Engine
//!
//! Esegue una invocazione dell'encoder (o la sequenza split → sotto-codifica
//! parallela → merge) per un singolo file di input.
//!
//! ## Responsabilità:
//! - Naming dell'output dal modification time del sorgente, a precisione di
//!   secondo, con suffisso numerico di disambiguazione in caso di collisione
//! - Esecuzione di ffmpeg con cattura dell'output per il reporting errori
//! - Emissione del ResultRecord a fine job
//! - Spostamento del sorgente nel cestino (best effort, non fatale)
//! - Orchestrazione dello split mode: i chunk vengono sotto-codificati in
//!   parallelo attraverso il worker pool e ricomposti in ordine di indice
//!
//! L'engine non parsa mai il progress dell'encoder: dipende solo dall'exit
//! code e da stdout/stderr catturati.

use crate::{
    codec,
    config::Config,
    error::ConvertError,
    platform,
    record::ResultRecord,
    scheduler::WorkerPool,
    split::{self, Chunk, ChunkResult, Splitter, SEGMENT_SECONDS},
};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Executes encoder invocations for single input files
#[derive(Clone)]
pub struct Converter {
    config: Config,
}

impl Converter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn ffmpeg_bin(&self) -> &str {
        if self.config.ffmpeg_bin.is_empty() {
            "ffmpeg"
        } else {
            &self.config.ffmpeg_bin
        }
    }

    /// Convert one input file into `out_dir`, returning the output path.
    ///
    /// Dispatches to the split path when configured; a job-level error never
    /// affects sibling files.
    pub async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        if self.config.parallel_split {
            self.convert_split(input, out_dir).await
        } else {
            self.convert_one(input, out_dir).await
        }
    }

    /// Single-pass conversion with timestamp naming, record and trash
    pub async fn convert_one(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let out_path = output_path_for(input, out_dir);
        let started = Instant::now();

        info!("▶ Converting: {} -> {}", input.display(), out_path.display());
        self.encode_file(input, &out_path).await?;

        if !self.config.dry_run {
            self.finalize(input, &out_path, started.elapsed().as_secs_f64())
                .await;
        }
        Ok(out_path)
    }

    /// Low-level single encoder invocation, no renaming and no finalization.
    ///
    /// Used directly for chunk sub-encodes, where the chunk-indexed filename
    /// must survive into the merge step.
    pub async fn encode_file(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let args = codec::build_encode_args(&self.config, input, output);

        if self.config.dry_run {
            info!("[DryRun] Command: {} {}", self.ffmpeg_bin(), args.join(" "));
            return Ok(());
        }

        let cmd_output = Command::new(self.ffmpeg_bin())
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                ConvertError::Encoder(format!("failed to spawn {}: {}", self.ffmpeg_bin(), e))
            })?;

        if !cmd_output.status.success() {
            return Err(ConvertError::Encoder(format!(
                "{}\n{}{}",
                cmd_output.status,
                String::from_utf8_lossy(&cmd_output.stdout),
                String::from_utf8_lossy(&cmd_output.stderr)
            )));
        }
        Ok(())
    }

    /// Split path: segment, sub-encode chunks in parallel, merge in order
    async fn convert_split(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        info!(
            "🚀 Parallel split mode: {}",
            input.file_name().unwrap_or_default().to_string_lossy()
        );
        let started = Instant::now();

        // chunk and list files live here and disappear with the scope,
        // success or failure
        let tmp_dir = tempfile::Builder::new().prefix("vidwatch-split-").tempdir()?;

        let splitter = Splitter::new(&self.config.ffmpeg_bin);
        let sources = if self.config.dry_run {
            // exercise the pipeline with placeholder chunks, no segmenting pass
            (0..3)
                .map(|i| tmp_dir.path().join(format!("chunk_{:03}.mp4", i)))
                .collect()
        } else {
            splitter.split(input, tmp_dir.path(), SEGMENT_SECONDS).await?
        };
        if sources.is_empty() {
            return Err(ConvertError::Split("segmenting produced no chunks".into()));
        }

        let converted_dir = tmp_dir.path().join("converted");
        tokio::fs::create_dir_all(&converted_dir).await?;

        let chunks: Vec<Chunk> = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                // keep the chunk-indexed basename so ordering survives the merge
                let converted = converted_dir.join(source.file_name().unwrap_or_default());
                Chunk {
                    index,
                    source,
                    converted,
                }
            })
            .collect();

        let pool = WorkerPool::new(self.config.effective_concurrency());
        info!(
            "⚡️ Converting {} chunks with {} workers",
            chunks.len(),
            pool.capacity()
        );

        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let permit = pool
                .acquire()
                .await
                .map_err(|e| ConvertError::Split(format!("worker pool unavailable: {}", e)))?;
            let engine = self.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = engine.encode_file(&chunk.source, &chunk.converted).await;
                if let Err(ref e) = result {
                    warn!("⚠️ Chunk {} conversion failed: {}", chunk.index, e);
                }
                ChunkResult {
                    index: chunk.index,
                    converted: chunk.converted,
                    result,
                }
            }));
        }

        // every sub-encode is joined: no chunk job is silently abandoned
        let mut results = Vec::with_capacity(handles.len());
        for joined in futures::future::join_all(handles).await {
            let chunk_result = joined
                .map_err(|e| ConvertError::Split(format!("chunk task panicked: {}", e)))?;
            results.push(chunk_result);
        }

        // any chunk failure aborts before the merge; completed siblings are
        // discarded together with the temp dir
        let converted = split::collect_converted(results)?;

        let list_file = tmp_dir.path().join("concat.txt");
        tokio::fs::write(&list_file, split::build_concat_list(&converted)).await?;

        let out_path = output_path_for(input, out_dir);
        info!("🔗 Merging {} chunks -> {}", converted.len(), out_path.display());
        if self.config.dry_run {
            info!("[DryRun] Would merge {} chunks", converted.len());
            return Ok(out_path);
        }
        splitter.merge(&list_file, &out_path).await?;

        self.finalize(input, &out_path, started.elapsed().as_secs_f64())
            .await;
        Ok(out_path)
    }

    /// Emit the ResultRecord line and move the source to the trash.
    ///
    /// Both steps are post-success: record failures and trash failures are
    /// logged but never change the job outcome.
    async fn finalize(&self, input: &Path, output: &Path, duration_sec: f64) {
        let original_size = file_size(input).await;
        let converted_size = file_size(output).await;

        let record = ResultRecord::new(input, output, duration_sec, original_size, converted_size);
        match record.to_json_line() {
            Ok(line) => info!("{}", line),
            Err(e) => warn!("Failed to serialize result record: {}", e),
        }

        if !self.config.no_trash {
            if let Err(e) = platform::move_to_trash(input).await {
                warn!("🗑 Failed to move {} to trash: {}", input.display(), e);
            } else {
                debug!("Moved source to trash: {}", input.display());
            }
        }
    }
}

async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

/// Compute the timestamp-based output path for an input file.
///
/// The name comes from the input's last-modified time at second precision
/// (lexically sortable); when the stat fails the current time is used. A
/// numeric suffix disambiguates two jobs landing in the same second.
pub fn output_path_for(input: &Path, out_dir: &Path) -> PathBuf {
    let modified: DateTime<Local> = std::fs::metadata(input)
        .and_then(|m| m.modified())
        .map(DateTime::from)
        .unwrap_or_else(|_| Local::now());

    let stamp = modified.format("%Y-%m-%d_%H-%M-%S").to_string();
    unique_output_path(out_dir, &stamp)
}

fn unique_output_path(out_dir: &Path, stamp: &str) -> PathBuf {
    let candidate = out_dir.join(format!("{}.mp4", stamp));
    if !candidate.exists() {
        return candidate;
    }
    for n in 1.. {
        let candidate = out_dir.join(format!("{}_{}.mp4", stamp, n));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}
