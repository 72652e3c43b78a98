//! # Batch Orchestrator
//!
//! Orchestrazione del batch mode: discovery → filtro → dispatch attraverso il
//! worker pool → join di tutti i job.
//!
//! ## Responsabilità:
//! - Creazione della directory di output (una volta per run, con eventuale
//!   sottodirectory datata condivisa da tutti i job del run)
//! - Dispatch dei file con concorrenza limitata dal worker pool
//! - Join esplicito di ogni task handle: nessun job viene abbandonato
//! - Isolamento dei fallimenti: una riga di errore per file, il batch continua
//! - Progress bar e statistiche riassuntive
//!
//! A differenza del watch mode non serve il Dedup Gate: i candidati sono
//! enumerati una volta sola.

use crate::{
    config::Config,
    discovery::FileDiscovery,
    engine::Converter,
    events::{EventBus, LifecycleEvent},
    scheduler::WorkerPool,
};
use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Outcome counters for one batch run
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchStats {
    pub converted: usize,
    pub failed: usize,
}

/// Batch-mode pipeline driver
pub struct BatchProcessor {
    config: Config,
    events: EventBus,
}

impl BatchProcessor {
    pub fn new(config: Config, events: EventBus) -> Self {
        Self { config, events }
    }

    /// Resolve and create the output directory shared by this run.
    ///
    /// Failing to create it is one of the few fatal conditions.
    pub fn prepare_output_dir(config: &Config) -> Result<PathBuf> {
        let base = if config.dest_dir.is_absolute() {
            config.dest_dir.clone()
        } else {
            std::env::current_dir()?.join(&config.dest_dir)
        };

        let run_dir = if config.batch_stamp {
            base.join(Local::now().format("%Y%m%d").to_string())
        } else {
            base
        };

        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed to create output directory {}", run_dir.display()))?;
        Ok(run_dir)
    }

    /// Expand patterns, filter, convert everything, wait for every job
    pub async fn run(&self, patterns: &[String]) -> Result<BatchStats> {
        let files = FileDiscovery::expand_patterns(patterns);
        if files.is_empty() {
            info!("No files matched the input patterns");
            return Ok(BatchStats::default());
        }

        let files = FileDiscovery::filter_files(
            files,
            &self.config.keywords,
            &self.config.ignore_keywords,
        );
        if files.is_empty() {
            info!("No files left after keyword filtering");
            return Ok(BatchStats::default());
        }

        let out_dir = Self::prepare_output_dir(&self.config)?;
        let pool = WorkerPool::new(self.config.effective_concurrency());

        info!("Files to convert: {}", files.len());
        info!("Output directory: {}", out_dir.display());
        info!("Concurrency: {}", pool.capacity());

        let progress = ProgressBar::new(files.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            // slot acquisition blocks the dispatcher until a worker frees
            let permit = pool.acquire().await?;
            let engine = Converter::new(self.config.clone());
            let events = self.events.clone();
            let out_dir = out_dir.clone();
            let progress = progress.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                events.emit(LifecycleEvent::StartConvert { path: file.clone() });

                let result = engine.convert(&file, &out_dir).await;
                match &result {
                    Ok(output) => {
                        events.emit(LifecycleEvent::Success {
                            path: file.clone(),
                            output: output.clone(),
                        });
                        progress.set_message(display_name(&file));
                    }
                    Err(e) => {
                        events.emit(LifecycleEvent::Failure {
                            path: file.clone(),
                            error: e.to_string(),
                        });
                        error!("❌ Conversion failed: {} -> {}", file.display(), e);
                    }
                }
                progress.inc(1);
                result.is_ok()
            }));
        }

        // batch completion requires every dispatched job to reach a terminal
        // state; a panicked task counts as a failure, not an abort
        let mut stats = BatchStats::default();
        for handle in handles {
            match handle.await {
                Ok(true) => stats.converted += 1,
                Ok(false) => stats.failed += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!("Conversion task panicked: {}", e);
                }
            }
        }

        progress.finish_and_clear();
        info!(
            "✅ Batch complete: {} converted, {} failed",
            stats.converted, stats.failed
        );
        Ok(stats)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn test_config(dest: &Path) -> Config {
        Config {
            dest_dir: dest.to_path_buf(),
            batch_stamp: false,
            dry_run: true,
            no_trash: true,
            notify: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_output_dir_with_date_stamp() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            dest_dir: temp_dir.path().join("out"),
            batch_stamp: true,
            ..Default::default()
        };

        let run_dir = BatchProcessor::prepare_output_dir(&config).unwrap();
        assert!(run_dir.exists());

        let stamp = run_dir.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(stamp.len(), 8);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_output_dir_without_stamp() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir.path().join("flat"));

        let run_dir = BatchProcessor::prepare_output_dir(&config).unwrap();
        assert_eq!(run_dir, temp_dir.path().join("flat"));
    }

    #[tokio::test]
    async fn test_empty_patterns_yield_empty_stats() {
        let temp_dir = TempDir::new().unwrap();
        let processor = BatchProcessor::new(test_config(temp_dir.path()), EventBus::disabled());

        let stats = processor.run(&["/no/such/dir/**".to_string()]).await.unwrap();
        assert_eq!(stats.converted, 0);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_keyword_filtered_batch_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        let media = temp_dir.path().join("media");
        std::fs::create_dir(&media).unwrap();
        File::create(media.join("a.mov")).unwrap();
        File::create(media.join("b.MOV")).unwrap();
        File::create(media.join("archive_c.mp4")).unwrap();

        let mut config = test_config(&temp_dir.path().join("out"));
        config.ignore_keywords = vec!["archive".to_string()];
        let (events, mut rx) = EventBus::subscribed();
        let processor = BatchProcessor::new(config, events);

        let stats = processor
            .run(&[media.to_string_lossy().into_owned()])
            .await
            .unwrap();

        assert_eq!(stats.converted, 2);
        assert_eq!(stats.failed, 0);

        let mut successes = 0;
        while let Ok(event) = rx.try_recv() {
            if let LifecycleEvent::Success { path, .. } = event {
                let name = path.file_name().unwrap().to_string_lossy().to_lowercase();
                assert!(!name.contains("archive"));
                successes += 1;
            }
        }
        assert_eq!(successes, 2);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let temp_dir = TempDir::new().unwrap();
        let media = temp_dir.path().join("media");
        std::fs::create_dir(&media).unwrap();
        File::create(media.join("a.mov")).unwrap();
        File::create(media.join("b.mov")).unwrap();

        // real execution against a guaranteed-failing encoder binary
        let config = Config {
            dest_dir: temp_dir.path().join("out"),
            batch_stamp: false,
            ffmpeg_bin: "false".to_string(),
            no_trash: true,
            ..Default::default()
        };
        let processor = BatchProcessor::new(config, EventBus::disabled());

        let stats = processor
            .run(&[media.to_string_lossy().into_owned()])
            .await
            .unwrap();

        assert_eq!(stats.converted, 0);
        assert_eq!(stats.failed, 2);
    }
}
