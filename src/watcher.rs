//! # Watcher Module
//!
//! Sottoscrive le notifiche di creazione/rinomina del filesystem sulle
//! directory configurate e consegna i file qualificanti al Dedup Gate e allo
//! Scheduler.
//!
//! ## Macchina a stati per candidato:
//! Discovered → Debounced(2s, policy fissa) → Existence-recheck →
//! {Accepted | Dropped(vanished)} → Registered → Running →
//! {Succeeded | Failed} → Unregistered
//!
//! ## Accettazione:
//! - Il nome non inizia con il marker dei file nascosti
//! - L'estensione è una di quelle video riconosciute
//! - Il filtro keyword passa (stessa regola del batch mode)
//! - Il path non è già nel ProcessingSet
//!
//! Le condizioni fatali sono limitate a: watcher non costruibile, nessuna
//! directory configurata, directory di output non creabile. Tutto il resto è
//! isolato per file e il loop riprende sempre.

use crate::{
    batch::BatchProcessor,
    config::Config,
    dedup::ProcessingSet,
    discovery::FileDiscovery,
    engine::Converter,
    events::{EventBus, LifecycleEvent},
    notifier,
    scheduler::WorkerPool,
};
use anyhow::{Context, Result};
use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Fixed settle delay between discovery and the existence recheck.
/// Implemented as a droppable tokio sleep inside the job task, so a future
/// shutdown path can cancel pending timers by aborting the task.
pub const DEBOUNCE: Duration = Duration::from_secs(2);

/// Shared per-job dependencies, cheap to clone into spawned tasks
#[derive(Clone)]
struct JobContext {
    config: Config,
    converter: Converter,
    processing: ProcessingSet,
    pool: WorkerPool,
    events: EventBus,
    out_dir: PathBuf,
}

/// Filesystem watcher feeding the conversion pipeline
pub struct DirectoryWatcher {
    config: Config,
    processing: ProcessingSet,
    pool: WorkerPool,
    events: EventBus,
}

impl DirectoryWatcher {
    pub fn new(
        config: Config,
        processing: ProcessingSet,
        pool: WorkerPool,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            processing,
            pool,
            events,
        }
    }

    /// Watch the configured directories until the process terminates
    pub async fn run(&self) -> Result<()> {
        if self.config.watch_dirs.is_empty() {
            anyhow::bail!("no watch directories configured");
        }

        let out_dir = BatchProcessor::prepare_output_dir(&self.config)?;

        let (tx, mut rx) = mpsc::channel::<PathBuf>(256);
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if is_arrival(&event.kind) {
                        for path in event.paths {
                            // a full channel only delays delivery, never drops
                            let _ = tx.blocking_send(path);
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            },
            notify::Config::default(),
        )
        .context("failed to construct filesystem watcher")?;

        let mut watched = 0usize;
        for dir in &self.config.watch_dirs {
            let abs_dir = match std::fs::canonicalize(dir) {
                Ok(d) => d,
                Err(e) => {
                    warn!("⚠️ Cannot resolve watch dir {} (skipped): {}", dir.display(), e);
                    continue;
                }
            };
            match watcher.watch(&abs_dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    info!("👀 Watching: {}", abs_dir.display());
                    watched += 1;
                }
                Err(e) => warn!("⚠️ Cannot watch {} (skipped): {}", abs_dir.display(), e),
            }
        }
        if watched == 0 {
            anyhow::bail!("none of the configured directories could be watched");
        }

        let ctx = JobContext {
            config: self.config.clone(),
            converter: Converter::new(self.config.clone()),
            processing: self.processing.clone(),
            pool: self.pool.clone(),
            events: self.events.clone(),
            out_dir,
        };

        // job tasks are tracked so panics surface in the log instead of
        // disappearing with the handle
        let mut jobs: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                candidate = rx.recv() => {
                    match candidate {
                        Some(path) => {
                            if self.accepts(&path) {
                                info!("New file detected: {}", path.display());
                                self.events.emit(LifecycleEvent::Found { path: path.clone() });
                                jobs.spawn(run_job(ctx.clone(), path));
                            }
                        }
                        // the watcher owns the sender, so this only happens on
                        // teardown
                        None => break,
                    }
                }
                Some(finished) = jobs.join_next(), if !jobs.is_empty() => {
                    if let Err(e) = finished {
                        error!("Conversion job panicked: {}", e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Acceptance filter shared with the event handler
    fn accepts(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => return false,
        };

        if FileDiscovery::is_hidden(&name) {
            return false;
        }
        if !FileDiscovery::is_video_file(path) {
            return false;
        }
        FileDiscovery::should_process(&name, &self.config.keywords, &self.config.ignore_keywords)
    }
}

/// Create and rename-to events mark a file arriving in a watched directory
fn is_arrival(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_)))
}

/// Drive one accepted candidate through debounce, dedup, slot and conversion
async fn run_job(ctx: JobContext, path: PathBuf) {
    // wait for the writer to finish before looking at the file
    tokio::time::sleep(DEBOUNCE).await;

    if !path.exists() {
        debug!("File vanished during debounce, dropped: {}", path.display());
        return;
    }

    // registered for the whole window between acceptance and terminal
    // outcome; the guard unregisters on every exit path
    let _guard = match ctx.processing.register(&path) {
        Some(guard) => guard,
        None => {
            info!("Already processing, skipped: {}", path.display());
            return;
        }
    };

    let _permit = match ctx.pool.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            error!("Worker pool unavailable: {}", e);
            return;
        }
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!("Conversion start: {}", path.display());
    ctx.events
        .emit(LifecycleEvent::StartConvert { path: path.clone() });

    match ctx.converter.convert(&path, &ctx.out_dir).await {
        Ok(output) => {
            info!("✅ Conversion done: {}", path.display());
            ctx.events.emit(LifecycleEvent::Success {
                path: path.clone(),
                output: output.clone(),
            });
            if ctx.config.notify {
                notifier::send_notification(
                    "Conversion complete",
                    &format!("{} converted", name),
                    Some(&output),
                )
                .await;
            }
        }
        Err(e) => {
            error!("❌ Conversion failed: {} -> {}", path.display(), e);
            ctx.events.emit(LifecycleEvent::Failure {
                path: path.clone(),
                error: e.to_string(),
            });
            if ctx.config.notify {
                notifier::send_notification(
                    "Conversion failed",
                    &format!("{} could not be converted", name),
                    None,
                )
                .await;
            }
        }
    }
}
