//! # Vidwatch - Main Entry Point
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Caricamento del file di configurazione e merge con i flag espliciti
//! - Inizializzazione del sistema di logging con `tracing`
//! - Dispatch tra watch mode e batch mode
//!
//! ## Esempio di utilizzo:
//! ```bash
//! vidwatch ~/Movies/recordings --crf 22 --concurrent 4
//! vidwatch --watch ~/Desktop --dest ~/Movies/converted
//! ```

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use vidwatch::{
    BatchProcessor, Config, DirectoryWatcher, EventBus, ProcessingSet, WorkerPool,
};

#[derive(Parser)]
#[command(name = "vidwatch")]
#[command(about = "Watch and batch-convert recordings to normalized 1080p MP4")]
struct Args {
    /// Files, directories or glob patterns to convert (watch mode: directories to watch)
    inputs: Vec<String>,

    /// Watch the given directories and convert new files automatically
    #[arg(short, long)]
    watch: bool,

    /// Output root directory
    #[arg(long)]
    dest: Option<PathBuf>,

    /// Video CRF value (0-51, 0 = encoder default)
    #[arg(long)]
    crf: Option<u32>,

    /// x264 encode preset
    #[arg(long)]
    preset: Option<String>,

    /// Forced frame rate (0 = keep source rate)
    #[arg(long)]
    fps: Option<u32>,

    /// Disable the audio stream
    #[arg(long)]
    mute: bool,

    /// Only process filenames containing at least one of these keywords
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Skip filenames containing any of these keywords (wins over --keywords)
    #[arg(long, value_delimiter = ',')]
    ignore_keywords: Vec<String>,

    /// Do not add black bars when scaling to 1080p
    #[arg(long)]
    no_pad: bool,

    /// Keep source files instead of moving them to the trash
    #[arg(long)]
    no_trash: bool,

    /// Do not create a date-stamped subdirectory per run
    #[arg(long)]
    no_batch_stamp: bool,

    /// Explicit path to the ffmpeg binary
    #[arg(long)]
    ffmpeg_bin: Option<String>,

    /// Number of parallel conversions
    #[arg(long)]
    concurrent: Option<usize>,

    /// Disable desktop notifications
    #[arg(long)]
    no_notify: bool,

    /// Log file path (also logged to stdout)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print encoder commands instead of executing them
    #[arg(long)]
    dry_run: bool,

    /// Split files into chunks and convert them in parallel
    #[arg(long)]
    parallel_split: bool,

    /// Use the hardware H.264 encoder
    #[arg(long)]
    gpu: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn merge_flags(mut config: Config, args: &Args) -> Config {
    if let Some(ref dest) = args.dest {
        config.dest_dir = dest.clone();
    }
    if let Some(crf) = args.crf {
        config.crf = crf;
    }
    if let Some(ref preset) = args.preset {
        config.preset = preset.clone();
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if args.mute {
        config.mute = true;
    }
    if !args.keywords.is_empty() {
        config.keywords = args.keywords.clone();
    }
    if !args.ignore_keywords.is_empty() {
        config.ignore_keywords = args.ignore_keywords.clone();
    }
    if args.no_pad {
        config.no_pad = true;
    }
    if args.no_trash {
        config.no_trash = true;
    }
    if args.no_batch_stamp {
        config.batch_stamp = false;
    }
    if let Some(ref bin) = args.ffmpeg_bin {
        config.ffmpeg_bin = bin.clone();
    }
    if let Some(concurrent) = args.concurrent {
        config.concurrent = concurrent;
    }
    if args.no_notify {
        config.notify = false;
    }
    if let Some(ref log_file) = args.log_file {
        config.log_file = Some(log_file.clone());
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if args.parallel_split {
        config.parallel_split = true;
    }
    if args.gpu {
        config.gpu = true;
    }
    config
}

/// Duplicate log output to stdout and the configured log file
struct TeeWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stdout().write_all(buf)?;
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()?;
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
        Ok(())
    }
}

fn init_logging(verbose: bool, log_file: Option<&PathBuf>) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = Arc::new(Mutex::new(
                std::fs::OpenOptions::new().create(true).append(true).open(path)?,
            ));
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(move || TeeWriter { file: file.clone() })
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(Config::default_path);
    let config = match config_path {
        Some(path) => Config::from_file(&path).await.unwrap_or_else(|e| {
            eprintln!("Failed to load config file, using defaults: {}", e);
            Config::default()
        }),
        None => Config::default(),
    };
    let mut config = merge_flags(config, &args);

    init_logging(args.verbose, config.log_file.as_ref())?;
    config.validate()?;

    let platform = vidwatch::platform::PlatformCommands::new();
    if config.ffmpeg_bin.is_empty() && !platform.is_command_available("ffmpeg").await {
        warn!("⚠️ ffmpeg not found on PATH; conversions will fail until it is installed");
    }

    if args.watch {
        if !args.inputs.is_empty() {
            config.watch_dirs = args.inputs.iter().map(PathBuf::from).collect();
        }
        if config.watch_dirs.is_empty() {
            config.watch_dirs = vec![PathBuf::from(".")];
        }

        info!("👀 Watch mode started (Ctrl+C to stop)");
        let watcher = DirectoryWatcher::new(
            config.clone(),
            ProcessingSet::new(),
            WorkerPool::new(config.effective_concurrency()),
            EventBus::disabled(),
        );
        watcher.run().await?;
        return Ok(());
    }

    let patterns = if args.inputs.is_empty() {
        vec![".".to_string()]
    } else {
        args.inputs.clone()
    };

    let processor = BatchProcessor::new(config, EventBus::disabled());
    let stats = processor.run(&patterns).await?;
    if stats.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
