//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di conversione
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `crf`: CRF video (0-51, 0 = nessun valore esplicito, default: 22)
//! - `preset`: Preset x264 (default: "faster")
//! - `fps`: Frame rate forzato (0 = frame rate sorgente, default: 30)
//! - `mute`: Disabilita completamente la traccia audio (default: false)
//! - `gpu`: Usa l'encoder hardware H.264 invece di libx264 (default: false)
//! - `no_pad`: Non aggiungere bande nere durante il resize a 1080p
//! - `parallel_split`: Dividi il file in chunk e convertili in parallelo
//! - `concurrent`: Numero di job concorrenti (0 = default 4)
//! - `no_trash`: Non spostare il sorgente nel cestino dopo il successo
//! - `batch_stamp`: Crea una sottodirectory datata per ogni run
//!
//! ## Validazione:
//! - Controlla che crf sia 0-51
//! - Controlla che preset sia un label x264 riconosciuto
//!
//! Ogni job riceve uno snapshot immutabile della configurazione: i campi non
//! cambiano mai durante la vita di un job.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const X264_PRESETS: &[&str] = &[
    "ultrafast", "superfast", "veryfast", "faster", "fast", "medium", "slow", "slower", "veryslow",
];

/// Configuration snapshot consumed by every conversion job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to watch in watch mode
    pub watch_dirs: Vec<PathBuf>,
    /// Output root directory
    pub dest_dir: PathBuf,
    /// Video CRF value (0 = no explicit value, lower = better quality)
    pub crf: u32,
    /// x264 preset label
    pub preset: String,
    /// Forced frame rate (0 = keep source rate)
    pub fps: u32,
    /// Disable the audio stream entirely
    pub mute: bool,
    /// Include keywords - at least one must match the filename
    pub keywords: Vec<String>,
    /// Exclude keywords - any match drops the file, wins over includes
    pub ignore_keywords: Vec<String>,
    /// Skip the centering pad step when scaling to 1080p
    pub no_pad: bool,
    /// Keep the source file instead of moving it to the trash
    pub no_trash: bool,
    /// Create a date-stamped subdirectory per run
    pub batch_stamp: bool,
    /// Explicit path to the ffmpeg binary (empty = use PATH)
    pub ffmpeg_bin: String,
    /// Number of concurrently running jobs (0 = default)
    pub concurrent: usize,
    /// Send a desktop notification on terminal job states
    pub notify: bool,
    /// Optional log file path
    pub log_file: Option<PathBuf>,
    /// Print encoder commands instead of executing them
    pub dry_run: bool,
    /// Split into chunks and sub-encode them in parallel
    pub parallel_split: bool,
    /// Use the hardware H.264 encoder
    pub gpu: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dirs: Vec::new(),
            dest_dir: PathBuf::from("out"),
            crf: 22,
            preset: "faster".to_string(),
            fps: 30,
            mute: false,
            keywords: Vec::new(),
            ignore_keywords: Vec::new(),
            no_pad: false,
            no_trash: false,
            batch_stamp: true,
            ffmpeg_bin: String::new(),
            concurrent: 0,
            notify: true,
            log_file: None,
            dry_run: false,
            parallel_split: false,
            gpu: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.crf > 51 {
            return Err(anyhow::anyhow!("Video CRF must be between 0 and 51"));
        }

        if !X264_PRESETS.contains(&self.preset.as_str()) {
            return Err(anyhow::anyhow!("Unknown x264 preset: {}", self.preset));
        }

        Ok(())
    }

    /// Effective worker-pool size (also bounds split-mode sub-encoding)
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrent == 0 {
            4
        } else {
            self.concurrent
        }
    }

    /// Default config file location (`~/.config/vidwatch/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".config").join("vidwatch").join("config.json"))
    }

    /// Load configuration from file, falling back to defaults when absent
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
