//! # File Discovery & Filter Module
//!
//! Questo modulo espande gli argomenti di input in candidati concreti e
//! applica il filtro keyword (solo batch mode; il watcher riusa il filtro).
//!
//! ## Responsabilità:
//! - Espansione di `~` e `~/...` rispetto alla home directory
//! - Una directory si espande in una walk ricorsiva sulle estensioni video
//! - Un pattern letterale viene espanso con glob così com'è
//! - Deduplica per path esatto preservando l'ordine di discovery
//! - Filtro keyword case-insensitive: exclude vince sempre su include
//!
//! ## Formati riconosciuti:
//! - **Video**: MOV, MP4, M4V, AVI, MKV (case-insensitive)
//!
//! Gli errori di risoluzione di un pattern non sono fatali: il pattern viene
//! saltato e la discovery continua con gli altri.

use crate::error::ConvertError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recognized video extensions (lowercase)
pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "avi", "mkv"];

/// Expands input patterns and filters candidates
pub struct FileDiscovery;

impl FileDiscovery {
    /// Check if a path carries a recognized video extension
    pub fn is_video_file(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Check if a filename starts with the hidden-file marker
    pub fn is_hidden(file_name: &str) -> bool {
        file_name.starts_with('.')
    }

    /// Apply the keyword filter to a filename.
    ///
    /// Any exclude-keyword substring match drops the file regardless of the
    /// include list; otherwise, when includes are configured, at least one
    /// must match. Matching is case-insensitive on both sides.
    pub fn should_process(file_name: &str, keywords: &[String], ignore_keywords: &[String]) -> bool {
        let lower_name = file_name.to_lowercase();

        if ignore_keywords
            .iter()
            .any(|k| lower_name.contains(&k.to_lowercase()))
        {
            debug!("Skipping {} (ignore keyword match)", file_name);
            return false;
        }

        if !keywords.is_empty()
            && !keywords.iter().any(|k| lower_name.contains(&k.to_lowercase()))
        {
            debug!("Skipping {} (no include keyword match)", file_name);
            return false;
        }

        true
    }

    /// Expand input patterns into concrete video file candidates.
    ///
    /// Order is discovery order; duplicates are removed by exact path.
    pub fn expand_patterns(patterns: &[String]) -> Vec<PathBuf> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut files = Vec::new();

        for pattern in patterns {
            let expanded = Self::expand_home(pattern);

            let candidates = if expanded.is_dir() {
                Self::walk_directory(&expanded)
            } else {
                Self::glob_pattern(&expanded)
            };

            let candidates = match candidates {
                Ok(c) => c,
                Err(e) => {
                    let e = ConvertError::Discovery {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    };
                    warn!("⚠️ {}, skipping", e);
                    continue;
                }
            };

            for path in candidates {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }

        files
    }

    /// Apply the keyword filter to a list of candidates, preserving order
    pub fn filter_files(
        files: Vec<PathBuf>,
        keywords: &[String],
        ignore_keywords: &[String],
    ) -> Vec<PathBuf> {
        if keywords.is_empty() && ignore_keywords.is_empty() {
            return files;
        }

        files
            .into_iter()
            .filter(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Self::should_process(&name, keywords, ignore_keywords)
            })
            .collect()
    }

    fn expand_home(pattern: &str) -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            if pattern == "~" {
                return home;
            }
            if let Some(rest) = pattern.strip_prefix("~/") {
                return home.join(rest);
            }
        }
        PathBuf::from(pattern)
    }

    fn walk_directory(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if Self::is_video_file(path) {
                files.push(path.to_path_buf());
            }
        }
        Ok(files)
    }

    fn glob_pattern(pattern: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let pattern_str = pattern.to_string_lossy();
        let mut files = Vec::new();
        for entry in glob::glob(&pattern_str)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("⚠️ Unreadable glob match: {}", e),
            }
        }
        Ok(files)
    }
}
