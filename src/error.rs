//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Encoder`: ffmpeg è uscito con codice non-zero (output catturato incluso)
//! - `Split`: Il pass di segmentazione è fallito
//! - `Chunk`: La conversione di un singolo chunk è fallita
//! - `Merge`: La concatenazione finale è fallita
//! - `Discovery`: Un pattern di input non è risolvibile
//!
//! Gli errori a livello di job sono sempre isolati: il fallimento di un file
//! non interrompe mai il batch o il watch loop. Due condizioni non producono
//! un errore per contratto: un file sparito durante il debounce viene
//! scartato in silenzio, e il fallimento dello spostamento nel cestino viene
//! solo loggato.

/// Custom error types for the conversion pipeline
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoder failure: {0}")]
    Encoder(String),

    #[error("split failed: {0}")]
    Split(String),

    #[error("chunk {index} failed: {message}")]
    Chunk { index: usize, message: String },

    #[error("merge failed: {0}")]
    Merge(String),

    #[error("discovery error for pattern '{pattern}': {message}")]
    Discovery { pattern: String, message: String },
}
