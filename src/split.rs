//! # Split Module
//!
//! Segmentazione del sorgente in chunk a durata fissa e ricomposizione finale.
//!
//! ## Responsabilità:
//! - Pass di segmentazione in stream copy (nessuna ricodifica: demux/remux
//!   puro, veloce e lossless) con timestamp resettati per chunk
//! - Tipi e helper per l'ordinamento dei chunk: il merge deve rigiocare
//!   rigorosamente l'indice crescente, qualunque sia l'ordine di completamento
//! - Costruzione della concat list per il merge in stream copy
//!
//! La sotto-codifica parallela dei chunk è orchestrata dal Conversion Engine;
//! qui vivono solo i passi puri e i due pass ffmpeg di split e merge.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

/// Fixed chunk duration for the segmenting pass, in seconds
pub const SEGMENT_SECONDS: u32 = 300;

/// One fixed-duration segment of a source file.
///
/// `source` is owned by the split step, `converted` by the sub-encode step;
/// both live inside the scoped temp directory.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub source: PathBuf,
    pub converted: PathBuf,
}

/// Outcome of one chunk sub-encode
#[derive(Debug)]
pub struct ChunkResult {
    pub index: usize,
    pub converted: PathBuf,
    pub result: Result<(), ConvertError>,
}

/// Handles file segmentation via the external encoder binary
pub struct Splitter {
    ffmpeg_bin: String,
}

impl Splitter {
    pub fn new(ffmpeg_bin: &str) -> Self {
        let ffmpeg_bin = if ffmpeg_bin.is_empty() {
            "ffmpeg".to_string()
        } else {
            ffmpeg_bin.to_string()
        };
        Self { ffmpeg_bin }
    }

    /// Split the input into stream-copied chunks inside `out_dir`.
    ///
    /// Returns the generated chunk paths in ascending index order.
    pub async fn split(
        &self,
        input: &Path,
        out_dir: &Path,
        segment_seconds: u32,
    ) -> Result<Vec<PathBuf>, ConvertError> {
        let out_pattern = out_dir.join("chunk_%03d.mp4");

        let output = Command::new(&self.ffmpeg_bin)
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-map", "0", "-f", "segment"])
            .args(["-segment_time", &segment_seconds.to_string()])
            // reset_timestamps makes each chunk independently decodable
            .args(["-reset_timestamps", "1"])
            .arg(&out_pattern)
            .output()
            .await
            .map_err(|e| ConvertError::Split(format!("failed to spawn {}: {}", self.ffmpeg_bin, e)))?;

        if !output.status.success() {
            return Err(ConvertError::Split(format!(
                "{}\n{}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let mut chunks: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| {
                        let n = n.to_string_lossy();
                        n.starts_with("chunk_") && n.ends_with(".mp4")
                    })
                    .unwrap_or(false)
            })
            .collect();
        chunks.sort();

        info!(
            "🔪 Split complete: {} -> {} chunks",
            input.file_name().unwrap_or_default().to_string_lossy(),
            chunks.len()
        );
        Ok(chunks)
    }

    /// Stream-copy merge of the ordered concat list into `output`
    pub async fn merge(&self, list_file: &Path, output: &Path) -> Result<(), ConvertError> {
        let cmd_output = Command::new(&self.ffmpeg_bin)
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list_file)
            .args(["-c", "copy", "-y"])
            .arg(output)
            .output()
            .await
            .map_err(|e| ConvertError::Merge(format!("failed to spawn {}: {}", self.ffmpeg_bin, e)))?;

        if !cmd_output.status.success() {
            return Err(ConvertError::Merge(format!(
                "{}\n{}",
                cmd_output.status,
                String::from_utf8_lossy(&cmd_output.stderr)
            )));
        }
        Ok(())
    }
}

/// Validate chunk results and return converted paths in ascending index order.
///
/// The first failing chunk (by index) aborts the whole split conversion; the
/// already-converted siblings are discarded by the caller's temp-dir scope.
pub fn collect_converted(mut results: Vec<ChunkResult>) -> Result<Vec<PathBuf>, ConvertError> {
    results.sort_by_key(|r| r.index);

    let mut converted = Vec::with_capacity(results.len());
    for chunk in results {
        match chunk.result {
            Ok(()) => converted.push(chunk.converted),
            Err(e) => {
                return Err(ConvertError::Chunk {
                    index: chunk.index,
                    message: e.to_string(),
                })
            }
        }
    }
    Ok(converted)
}

/// Build the concat demuxer list for the ordered chunk paths
pub fn build_concat_list(chunks: &[PathBuf]) -> String {
    let mut list = String::new();
    for chunk in chunks {
        list.push_str(&format!("file '{}'\n", chunk.display()));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_chunk(index: usize) -> ChunkResult {
        ChunkResult {
            index,
            converted: PathBuf::from(format!("/tmp/converted/chunk_{:03}.mp4", index)),
            result: Ok(()),
        }
    }

    fn failed_chunk(index: usize, message: &str) -> ChunkResult {
        ChunkResult {
            index,
            converted: PathBuf::from(format!("/tmp/converted/chunk_{:03}.mp4", index)),
            result: Err(ConvertError::Encoder(message.to_string())),
        }
    }

    #[test]
    fn test_merge_order_is_ascending_regardless_of_completion_order() {
        // completion order: 2, 0, 1
        let results = vec![ok_chunk(2), ok_chunk(0), ok_chunk(1)];
        let converted = collect_converted(results).unwrap();

        assert_eq!(
            converted,
            vec![
                PathBuf::from("/tmp/converted/chunk_000.mp4"),
                PathBuf::from("/tmp/converted/chunk_001.mp4"),
                PathBuf::from("/tmp/converted/chunk_002.mp4"),
            ]
        );
    }

    #[test]
    fn test_failing_chunk_aborts_with_its_error() {
        let results = vec![ok_chunk(0), failed_chunk(1, "exit status 1"), ok_chunk(2)];

        match collect_converted(results) {
            Err(ConvertError::Chunk { index, message }) => {
                assert_eq!(index, 1);
                assert!(message.contains("exit status 1"));
            }
            other => panic!("expected chunk error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_first_failing_index_wins_when_several_fail() {
        let results = vec![failed_chunk(2, "late"), failed_chunk(0, "early"), ok_chunk(1)];

        match collect_converted(results) {
            Err(ConvertError::Chunk { index, message }) => {
                assert_eq!(index, 0);
                assert!(message.contains("early"));
            }
            _ => panic!("expected chunk error"),
        }
    }

    #[test]
    fn test_concat_list_format() {
        let chunks = vec![
            PathBuf::from("/tmp/c/chunk_000.mp4"),
            PathBuf::from("/tmp/c/chunk_001.mp4"),
        ];
        let list = build_concat_list(&chunks);
        assert_eq!(
            list,
            "file '/tmp/c/chunk_000.mp4'\nfile '/tmp/c/chunk_001.mp4'\n"
        );
    }
}
