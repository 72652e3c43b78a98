//! # Result Record Module
//!
//! Una riga JSON per ogni job completato: è l'artefatto durevole su cui si
//! appoggiano i consumatori esterni (aggregazione statistiche). La riga passa
//! per il logger, quindi arriva nel log file con un prefisso timestamp: i
//! consumatori individuano il primo `{` per isolare il payload JSON.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Durable per-job record, one JSON line per completed conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub duration_sec: f64,
    pub original_size: u64,
    pub converted_size: u64,
    pub size_diff: i64,
    pub timestamp: String,
}

impl ResultRecord {
    pub fn new(
        input: &Path,
        output: &Path,
        duration_sec: f64,
        original_size: u64,
        converted_size: u64,
    ) -> Self {
        Self {
            kind: "conversion_result".to_string(),
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            duration_sec,
            original_size,
            converted_size,
            size_diff: original_size as i64 - converted_size as i64,
            timestamp: Local::now().to_rfc3339(),
        }
    }

    /// Serialize to the newline-delimited JSON payload
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a record out of a timestamped log line.
    ///
    /// Returns `None` for lines that do not carry a conversion result.
    pub fn parse_line(line: &str) -> Option<ResultRecord> {
        let start = line.find('{')?;
        let record: ResultRecord = serde_json::from_str(&line[start..]).ok()?;
        if record.kind == "conversion_result" {
            Some(record)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size_diff() {
        let record = ResultRecord::new(
            Path::new("/in/a.mov"),
            Path::new("/out/a.mp4"),
            12.5,
            1_000_000,
            400_000,
        );
        assert_eq!(record.kind, "conversion_result");
        assert_eq!(record.size_diff, 600_000);
    }

    #[test]
    fn test_negative_size_diff_when_output_grows() {
        let record =
            ResultRecord::new(Path::new("a.mov"), Path::new("a.mp4"), 1.0, 100, 250);
        assert_eq!(record.size_diff, -150);
    }

    #[test]
    fn test_parse_line_with_log_prefix() {
        let record = ResultRecord::new(
            Path::new("/in/a.mov"),
            Path::new("/out/a.mp4"),
            3.0,
            500,
            200,
        );
        let line = format!(
            "2024-01-02T03:04:05.000Z  INFO vidwatch::engine: {}",
            record.to_json_line().unwrap()
        );

        let parsed = ResultRecord::parse_line(&line).unwrap();
        assert_eq!(parsed.input, PathBuf::from("/in/a.mov"));
        assert_eq!(parsed.converted_size, 200);
    }

    #[test]
    fn test_parse_line_rejects_other_lines() {
        assert!(ResultRecord::parse_line("plain log line, no payload").is_none());
        assert!(ResultRecord::parse_line(r#"INFO {"type":"other","x":1}"#).is_none());
    }
}
