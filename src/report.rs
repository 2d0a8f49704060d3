//! Caller-facing rendering of search results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::worker::{SearchProgress, SearchResult};

/// A search result in the shape handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Base58 public key
    pub public_key: String,
    /// 64-byte Solana secret key (`seed || public_key`)
    pub secret_key: Vec<u8>,
    pub iterations_count: u64,
    pub elapsed_ms: u64,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&SearchResult> for Report {
    fn from(result: &SearchResult) -> Self {
        Self {
            public_key: result.keypair.encoded_public_key().into_string(),
            secret_key: result.keypair.secret_key_bytes().to_vec(),
            iterations_count: result.total_attempts,
            elapsed_ms: u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Public Key:  {}", self.public_key)?;
        writeln!(f, "Secret Key:  {:?}", self.secret_key)?;
        writeln!(f, "Iterations:  {}", format_number(self.iterations_count))?;
        write!(f, "Elapsed:     {:.2}s", self.elapsed_ms as f64 / 1000.0)
    }
}

/// One-line progress summary.
pub fn progress_line(progress: &SearchProgress) -> String {
    format!(
        "[{:>4}s] Generated {} keys ({}/s), probability {:.1}%",
        progress.elapsed.as_secs(),
        format_number(progress.attempts),
        format_number(progress.keys_per_second() as u64),
        progress.probability() * 100.0
    )
}

pub fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use std::time::Duration;

    fn make_result() -> SearchResult {
        SearchResult {
            keypair: Keypair::from_seed([1u8; 32]),
            total_attempts: 1234,
            elapsed: Duration::from_millis(1500),
            worker_id: 0,
            worker_attempts: vec![1000, 234],
        }
    }

    #[test]
    fn test_report_fields() {
        let result = make_result();
        let report = Report::from(&result);
        assert_eq!(report.public_key, result.keypair.encoded_public_key().as_str());
        assert_eq!(report.secret_key.len(), 64);
        assert_eq!(&report.secret_key[..32], &[1u8; 32]);
        assert_eq!(report.iterations_count, 1234);
        assert_eq!(report.elapsed_ms, 1500);
    }

    #[test]
    fn test_json_field_names() {
        let report = Report::from(&make_result());
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["publicKey"], report.public_key.as_str());
        assert_eq!(value["iterationsCount"], 1234);
        assert_eq!(value["elapsedMs"], 1500);
        assert_eq!(value["secretKey"].as_array().unwrap().len(), 64);
    }

    #[test]
    fn test_display() {
        let text = Report::from(&make_result()).to_string();
        assert!(text.contains("Iterations:  1.23K"));
        assert!(text.contains("Elapsed:     1.50s"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_500), "1.50K");
        assert_eq!(format_number(2_000_000), "2.00M");
        assert_eq!(format_number(3_000_000_000), "3.00B");
    }

    #[test]
    fn test_progress_line() {
        let progress = SearchProgress {
            attempts: 2_000,
            elapsed: Duration::from_secs(2),
            difficulty: 1.0,
        };
        let line = progress_line(&progress);
        assert!(line.contains("2.00K keys"));
        assert!(line.contains("(1.00K/s)"));
        assert!(line.contains("probability 100.0%"));
    }
}
