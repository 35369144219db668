//! External malware scanning capability.
//!
//! The scanner is pluggable: the validator only sees the [`VirusScanner`]
//! trait and a three-way outcome. Whether a scan *error* blocks the upload
//! is a policy decision owned by the caller (fail-open by default).

use async_trait::async_trait;

#[cfg(feature = "clamav")]
use std::str;
#[cfg(feature = "clamav")]
use std::time::{Duration, Instant};

/// Outcome of a malware scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Clean,
    /// Malware detected; carries the signature name.
    Infected(String),
    /// The scan itself failed (unreachable daemon, timeout, bad response).
    Error(String),
}

/// Pluggable malware-scan capability.
#[async_trait]
pub trait VirusScanner: Send + Sync {
    async fn scan(&self, data: &[u8], filename: &str) -> ScanOutcome;
}

/// ClamAV daemon scanner over TCP.
#[cfg(feature = "clamav")]
#[derive(Clone)]
pub struct ClamAvScanner {
    host: String,
    port: u16,
    timeout_secs: u64,
}

#[cfg(feature = "clamav")]
impl ClamAvScanner {
    pub fn new(host: String, port: u16) -> Self {
        Self::with_timeout(host, port, 30)
    }

    /// Create with a custom scan timeout (for large files or slow daemons).
    pub fn with_timeout(host: String, port: u16, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            timeout_secs,
        }
    }
}

#[cfg(feature = "clamav")]
#[async_trait]
impl VirusScanner for ClamAvScanner {
    /// Scan in-memory data using the sync client inside spawn_blocking to
    /// avoid !Send tokio futures.
    async fn scan(&self, data: &[u8], filename: &str) -> ScanOutcome {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, filename = %filename, "Starting malware scan");
        let data = data.to_vec();
        let host = self.host.clone();
        let port = self.port;
        let timeout_secs = self.timeout_secs;

        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || {
                let address = format!("{}:{}", host, port);
                let connection = clamav_client::Tcp {
                    host_address: address.as_str(),
                };
                match clamav_client::scan_buffer(data.as_slice(), connection, None) {
                    Ok(response_bytes) => match clamav_client::clean(&response_bytes) {
                        Ok(true) => {
                            tracing::info!(
                                duration_ms = start.elapsed().as_millis(),
                                "Malware scan completed: clean"
                            );
                            ScanOutcome::Clean
                        }
                        Ok(false) => {
                            let response_str = match str::from_utf8(&response_bytes) {
                                Ok(s) => s.trim(),
                                Err(_) => "unknown",
                            };
                            let virus_name = if response_str.contains("FOUND") {
                                response_str
                                    .split(':')
                                    .nth(1)
                                    .unwrap_or("unknown")
                                    .split_whitespace()
                                    .next()
                                    .unwrap_or("unknown")
                                    .to_string()
                            } else {
                                "unknown".to_string()
                            };
                            tracing::warn!(
                                duration_ms = start.elapsed().as_millis(),
                                virus = %virus_name,
                                "Malware scan detected infection"
                            );
                            ScanOutcome::Infected(virus_name)
                        }
                        Err(e) => {
                            ScanOutcome::Error(format!("failed to parse scanner response: {}", e))
                        }
                    },
                    Err(e) => ScanOutcome::Error(format!("scan error: {}", e)),
                }
            }),
        )
        .await;

        match result {
            Ok(Ok(outcome)) => {
                if let ScanOutcome::Error(ref msg) = outcome {
                    tracing::error!(error = %msg, "Malware scan failed");
                }
                outcome
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Malware scan task panicked");
                ScanOutcome::Error(format!("scan task join error: {}", e))
            }
            Err(_) => {
                tracing::error!(timeout_secs, "Malware scan timed out");
                ScanOutcome::Error(format!("scan timeout (exceeded {} seconds)", timeout_secs))
            }
        }
    }
}

#[cfg(all(test, feature = "clamav"))]
mod tests {
    use super::*;

    #[test]
    fn clamav_constructors() {
        let _scanner = ClamAvScanner::new("localhost".to_string(), 3310);
        let _scanner_custom = ClamAvScanner::with_timeout("localhost".to_string(), 3310, 60);
    }
}
