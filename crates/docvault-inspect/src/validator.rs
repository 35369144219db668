//! Content inspection pipeline.
//!
//! Runs a fixed sequence of checks over the raw upload bytes and the
//! client-declared metadata, accumulating rejections (hard failures) and
//! warnings (recorded but non-blocking). An upload is accepted only when
//! no rejection was recorded.
//!
//! Check order: emptiness, signature-vs-declared-type, executable
//! blocklist, filename, null bytes, embedded active content, then the
//! optional malware scan. Emptiness is the only check that
//! short-circuits; every other check still runs after a rejection, so
//! the caller sees the complete list of failures in one pass rather
//! than one per attempt. The null-byte warning applies only to
//! text-declared content; NULs are expected in binary formats.

use std::sync::Arc;

use chrono::Utc;
use docvault_core::models::SecurityMetadata;

use crate::filename;
use crate::scanner::{ScanOutcome, VirusScanner};
use crate::signature;

/// How many leading bytes to sample when deciding whether declared
/// `text/*` content actually looks like text.
const TEXT_SAMPLE_LEN: usize = 1024;

/// Fraction of non-printable bytes above which a text declaration is
/// considered suspicious.
const TEXT_BINARY_THRESHOLD: f64 = 0.10;

/// PDF tokens that indicate scripted or auto-executing behavior.
const PDF_ACTIVE_MARKERS: &[&[u8]] = &[
    b"/JavaScript",
    b"/JS",
    b"/OpenAction",
    b"/AA",
    b"/Launch",
];

/// Office files carry VBA macros in this embedded part.
const OOXML_MACRO_MARKER: &[u8] = b"vbaProject.bin";

/// Result of inspecting one upload.
#[derive(Debug, Clone)]
pub struct InspectionReport {
    pub detected_content_type: Option<String>,
    pub signature_hex: String,
    pub executable_like: bool,
    pub active_content: bool,
    pub warnings: Vec<String>,
    pub rejections: Vec<String>,
}

impl InspectionReport {
    pub fn is_accepted(&self) -> bool {
        self.rejections.is_empty()
    }

    /// Convert to the persisted security record. Only meaningful for
    /// accepted uploads; rejections never reach the metadata store.
    pub fn to_security_metadata(&self) -> SecurityMetadata {
        SecurityMetadata {
            detected_content_type: self.detected_content_type.clone(),
            signature_hex: self.signature_hex.clone(),
            executable_like: self.executable_like,
            active_content: self.active_content,
            warnings: self.warnings.clone(),
            scanned_at: Utc::now(),
        }
    }
}

/// Inspects upload content against declared metadata.
///
/// The scanner is optional; when absent the malware check is skipped
/// entirely. When present, scan *errors* reject only in fail-closed mode.
pub struct ContentValidator {
    scanner: Option<Arc<dyn VirusScanner>>,
    scanner_fail_closed: bool,
}

impl ContentValidator {
    pub fn new(scanner: Option<Arc<dyn VirusScanner>>, scanner_fail_closed: bool) -> Self {
        Self {
            scanner,
            scanner_fail_closed,
        }
    }

    /// Validator with no malware scanning configured.
    pub fn without_scanner() -> Self {
        Self::new(None, false)
    }

    pub async fn inspect(
        &self,
        data: &[u8],
        filename: &str,
        declared_content_type: &str,
    ) -> InspectionReport {
        let mut report = InspectionReport {
            detected_content_type: signature::detect(data).map(str::to_string),
            signature_hex: signature::fingerprint_hex(data),
            executable_like: signature::detect_dangerous(data).is_some(),
            active_content: false,
            warnings: Vec::new(),
            rejections: Vec::new(),
        };

        if data.is_empty() {
            report.rejections.push("file is empty".to_string());
            tracing::info!(filename = %filename, "Upload rejected: empty file");
            return report;
        }

        self.check_signature(data, declared_content_type, &mut report);
        self.check_executable(filename, &mut report);

        let name_findings = filename::validate_filename(filename, declared_content_type);
        report.rejections.extend(name_findings.rejections);
        report.warnings.extend(name_findings.warnings);

        if data.contains(&0) && signature::is_text_declaration(declared_content_type) {
            report
                .warnings
                .push("null bytes present in content declared as text".to_string());
        }

        self.check_active_content(data, declared_content_type, &mut report);
        self.check_malware(data, filename, &mut report).await;

        if !report.rejections.is_empty() {
            tracing::info!(
                filename = %filename,
                declared_type = %declared_content_type,
                rejections = ?report.rejections,
                "Upload rejected by content inspection"
            );
        } else if !report.warnings.is_empty() {
            tracing::debug!(
                filename = %filename,
                warnings = ?report.warnings,
                "Upload accepted with warnings"
            );
        }

        report
    }

    fn check_signature(&self, data: &[u8], declared: &str, report: &mut InspectionReport) {
        match signature::matches_declared(data, declared) {
            Some(true) => {}
            Some(false) => {
                let detected = report
                    .detected_content_type
                    .as_deref()
                    .unwrap_or("unrecognized");
                report.rejections.push(format!(
                    "content signature does not match declared type: declared {}, detected {}",
                    declared, detected
                ));
            }
            None => {
                // No fingerprint table for this declared type. For text
                // declarations, fall back to a printability heuristic so a
                // renamed binary still gets flagged.
                if signature::is_text_declaration(declared) && looks_binary(data) {
                    report.warnings.push(format!(
                        "content declared as {} appears to be binary",
                        declared
                    ));
                }
            }
        }
    }

    fn check_executable(&self, filename: &str, report: &mut InspectionReport) {
        if report.executable_like {
            let kind = report
                .detected_content_type
                .as_deref()
                .unwrap_or("executable");
            report
                .rejections
                .push(format!("executable content is not permitted ({})", kind));
            tracing::warn!(
                filename = %filename,
                detected_type = %kind,
                "Executable upload blocked"
            );
        }
    }

    fn check_active_content(&self, data: &[u8], declared: &str, report: &mut InspectionReport) {
        let is_pdf = declared == signature::PDF_TYPE
            || report.detected_content_type.as_deref() == Some(signature::PDF_TYPE);
        if is_pdf {
            for marker in PDF_ACTIVE_MARKERS {
                if contains_subslice(data, marker) {
                    report.active_content = true;
                    report.warnings.push(format!(
                        "document contains active content ({})",
                        String::from_utf8_lossy(marker)
                    ));
                    break;
                }
            }
        }

        let is_zip_family = report.detected_content_type.as_deref() == Some(signature::ZIP_TYPE);
        if is_zip_family && contains_subslice(data, OOXML_MACRO_MARKER) {
            report.active_content = true;
            report
                .warnings
                .push("document contains embedded macros".to_string());
        }
    }

    async fn check_malware(&self, data: &[u8], filename: &str, report: &mut InspectionReport) {
        let Some(scanner) = &self.scanner else {
            return;
        };
        match scanner.scan(data, filename).await {
            ScanOutcome::Clean => {}
            ScanOutcome::Infected(virus) => {
                report
                    .rejections
                    .push(format!("malware detected: {}", virus));
            }
            ScanOutcome::Error(msg) => {
                if self.scanner_fail_closed {
                    report
                        .rejections
                        .push(format!("malware scan unavailable: {}", msg));
                } else {
                    report
                        .warnings
                        .push(format!("malware scan skipped: {}", msg));
                    tracing::warn!(
                        filename = %filename,
                        error = %msg,
                        "Malware scan failed, accepting upload (fail-open)"
                    );
                }
            }
        }
    }
}

/// Share of non-printable bytes in the leading sample.
fn looks_binary(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(TEXT_SAMPLE_LEN)];
    if sample.is_empty() {
        return false;
    }
    let non_printable = sample
        .iter()
        .filter(|&&b| b != b'\n' && b != b'\r' && b != b'\t' && (b < 0x20 || b == 0x7f))
        .count();
    (non_printable as f64 / sample.len() as f64) > TEXT_BINARY_THRESHOLD
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_bytes() -> Vec<u8> {
        let mut data = b"%PDF-1.7\n".to_vec();
        data.extend_from_slice(&[b'x'; 64]);
        data
    }

    struct FixedScanner(ScanOutcome);

    #[async_trait::async_trait]
    impl VirusScanner for FixedScanner {
        async fn scan(&self, _data: &[u8], _filename: &str) -> ScanOutcome {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn empty_file_is_always_rejected() {
        let validator = ContentValidator::without_scanner();
        let report = validator.inspect(&[], "report.pdf", "application/pdf").await;
        assert!(!report.is_accepted());
        assert_eq!(report.rejections, vec!["file is empty".to_string()]);
    }

    #[tokio::test]
    async fn valid_pdf_is_accepted() {
        let validator = ContentValidator::without_scanner();
        let report = validator
            .inspect(&pdf_bytes(), "report.pdf", "application/pdf")
            .await;
        assert!(report.is_accepted(), "rejections: {:?}", report.rejections);
        assert_eq!(
            report.detected_content_type.as_deref(),
            Some("application/pdf")
        );
        assert!(!report.executable_like);
    }

    #[tokio::test]
    async fn executable_masquerading_as_pdf_is_rejected() {
        let mut data = b"MZ".to_vec();
        data.extend_from_slice(&[0u8; 62]);
        let validator = ContentValidator::without_scanner();
        let report = validator.inspect(&data, "report.pdf", "application/pdf").await;
        assert!(!report.is_accepted());
        // Both the mismatch and the blocklist fire.
        assert!(report
            .rejections
            .iter()
            .any(|r| r.contains("does not match declared type")));
        assert!(report
            .rejections
            .iter()
            .any(|r| r.contains("executable content is not permitted")));
        assert!(report.executable_like);
    }

    #[tokio::test]
    async fn mismatch_records_declared_and_detected_types() {
        let png = [
            0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0,
        ];
        let validator = ContentValidator::without_scanner();
        let report = validator.inspect(&png, "photo.jpg", "image/jpeg").await;
        assert!(!report.is_accepted());
        let msg = &report.rejections[0];
        assert!(msg.contains("image/jpeg"), "got: {}", msg);
        assert!(msg.contains("image/png"), "got: {}", msg);
    }

    #[tokio::test]
    async fn binary_content_declared_as_text_gets_warning() {
        let mut data = vec![0u8; 512];
        data.extend_from_slice(b"some trailing text");
        let validator = ContentValidator::without_scanner();
        let report = validator.inspect(&data, "notes.txt", "text/plain").await;
        assert!(report.is_accepted());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("appears to be binary")));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("null bytes")));
    }

    #[tokio::test]
    async fn null_bytes_in_binary_formats_are_not_flagged() {
        let mut data = pdf_bytes();
        data.extend_from_slice(&[0u8; 32]);
        let validator = ContentValidator::without_scanner();
        let report = validator.inspect(&data, "scan.pdf", "application/pdf").await;
        assert!(report.is_accepted());
        assert!(!report.warnings.iter().any(|w| w.contains("null bytes")));
    }

    #[tokio::test]
    async fn pdf_with_javascript_is_flagged_not_rejected() {
        let mut data = pdf_bytes();
        data.extend_from_slice(b"<< /OpenAction << /S /JavaScript >> >>");
        let validator = ContentValidator::without_scanner();
        let report = validator.inspect(&data, "form.pdf", "application/pdf").await;
        assert!(report.is_accepted());
        assert!(report.active_content);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("active content")));
    }

    #[tokio::test]
    async fn macro_enabled_office_file_is_flagged() {
        let mut data = vec![0x50, 0x4b, 0x03, 0x04];
        data.extend_from_slice(b"word/vbaProject.bin");
        let validator = ContentValidator::without_scanner();
        let report = validator
            .inspect(
                &data,
                "doc.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            )
            .await;
        assert!(report.is_accepted());
        assert!(report.active_content);
        assert!(report.warnings.iter().any(|w| w.contains("macros")));
    }

    #[tokio::test]
    async fn infected_file_is_rejected() {
        let validator = ContentValidator::new(
            Some(Arc::new(FixedScanner(ScanOutcome::Infected(
                "Eicar-Test-Signature".to_string(),
            )))),
            false,
        );
        let report = validator
            .inspect(&pdf_bytes(), "report.pdf", "application/pdf")
            .await;
        assert!(!report.is_accepted());
        assert!(report.rejections[0].contains("Eicar-Test-Signature"));
    }

    #[tokio::test]
    async fn scan_error_warns_when_fail_open() {
        let validator = ContentValidator::new(
            Some(Arc::new(FixedScanner(ScanOutcome::Error(
                "connection refused".to_string(),
            )))),
            false,
        );
        let report = validator
            .inspect(&pdf_bytes(), "report.pdf", "application/pdf")
            .await;
        assert!(report.is_accepted());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("malware scan skipped")));
    }

    #[tokio::test]
    async fn scan_error_rejects_when_fail_closed() {
        let validator = ContentValidator::new(
            Some(Arc::new(FixedScanner(ScanOutcome::Error(
                "connection refused".to_string(),
            )))),
            true,
        );
        let report = validator
            .inspect(&pdf_bytes(), "report.pdf", "application/pdf")
            .await;
        assert!(!report.is_accepted());
        assert!(report.rejections[0].contains("malware scan unavailable"));
    }

    #[tokio::test]
    async fn bad_filename_rejects_even_with_valid_content() {
        let validator = ContentValidator::without_scanner();
        let report = validator
            .inspect(&pdf_bytes(), "invoice.pdf.exe", "application/pdf")
            .await;
        assert!(!report.is_accepted());
    }

    #[tokio::test]
    async fn report_converts_to_security_metadata() {
        let validator = ContentValidator::without_scanner();
        let report = validator
            .inspect(&pdf_bytes(), "report.pdf", "application/pdf")
            .await;
        let metadata = report.to_security_metadata();
        assert_eq!(metadata.signature_hex, report.signature_hex);
        assert_eq!(
            metadata.detected_content_type.as_deref(),
            Some("application/pdf")
        );
    }
}
