//! Filename safety rules.
//!
//! Hard rejections: path traversal, filesystem-reserved characters and
//! device names, dangerous double extensions, and over-long names.
//! Extension/declared-type mismatches are warnings only.

use docvault_core::constants::MAX_FILENAME_CHARS;

/// Extensions that indicate executable content when they appear as the
/// penultimate segment of a double extension (`report.pdf.exe`).
const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "pif", "msi", "dll", "jar", "js", "jse", "vbs", "vbe",
    "sh", "ps1", "app",
];

/// Windows device names, reserved regardless of extension.
const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Findings from filename validation, split into hard rejections and
/// non-fatal warnings.
#[derive(Debug, Default)]
pub struct FilenameFindings {
    pub rejections: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate a user-supplied filename against the declared content type.
pub fn validate_filename(filename: &str, declared_type: &str) -> FilenameFindings {
    let mut findings = FilenameFindings::default();

    if filename.trim().is_empty() {
        findings.rejections.push("filename is empty".to_string());
        return findings;
    }

    if filename.chars().count() > MAX_FILENAME_CHARS {
        findings.rejections.push(format!(
            "filename exceeds {} characters",
            MAX_FILENAME_CHARS
        ));
    }

    if filename.contains("..") {
        findings
            .rejections
            .push("filename contains a path traversal sequence".to_string());
    }

    if filename.contains(RESERVED_CHARS) || filename.chars().any(|c| c.is_control()) {
        findings
            .rejections
            .push("filename contains reserved or control characters".to_string());
    }

    let segments: Vec<&str> = filename.split('.').collect();
    let stem = segments[0].to_lowercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        findings
            .rejections
            .push(format!("'{}' is a reserved filesystem name", segments[0]));
    }

    // Double extension: the final extension hides a dangerous penultimate one
    // (`invoice.pdf.exe` is caught by the last segment; `invoice.exe.pdf` by
    // the penultimate).
    if segments.len() >= 3 {
        let penultimate = segments[segments.len() - 2].to_lowercase();
        if DANGEROUS_EXTENSIONS.contains(&penultimate.as_str()) {
            findings.rejections.push(format!(
                "double extension hides dangerous extension '.{}'",
                penultimate
            ));
        }
    }
    if let Some(last) = segments.last() {
        let last = last.to_lowercase();
        if segments.len() >= 2 && DANGEROUS_EXTENSIONS.contains(&last.as_str()) {
            findings
                .rejections
                .push(format!("dangerous extension '.{}'", last));
        }
    }

    if findings.rejections.is_empty() {
        if let Some(warning) = extension_type_mismatch(filename, declared_type) {
            findings.warnings.push(warning);
        }
    }

    findings
}

/// Expected content types for well-known extensions. Mismatches are
/// warnings rather than rejections; the byte signature is authoritative.
fn expected_types_for_extension(extension: &str) -> Option<&'static [&'static str]> {
    match extension {
        "pdf" => Some(&["application/pdf"]),
        "jpg" | "jpeg" => Some(&["image/jpeg", "image/jpg"]),
        "png" => Some(&["image/png"]),
        "gif" => Some(&["image/gif"]),
        "txt" => Some(&["text/plain"]),
        "csv" => Some(&["text/csv", "text/plain"]),
        "md" => Some(&["text/markdown", "text/plain"]),
        "zip" => Some(&["application/zip"]),
        "doc" => Some(&["application/msword"]),
        "docx" => {
            Some(&["application/vnd.openxmlformats-officedocument.wordprocessingml.document"])
        }
        "xls" => Some(&["application/vnd.ms-excel"]),
        "xlsx" => Some(&["application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"]),
        "ppt" => Some(&["application/vnd.ms-powerpoint"]),
        "pptx" => {
            Some(&["application/vnd.openxmlformats-officedocument.presentationml.presentation"])
        }
        _ => None,
    }
}

fn extension_type_mismatch(filename: &str, declared_type: &str) -> Option<String> {
    let extension = filename.rsplit('.').next()?.to_lowercase();
    let expected = expected_types_for_extension(&extension)?;
    let normalized = declared_type.to_lowercase();
    if expected.iter().any(|t| *t == normalized) {
        None
    } else {
        Some(format!(
            "extension '.{}' does not match declared type '{}'",
            extension, declared_type
        ))
    }
}

/// Reduce a filename to a key-safe form: strip directories, replace anything
/// outside `[A-Za-z0-9._-]`, and bound the length.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let s: String = base
        .chars()
        .take(MAX_FILENAME_CHARS)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim_matches(['_', '.']).is_empty() {
        "file".to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejects(filename: &str) -> bool {
        !validate_filename(filename, "application/pdf")
            .rejections
            .is_empty()
    }

    #[test]
    fn test_plain_filename_accepted() {
        let findings = validate_filename("report.pdf", "application/pdf");
        assert!(findings.rejections.is_empty());
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_path_traversal_rejected() {
        assert!(rejects("../../etc/passwd"));
        assert!(rejects("..\\windows\\system32"));
    }

    #[test]
    fn test_reserved_characters_rejected() {
        assert!(rejects("bad|name.pdf"));
        assert!(rejects("bad?.pdf"));
        assert!(rejects("dir/file.pdf"));
        assert!(rejects("new\nline.pdf"));
    }

    #[test]
    fn test_reserved_device_names_rejected() {
        assert!(rejects("CON.pdf"));
        assert!(rejects("com1.txt"));
        assert!(!rejects("console.pdf"));
    }

    #[test]
    fn test_double_extension_rejected() {
        assert!(rejects("invoice.pdf.exe"));
        assert!(rejects("invoice.exe.pdf"));
        assert!(rejects("run.sh.txt"));
        assert!(!rejects("archive.tar.pdf"));
    }

    #[test]
    fn test_overlong_filename_rejected() {
        let name = format!("{}.pdf", "a".repeat(300));
        assert!(rejects(&name));
    }

    #[test]
    fn test_extension_mismatch_is_a_warning() {
        let findings = validate_filename("report.pdf", "image/jpeg");
        assert!(findings.rejections.is_empty());
        assert_eq!(findings.warnings.len(), 1);
        assert!(findings.warnings[0].contains(".pdf"));
        assert!(findings.warnings[0].contains("image/jpeg"));
    }

    #[test]
    fn test_unknown_extension_no_warning() {
        let findings = validate_filename("data.xyz", "application/octet-stream");
        assert!(findings.rejections.is_empty());
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my report (final).pdf"), "my_report__final_.pdf");
        assert_eq!(sanitize_filename("/tmp/evil/file.txt"), "file.txt");
        assert_eq!(sanitize_filename("___"), "file");
    }
}
