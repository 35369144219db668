//! Magic-number tables and leading-byte detection.
//!
//! Two fixed tables: known signatures per declared content type (used to
//! catch declared/actual contradictions) and a short blocklist of
//! executable/bytecode formats that are rejected regardless of declared type.

/// Number of leading bytes captured as the signature fingerprint.
pub const FINGERPRINT_LEN: usize = 8;

pub const PDF_TYPE: &str = "application/pdf";
pub const ZIP_TYPE: &str = "application/zip";

const PDF: &[u8] = b"%PDF";
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF: &[u8] = b"GIF8";
const ZIP: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const OLE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const PE: &[u8] = &[0x4D, 0x5A];
const ELF: &[u8] = &[0x7F, 0x45, 0x4C, 0x46];
// Also the Mach-O universal ("fat") binary magic.
const JAVA_CLASS: &[u8] = &[0xCA, 0xFE, 0xBA, 0xBE];
const MACH_O_32: &[u8] = &[0xFE, 0xED, 0xFA, 0xCE];
const MACH_O_64: &[u8] = &[0xFE, 0xED, 0xFA, 0xCF];
const MACH_O_32_REV: &[u8] = &[0xCE, 0xFA, 0xED, 0xFE];
const MACH_O_64_REV: &[u8] = &[0xCF, 0xFA, 0xED, 0xFE];
const UNIX_AR: &[u8] = b"!<arch>\n";

/// Expected leading-byte signatures for a declared content type. `None`
/// means the type is not in the table and signature matching is skipped
/// (the blocklist still applies).
pub fn expected_signatures(content_type: &str) -> Option<&'static [&'static [u8]]> {
    let normalized = content_type.to_lowercase();
    match normalized.as_str() {
        "application/pdf" => Some(&[PDF]),
        "image/jpeg" | "image/jpg" => Some(&[JPEG]),
        "image/png" => Some(&[PNG]),
        "image/gif" => Some(&[GIF]),
        // Zip containers: plain archives and OOXML Office formats.
        "application/zip"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            Some(&[ZIP])
        }
        // Legacy Office formats share the OLE compound-file header.
        "application/msword"
        | "application/vnd.ms-excel"
        | "application/vnd.ms-powerpoint" => Some(&[OLE]),
        _ => None,
    }
}

/// True for `text/*` declarations, which skip signature matching and run the
/// binary-content heuristic instead.
pub fn is_text_declaration(content_type: &str) -> bool {
    content_type.to_lowercase().starts_with("text/")
}

/// Best-effort content type derived from the payload head.
pub fn detect(data: &[u8]) -> Option<&'static str> {
    // Dangerous formats first so a renamed executable is identified as such.
    if let Some(name) = detect_dangerous(data) {
        return Some(name);
    }
    if data.starts_with(PDF) {
        Some(PDF_TYPE)
    } else if data.starts_with(PNG) {
        Some("image/png")
    } else if data.starts_with(JPEG) {
        Some("image/jpeg")
    } else if data.starts_with(GIF) {
        Some("image/gif")
    } else if data.starts_with(ZIP) {
        Some(ZIP_TYPE)
    } else if data.starts_with(OLE) {
        Some("application/x-ole-storage")
    } else {
        None
    }
}

/// Matches the payload head against the executable/bytecode blocklist,
/// returning the detected format name.
pub fn detect_dangerous(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(PE) {
        Some("application/x-msdownload")
    } else if data.starts_with(ELF) {
        Some("application/x-executable")
    } else if data.starts_with(JAVA_CLASS) {
        Some("application/java-vm")
    } else if data.starts_with(MACH_O_32)
        || data.starts_with(MACH_O_64)
        || data.starts_with(MACH_O_32_REV)
        || data.starts_with(MACH_O_64_REV)
    {
        Some("application/x-mach-binary")
    } else if data.starts_with(UNIX_AR) {
        Some("application/x-archive")
    } else {
        None
    }
}

/// Hex-encoded fingerprint of the leading bytes.
pub fn fingerprint_hex(data: &[u8]) -> String {
    let n = data.len().min(FINGERPRINT_LEN);
    hex::encode(&data[..n])
}

/// Whether the payload head matches any of the declared type's known
/// signatures. `None` when the declared type is not in the table.
pub fn matches_declared(data: &[u8], content_type: &str) -> Option<bool> {
    expected_signatures(content_type)
        .map(|signatures| signatures.iter().any(|sig| data.starts_with(sig)))
}
