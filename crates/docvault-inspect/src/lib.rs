//! Docvault Content Inspection Library
//!
//! Byte-level inspection of uploaded documents: magic-number matching against
//! declared content types, an executable blocklist, filename safety rules,
//! embedded-active-content detection, and an optional external malware scan.
//! Inspection is pure over its inputs; only the scan touches the network.

pub mod filename;
pub mod scanner;
pub mod signature;
pub mod validator;

pub use scanner::{ScanOutcome, VirusScanner};
#[cfg(feature = "clamav")]
pub use scanner::ClamAvScanner;
pub use validator::{ContentValidator, InspectionReport};
