//! Compare two builds of an Android application package.
//!
//! The report covers three areas:
//!
//! - headline numbers (download size, file size, method count),
//! - per-file size changes inside the archive, grouped by area,
//! - changed manifest declarations.
//!
//! The comparison itself works on plain text: the decoded manifests and the
//! size listing produced by `apkanalyzer`. Gathering that text is the job of
//! the [`analyzer`] module.
//!
//! ```
//! use apk_compare::{generate_report, PlainData, ReportInputs};
//!
//! let inputs = ReportInputs {
//!     previous: PlainData::new(4096, 8192, 120),
//!     current: PlainData::new(6144, 8192, 125),
//!     file_diff: Some("100\t2200\t2100\t/res/a.png".to_string()),
//!     previous_manifest: None,
//!     current_manifest: None,
//! };
//! let report = generate_report(&inputs).unwrap();
//! assert!(report.starts_with("Download size: 6.00 KB (diff: +2.00 KB)"));
//! assert!(report.ends_with("Cannot get manifests"));
//! ```

pub mod analyzer;
pub mod env;
pub mod errors;
pub mod file_diff;
pub mod formatting;
pub mod manifest;
pub mod plain_data;
pub mod reporting;
pub mod types;

pub use analyzer::{AnalyzerConfig, ApkAnalyzer, CommandRunner, ProcessRunner};
pub use errors::{ApkCompareError, FormatError, ParseError};
pub use file_diff::{FileCategory, FileDiffLine};
pub use manifest::{compare_manifests, ManifestDiff, ManifestDocument};
pub use plain_data::{compare_plain_data, PlainData};
pub use reporting::{
    assemble_report, generate_report, render, ComparisonSummary, ReportFormat, ReportInputs,
};
