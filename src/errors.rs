//! Centralized error definitions for the `apk_compare` crate.
//!
//! Parsing the two textual inputs (manifest XML and the size-diff listing)
//! has its own error type each, so callers comparing only manifests do not
//! have to match on analyzer failures. Both convert into [`ApkCompareError`]
//! through `#[from]`, which keeps `?` usable everywhere else.

use camino::Utf8PathBuf;
use thiserror::Error;

/// A manifest document could not be turned into a [`crate::manifest::ManifestDocument`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("manifest is not well-formed XML: {0}")]
    InvalidXml(#[from] roxmltree::Error),

    #[error("expected <{expected}> as root tag, found <{found}>")]
    UnexpectedRootTag {
        expected: &'static str,
        found: String,
    },

    #[error("<{element}> is missing the required '{attribute}' attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("<{parent}> has no <{element}> child")]
    MissingElement {
        parent: &'static str,
        element: &'static str,
    },
}

/// A line of the size-diff listing did not have the expected shape.
#[derive(Debug, Error)]
#[error("malformed size diff at line {line_number}: {reason} ('{line}')")]
pub struct FormatError {
    /// 1-based position of the offending line in the listing
    pub line_number: usize,
    pub line: String,
    pub reason: String,
}

/// All errors that can originate from `apk_compare`.
#[derive(Debug, Error)]
pub enum ApkCompareError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("{0} is not set")]
    VariableNotSet(String),

    #[error("failed to find 'apkanalyzer'. Expected location: {0}")]
    AnalyzerNotFound(Utf8PathBuf),

    #[error("failed to find an apk at '{0}'")]
    ApkNotFound(Utf8PathBuf),

    #[error("'{command}' failed: {stderr}")]
    AnalyzerFailed { command: String, stderr: String },

    #[error("'{command}' produced unexpected output '{output}'")]
    InvalidAnalyzerOutput { command: String, output: String },

    #[error("failed to write a report to '{0}'")]
    WriteFailed(Utf8PathBuf),
}
