//! Report generation for APK comparison results
//!
//! The text report is made of three sections, always in this order:
//!
//! 1. **Plain data** - download size, file size and method count
//! 2. **File diff** - per-file size changes grouped by archive area
//! 3. **Manifest diff** - changed manifest declarations
//!
//! Sections are independent of each other and are joined with a single
//! newline. A machine-readable [`ComparisonSummary`] can be produced from the
//! same inputs.

use facet::Facet;

use crate::{
    errors::ApkCompareError,
    file_diff::{self, FileDiffLine},
    manifest::compare_manifests,
    plain_data::{compare_plain_data, PlainData},
    types::ByteSize,
};

/// Available output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Everything gathered about the two builds before any comparison happens
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub previous: PlainData,
    pub current: PlainData,

    /// Raw `apk compare` listing; `None` when it could not be obtained
    pub file_diff: Option<String>,

    /// Decoded manifests; `None` when they could not be obtained
    pub previous_manifest: Option<String>,
    pub current_manifest: Option<String>,
}

/// Join the three report sections in their fixed order
pub fn assemble_report(plain_data_report: &str, compare_report: &str, manifest_report: &str) -> String {
    [plain_data_report, compare_report, manifest_report].join("\n")
}

/// Produce the full text report
pub fn generate_report(inputs: &ReportInputs) -> Result<String, ApkCompareError> {
    let plain_data_report = compare_plain_data(&inputs.previous, &inputs.current);
    let compare_report = file_diff::process_compare_result(inputs.file_diff.as_deref())?;
    let manifest_report = compare_manifests(
        inputs.previous_manifest.as_deref(),
        inputs.current_manifest.as_deref(),
    )?;

    log::info!("Report generated");
    Ok(assemble_report(&plain_data_report, &compare_report, &manifest_report))
}

/// Before/after pair of one scalar metric
#[derive(Debug, Clone, Facet)]
pub struct MetricChange {
    pub previous: i64,
    pub current: i64,
    pub diff: i64,
}

impl MetricChange {
    fn new(previous: i64, current: i64) -> Self {
        Self {
            previous,
            current,
            diff: current - previous,
        }
    }
}

/// One archive entry that made it past the report threshold
#[derive(Debug, Clone, Facet)]
pub struct FileChange {
    pub path: String,
    pub category: String,
    pub previous: i64,
    pub current: i64,
    pub diff: i64,
}

impl From<&FileDiffLine> for FileChange {
    fn from(line: &FileDiffLine) -> Self {
        let value = |size: ByteSize| size.value();
        Self {
            path: line.path.as_str().to_string(),
            category: line.category().label().to_string(),
            previous: value(line.previous_size),
            current: value(line.current_size),
            diff: value(line.diff),
        }
    }
}

/// Machine-readable form of the comparison
#[derive(Debug, Clone, Facet)]
pub struct ComparisonSummary {
    pub download_size: MetricChange,
    pub file_size: MetricChange,
    pub methods_count: MetricChange,

    /// Sorted from the largest growth to the largest shrinkage
    pub files: Vec<FileChange>,

    /// Same text as the manifest section of the text report
    pub manifest: String,
}

impl ComparisonSummary {
    pub fn from_inputs(inputs: &ReportInputs) -> Result<Self, ApkCompareError> {
        let (previous, current) = (&inputs.previous, &inputs.current);
        let lines = file_diff::parse_lines(inputs.file_diff.as_deref())?;
        let files = file_diff::significant(&lines)
            .iter()
            .map(FileChange::from)
            .collect();
        let manifest = compare_manifests(
            inputs.previous_manifest.as_deref(),
            inputs.current_manifest.as_deref(),
        )?;

        Ok(Self {
            download_size: MetricChange::new(
                previous.download_size.value(),
                current.download_size.value(),
            ),
            file_size: MetricChange::new(previous.file_size.value(), current.file_size.value()),
            methods_count: MetricChange::new(
                previous.methods_count.value(),
                current.methods_count.value(),
            ),
            files,
            manifest,
        })
    }

    pub fn to_json(&self) -> String {
        facet_json::to_string(self)
    }
}

/// Render the comparison in the requested format
pub fn render(inputs: &ReportInputs, format: ReportFormat) -> Result<String, ApkCompareError> {
    match format {
        ReportFormat::Text => generate_report(inputs),
        ReportFormat::Json => Ok(ComparisonSummary::from_inputs(inputs)?.to_json()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{NO_CURRENT_MANIFEST, NO_MANIFESTS};

    const PREVIOUS_MANIFEST: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example" android:versionCode="1">
    <uses-sdk android:minSdkVersion="21"/>
    <uses-permission android:name="android.permission.INTERNET"/>
    <application/>
</manifest>"#;

    const CURRENT_MANIFEST: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example" android:versionCode="2">
    <uses-sdk android:minSdkVersion="21"/>
    <uses-permission android:name="android.permission.INTERNET"/>
    <uses-permission android:name="android.permission.CAMERA"/>
    <application/>
</manifest>"#;

    fn inputs() -> ReportInputs {
        ReportInputs {
            previous: PlainData::new(1024 * 1024, 2 * 1024 * 1024, 1000),
            current: PlainData::new(1024 * 1024 + 4096, 2 * 1024 * 1024 + 8192, 1100),
            file_diff: Some("100\t2200\t2100\t/res/a.png\n500\t500\t0\t/lib/x.so\n".to_string()),
            previous_manifest: Some(PREVIOUS_MANIFEST.to_string()),
            current_manifest: Some(CURRENT_MANIFEST.to_string()),
        }
    }

    #[test]
    fn test_assemble_report() {
        assert_eq!(assemble_report("a", "b\nc", "d"), "a\nb\nc\nd");
        assert_eq!(assemble_report("a", "b", ""), "a\nb\n");
    }

    #[test]
    fn test_generate_report() {
        let report = generate_report(&inputs()).unwrap();
        assert_eq!(
            report,
            "Download size: 1.00 MB (diff: +4.00 KB)\n\
             File size: 2.01 MB (diff: +8.00 KB)\n\
             Methods count: 1100 (diff: +100)\n\
             Diff less that 1KB omitted from report!\n\
             Dex files:\n\
             \tTotal diff: 0.0 B\n\
             Libraries:\n\
             \tTotal diff: 0.0 B\n\
             Assets:\n\
             \tTotal diff: 0.0 B\n\
             Resources:\n\
             \tTotal diff: +2.05 KB\n\
             \tres/a.png\n\
             \t\tWas: 100.0 B\n\
             \t\tNow: 2.15 KB\n\
             \t\tDiff: +2.05 KB\n\
             Other:\n\
             \tTotal diff: 0.0 B\n\
             Different versionCode:\n\
             \tWas: 1\n\
             \tNow: 2\n\
             Different uses-permission:\n\
             \tAdded: android.permission.CAMERA"
        );
    }

    #[test]
    fn test_generate_report_with_missing_data() {
        let inputs = ReportInputs {
            previous: PlainData::new(-1, -1, -1),
            current: PlainData::new(-1, -1, -1),
            file_diff: None,
            previous_manifest: None,
            current_manifest: None,
        };
        let report = generate_report(&inputs).unwrap();
        assert!(report.starts_with("Download size: 1.0 B (diff: 0.0 B)\n"));
        assert!(report.ends_with(&format!("Other:\n\tTotal diff: 0.0 B\n{NO_MANIFESTS}")));
    }

    #[test]
    fn test_generate_report_propagates_errors() {
        let mut broken = inputs();
        broken.file_diff = Some("not a diff line".to_string());
        assert!(matches!(generate_report(&broken), Err(ApkCompareError::Format(_))));

        let mut broken = inputs();
        broken.current_manifest = Some("<application/>".to_string());
        assert!(matches!(generate_report(&broken), Err(ApkCompareError::Parse(_))));
    }

    #[test]
    fn test_generate_report_is_idempotent() {
        let inputs = inputs();
        assert_eq!(generate_report(&inputs).unwrap(), generate_report(&inputs).unwrap());
    }

    #[test]
    fn test_summary_from_inputs() {
        let mut inputs = inputs();
        inputs.current_manifest = None;
        let summary = ComparisonSummary::from_inputs(&inputs).unwrap();
        assert_eq!(summary.download_size.diff, 4096);
        assert_eq!(summary.file_size.previous, 2 * 1024 * 1024);
        assert_eq!(summary.methods_count.diff, 100);
        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.files[0].path, "res/a.png");
        assert_eq!(summary.files[0].category, "Resources");
        assert_eq!(summary.manifest, NO_CURRENT_MANIFEST);

        let json = summary.to_json();
        assert!(json.contains("res/a.png"));
        assert!(json.contains("Resources"));
    }

    #[test]
    fn test_render_selects_format() {
        let inputs = inputs();
        assert_eq!(
            render(&inputs, ReportFormat::Text).unwrap(),
            generate_report(&inputs).unwrap()
        );
        assert!(render(&inputs, ReportFormat::Json).unwrap().contains("android.permission.CAMERA"));
    }
}
