//! Categorized report of per-file size changes inside the APK archive
//!
//! Input is the listing printed by `apkanalyzer apk compare --different-only
//! --files-only`: one `previous\tcurrent\tdiff\t<marker><path>` line per file.

use multimap::MultiMap;

use crate::{
    errors::FormatError,
    formatting::{format_size_diff, human_readable_size, sign},
    types::{ArchivePath, ArchivePathRef, ByteSize},
};

/// Changes of at most this many bytes (either direction) are left out
pub const OMIT_THRESHOLD: i64 = 1024;

const OMITTED_NOTICE: &str = "Diff less that 1KB omitted from report!";

/// Size change of a single archive entry
#[derive(Debug, Clone, PartialEq)]
pub struct FileDiffLine {
    pub previous_size: ByteSize,
    pub current_size: ByteSize,
    /// current - previous, as reported by apkanalyzer
    pub diff: ByteSize,
    pub path: ArchivePath,
}

impl FileDiffLine {
    /// Parse one line of the listing. `line_number` is only used for errors.
    pub fn parse(line: &str, line_number: usize) -> Result<Self, FormatError> {
        let error = |reason: String| FormatError {
            line_number,
            line: line.to_string(),
            reason,
        };

        let terms: Vec<&str> = line.split('\t').collect();
        if terms.len() < 4 {
            return Err(error(format!(
                "expected 4 tab-separated fields, found {}",
                terms.len()
            )));
        }

        let size = |index: usize| {
            terms[index]
                .trim()
                .parse::<i64>()
                .map(|size| ByteSize::new(size))
                .map_err(|e| error(format!("field {} '{}' is not an integer: {e}", index + 1, terms[index])))
        };

        // The path carries a one-character marker in front
        let mut path = terms[3].chars();
        path.next();

        Ok(Self {
            previous_size: size(0)?,
            current_size: size(1)?,
            diff: size(2)?,
            path: ArchivePath::from(path.as_str().to_string()),
        })
    }

    pub fn category(&self) -> FileCategory {
        FileCategory::classify(&self.path)
    }

    fn format(&self, indent: usize) -> String {
        let outer = "\t".repeat(indent);
        let inner = "\t".repeat(indent + 1);
        format!(
            "{outer}{path}\n\
             {inner}Was: {was}\n\
             {inner}Now: {now}\n\
             {inner}Diff: {sign}{diff}",
            path = self.path.as_str(),
            was = human_readable_size(self.previous_size.value()),
            now = human_readable_size(self.current_size.value()),
            sign = sign(self.diff.value()),
            diff = human_readable_size(self.diff.value()),
        )
    }
}

/// Report section an archive entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Dex,
    Libraries,
    Assets,
    Resources,
    Other,
}

type PathMatcher = fn(&ArchivePathRef) -> bool;

/// Evaluated top to bottom, first match wins; unmatched paths are [`FileCategory::Other`]
const CATEGORY_RULES: &[(FileCategory, PathMatcher)] = &[
    (FileCategory::Resources, |p| p.is_under("res/")),
    (FileCategory::Dex, |p| p.has_extension(".dex")),
    (FileCategory::Assets, |p| p.is_under("assets/")),
    (FileCategory::Libraries, |p| p.is_under("lib/")),
];

impl FileCategory {
    /// Order in which sections appear in the report
    pub const REPORT_ORDER: [FileCategory; 5] = [
        FileCategory::Dex,
        FileCategory::Libraries,
        FileCategory::Assets,
        FileCategory::Resources,
        FileCategory::Other,
    ];

    pub fn classify(path: &ArchivePathRef) -> Self {
        CATEGORY_RULES
            .iter()
            .find(|(_, matches)| matches(path))
            .map(|(category, _)| *category)
            .unwrap_or(FileCategory::Other)
    }

    pub fn label(self) -> &'static str {
        match self {
            FileCategory::Dex => "Dex files",
            FileCategory::Libraries => "Libraries",
            FileCategory::Assets => "Assets",
            FileCategory::Resources => "Resources",
            FileCategory::Other => "Other",
        }
    }
}

/// Parse the whole listing. No listing at all means no differences.
pub fn parse_lines(text: Option<&str>) -> Result<Vec<FileDiffLine>, FormatError> {
    let text = match text {
        Some(text) => text,
        None => return Ok(Vec::new()),
    };

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(idx, line)| FileDiffLine::parse(line, idx + 1))
        .collect()
}

/// Drop changes within [`OMIT_THRESHOLD`] and order the rest from the
/// largest growth to the largest shrinkage
pub fn significant(lines: &[FileDiffLine]) -> Vec<FileDiffLine> {
    let mut lines: Vec<FileDiffLine> = lines
        .iter()
        .filter(|line| line.diff.value().unsigned_abs() > OMIT_THRESHOLD as u64)
        .cloned()
        .collect();
    lines.sort_by_key(|line| std::cmp::Reverse(line.diff.value()));
    lines
}

/// Group lines by category, keeping their relative order
pub fn categorize(lines: &[FileDiffLine]) -> MultiMap<FileCategory, FileDiffLine> {
    let mut map = MultiMap::new();
    for line in lines {
        map.insert(line.category(), line.clone());
    }
    map
}

fn add_section(category: FileCategory, entries: &[FileDiffLine], out: &mut Vec<String>) {
    let total: i64 = entries.iter().map(|line| line.diff.value()).sum();
    out.push(format!("{}:", category.label()));
    out.push(format!("\tTotal diff: {}", format_size_diff(total)));
    out.extend(entries.iter().map(|line| line.format(1)));
}

/// Render the categorized report for already parsed lines
pub fn build_report(lines: &[FileDiffLine]) -> String {
    let significant = significant(lines);
    log::debug!(
        "{} of {} changed files exceed the report threshold",
        significant.len(),
        lines.len()
    );

    let categories = categorize(&significant);

    let mut out = vec![OMITTED_NOTICE.to_string()];
    for category in FileCategory::REPORT_ORDER {
        let entries = categories
            .get_vec(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        add_section(category, entries, &mut out);
    }
    out.join("\n")
}

/// Parse the raw listing and render its report
pub fn process_compare_result(text: Option<&str>) -> Result<String, FormatError> {
    Ok(build_report(&parse_lines(text)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(diff: i64, path: &str) -> FileDiffLine {
        FileDiffLine {
            previous_size: ByteSize::new(10_000),
            current_size: ByteSize::new(10_000 + diff),
            diff: ByteSize::new(diff),
            path: ArchivePath::from(path.to_string()),
        }
    }

    fn category_of(path: &str) -> FileCategory {
        FileCategory::classify(&ArchivePath::from(path.to_string()))
    }

    #[test]
    fn test_parse_line_strips_marker() {
        let parsed = FileDiffLine::parse("100\t2200\t2100\t/res/a.png", 1).unwrap();
        assert_eq!(parsed.previous_size.value(), 100);
        assert_eq!(parsed.current_size.value(), 2200);
        assert_eq!(parsed.diff.value(), 2100);
        assert_eq!(parsed.path.as_str(), "res/a.png");
    }

    #[test]
    fn test_parse_line_negative_diff() {
        let parsed = FileDiffLine::parse("4096\t0\t-4096\t~classes2.dex", 1).unwrap();
        assert_eq!(parsed.diff.value(), -4096);
        assert_eq!(parsed.path.as_str(), "classes2.dex");
    }

    #[test]
    fn test_parse_line_errors() {
        let err = FileDiffLine::parse("1\t2\t3", 7).unwrap_err();
        assert_eq!(err.line_number, 7);
        assert_eq!(err.line, "1\t2\t3");

        assert!(FileDiffLine::parse("x\t2\t3\t/a", 1).is_err());
        assert!(FileDiffLine::parse("1\t2.5\t3\t/a", 1).is_err());
        assert!(FileDiffLine::parse("1\t2\t\t/a", 1).is_err());
    }

    #[test]
    fn test_parse_lines_empty_input() {
        assert!(parse_lines(None).unwrap().is_empty());
        assert!(parse_lines(Some("")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_lines_skips_blank_lines_and_reports_position() {
        let lines = parse_lines(Some("1\t2\t1\t/a\n\n3\t4\t1\t/b\n")).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].path.as_str(), "b");

        let err = parse_lines(Some("1\t2\t1\t/a\nbroken\n")).unwrap_err();
        assert_eq!(err.line_number, 2);
    }

    #[test]
    fn test_category_precedence() {
        assert_eq!(category_of("res/drawable/icon.png"), FileCategory::Resources);
        assert_eq!(category_of("res/raw/payload.dex"), FileCategory::Resources);
        assert_eq!(category_of("classes.dex"), FileCategory::Dex);
        assert_eq!(category_of("assets/extra.dex"), FileCategory::Dex);
        assert_eq!(category_of("lib/arm64-v8a/plugin.dex"), FileCategory::Dex);
        assert_eq!(category_of("assets/lib/data.bin"), FileCategory::Assets);
        assert_eq!(category_of("lib/armeabi-v7a/libfoo.so"), FileCategory::Libraries);
        assert_eq!(category_of("resources.arsc"), FileCategory::Other);
        assert_eq!(category_of("AndroidManifest.xml"), FileCategory::Other);
        assert_eq!(category_of("META-INF/CERT.RSA"), FileCategory::Other);
    }

    #[test]
    fn test_significant_filters_and_sorts() {
        let lines = vec![
            line(1024, "a"),
            line(-1024, "b"),
            line(2000, "c"),
            line(-3000, "d"),
            line(1025, "e"),
            line(5000, "f"),
            line(-1025, "g"),
        ];
        let paths: Vec<String> = significant(&lines)
            .iter()
            .map(|l| l.path.as_str().to_string())
            .collect();
        assert_eq!(paths, vec!["f", "c", "e", "g", "d"]);
    }

    #[test]
    fn test_categorize_partitions_lines() {
        let lines = vec![
            line(5000, "classes.dex"),
            line(4000, "res/a.png"),
            line(3000, "classes2.dex"),
            line(2000, "resources.arsc"),
        ];
        let map = categorize(&lines);
        let dex: Vec<&str> = map
            .get_vec(&FileCategory::Dex)
            .unwrap()
            .iter()
            .map(|l| l.path.as_str())
            .collect();
        assert_eq!(dex, vec!["classes.dex", "classes2.dex"]);
        assert_eq!(map.get_vec(&FileCategory::Resources).unwrap().len(), 1);
        assert_eq!(map.get_vec(&FileCategory::Other).unwrap().len(), 1);
        assert!(map.get_vec(&FileCategory::Assets).is_none());
    }

    #[test]
    fn test_build_report_layout() {
        let report =
            process_compare_result(Some("100\t2200\t2100\t/res/a.png\n500\t500\t0\t/lib/x.so")).unwrap();
        assert_eq!(
            report,
            "Diff less that 1KB omitted from report!\n\
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
             \tTotal diff: 0.0 B"
        );
    }

    #[test]
    fn test_build_report_totals_per_category() {
        let lines = vec![
            line(-4096, "classes.dex"),
            line(2048, "classes2.dex"),
            line(512, "classes3.dex"),
        ];
        let report = build_report(&lines);
        assert!(report.contains("Dex files:\n\tTotal diff: -2.00 KB\n\tclasses2.dex\n"));
        assert!(report.contains("\t\tDiff: -4.00 KB\nLibraries:\n\tTotal diff: 0.0 B\n"));
        assert!(!report.contains("classes3.dex"));
    }

    #[test]
    fn test_build_report_without_input() {
        let report = process_compare_result(None).unwrap();
        assert!(report.starts_with(OMITTED_NOTICE));
        assert_eq!(report.lines().count(), 11);
    }

    #[test]
    fn test_build_report_is_idempotent() {
        let text = "10\t9000\t8990\t/lib/x86/liba.so\n9000\t10\t-8990\t/assets/b.bin\n1\t3000\t2999\t/c.txt";
        let first = process_compare_result(Some(text)).unwrap();
        let second = process_compare_result(Some(text)).unwrap();
        assert_eq!(first, second);
    }
}
