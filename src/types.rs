//! Strongly-typed strings and quantities for better type safety

use aliri_braid::braid;
use strong_type::StrongType;

// Strongly-typed quantities. Both are signed: apkanalyzer failures surface
// as -1 and deltas go in either direction.
#[derive(StrongType)]
#[strong_type(auto_operators)]
pub struct ByteSize(i64);

#[derive(StrongType)]
#[strong_type(auto_operators)]
pub struct MethodCount(i64);

/// A path inside the APK archive, e.g. "res/drawable/icon.png" or "classes2.dex"
#[braid]
pub struct ArchivePath;

impl ArchivePathRef {
    /// Whether the path lives under the given top-level archive directory (e.g. "res/")
    pub fn is_under(&self, dir: &str) -> bool {
        self.as_str().starts_with(dir)
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.as_str().ends_with(ext)
    }
}
