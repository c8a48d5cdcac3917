//! Headline numbers of a build: download size, installed size, method count

use crate::{
    formatting::{human_readable_size, sign},
    types::{ByteSize, MethodCount},
};

/// Scalar metrics of one APK. `-1` marks a value apkanalyzer could not provide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlainData {
    pub download_size: ByteSize,
    pub file_size: ByteSize,
    pub methods_count: MethodCount,
}

impl PlainData {
    pub fn new(download_size: i64, file_size: i64, methods_count: i64) -> Self {
        Self {
            download_size: ByteSize::new(download_size),
            file_size: ByteSize::new(file_size),
            methods_count: MethodCount::new(methods_count),
        }
    }
}

fn size_line(label: &str, previous: ByteSize, current: ByteSize) -> String {
    let diff = (current - previous).value();
    format!(
        "{label}: {size} (diff: {sign}{diff})",
        size = human_readable_size(current.value()),
        sign = sign(diff),
        diff = human_readable_size(diff),
    )
}

/// Three report lines comparing `previous` to `current`
pub fn compare_plain_data(previous: &PlainData, current: &PlainData) -> String {
    let methods_diff = (current.methods_count - previous.methods_count).value();
    let lines = [
        size_line("Download size", previous.download_size, current.download_size),
        size_line("File size", previous.file_size, current.file_size),
        format!(
            "Methods count: {count} (diff: {sign}{diff})",
            count = current.methods_count.value(),
            sign = sign(methods_diff),
            diff = methods_diff.unsigned_abs(),
        ),
    ];
    lines.join("\n")
}
