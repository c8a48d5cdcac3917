//! Thin wrapper around the Android SDK `apkanalyzer` tool
//!
//! All raw inputs of a comparison come from here. Failures of the tool are
//! logged and turned into "unavailable" values (`-1` for numbers, `None` for
//! text) so that one broken query does not prevent the rest of the report.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};

use crate::{env, errors::ApkCompareError, plain_data::PlainData, reporting::ReportInputs};

/// Value used for a number apkanalyzer could not provide
pub const UNAVAILABLE: i64 = -1;

const APKANALYZER: &str = if cfg!(windows) {
    "apkanalyzer.bat"
} else {
    "apkanalyzer"
};

/// Where to find apkanalyzer
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub executable: Utf8PathBuf,
}

impl AnalyzerConfig {
    /// Locate apkanalyzer under `$ANDROID_HOME/tools/bin`
    pub fn from_env() -> Result<Self, ApkCompareError> {
        env::verify_environment()?;
        let executable = env::android_tools_bin_dir()?.join(APKANALYZER);
        Ok(Self { executable })
    }

    /// Use an explicitly given apkanalyzer. It still needs a JVM.
    pub fn with_executable(executable: Utf8PathBuf) -> Result<Self, ApkCompareError> {
        env::check_variable_set(env::JAVA_HOME)?;
        Ok(Self { executable })
    }

    pub fn runner(&self) -> Result<ProcessRunner, ApkCompareError> {
        if !self.executable.is_file() {
            log::error!("apkanalyzer not found at {}", self.executable);
            return Err(ApkCompareError::AnalyzerNotFound(self.executable.clone()));
        }
        Ok(ProcessRunner {
            executable: self.executable.clone(),
        })
    }
}

/// Runs one apkanalyzer invocation and returns its standard output
pub trait CommandRunner {
    fn run(&self, args: &[&str]) -> Result<String, ApkCompareError>;
}

/// Spawns the real apkanalyzer executable
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: Utf8PathBuf,
}

impl CommandRunner for ProcessRunner {
    fn run(&self, args: &[&str]) -> Result<String, ApkCompareError> {
        let command = format!("apkanalyzer {}", args.join(" "));
        log::info!("Executing command: {}", command);

        let output = Command::new(&self.executable)
            .args(args)
            .output()
            .map_err(|e| ApkCompareError::AnalyzerFailed {
                command: command.clone(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ApkCompareError::AnalyzerFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ApkCompareError::InvalidAnalyzerOutput {
            command,
            output: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

/// Queries apkanalyzer for everything a report needs
pub struct ApkAnalyzer<R> {
    runner: R,
}

impl<R: CommandRunner> ApkAnalyzer<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn query(&self, what: &str, args: &[&str]) -> Option<String> {
        match self.runner.run(args) {
            Ok(output) => Some(output),
            Err(e) => {
                log::error!("Failed to get {}, error: {}", what, e);
                None
            }
        }
    }

    fn number(&self, what: &str, args: &[&str]) -> i64 {
        let output = match self.query(what, args) {
            Some(output) => output,
            None => return UNAVAILABLE,
        };
        match output.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                log::error!("Failed to get {}, unexpected output: '{}'", what, output.trim());
                UNAVAILABLE
            }
        }
    }

    /// Estimated compressed transfer size, in bytes
    pub fn download_size(&self, apk: &Utf8Path) -> i64 {
        self.number("download size", &["apk", "download-size", apk.as_str()])
    }

    /// Raw size of the APK file, in bytes
    pub fn file_size(&self, apk: &Utf8Path) -> i64 {
        self.number("file size", &["apk", "file-size", apk.as_str()])
    }

    /// Total method references across all dex files
    pub fn methods_count(&self, apk: &Utf8Path) -> i64 {
        let output = match self.query("methods count", &["dex", "references", apk.as_str()]) {
            Some(output) => output,
            None => return UNAVAILABLE,
        };

        // One `classesN.dex\t<count>` line per dex file
        let counts: Option<Vec<i64>> = output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split('\t').nth(1).and_then(|count| count.trim().parse().ok()))
            .collect();

        match counts {
            Some(counts) => counts.iter().sum(),
            None => {
                log::error!("Failed to get methods count, unexpected output: '{}'", output.trim());
                UNAVAILABLE
            }
        }
    }

    /// The decoded `AndroidManifest.xml`
    pub fn manifest(&self, apk: &Utf8Path) -> Option<String> {
        self.query("manifest", &["manifest", "print", apk.as_str()])
    }

    /// Per-file size differences between two APKs
    pub fn compare(&self, previous: &Utf8Path, current: &Utf8Path) -> Option<String> {
        self.query(
            "compare result",
            &[
                "apk",
                "compare",
                "--different-only",
                "--files-only",
                previous.as_str(),
                current.as_str(),
            ],
        )
    }

    /// `versionName` as shown by `apk summary` (application id, version code, version name)
    pub fn version_name(&self, apk: &Utf8Path) -> Option<String> {
        let summary = self.query("app summary", &["apk", "summary", apk.as_str()])?;
        summary.split('\t').nth(2).map(|name| name.trim().to_string())
    }

    pub fn plain_data(&self, apk: &Utf8Path) -> PlainData {
        PlainData::new(
            self.download_size(apk),
            self.file_size(apk),
            self.methods_count(apk),
        )
    }

    /// Gather all inputs of a report comparing `previous` to `current`
    pub fn collect(&self, previous: &Utf8Path, current: &Utf8Path) -> ReportInputs {
        if let (Some(from), Some(to)) = (self.version_name(previous), self.version_name(current)) {
            log::info!("Comparing version {} with {}", from, to);
        }

        ReportInputs {
            previous: self.plain_data(previous),
            current: self.plain_data(current),
            file_diff: self.compare(previous, current),
            previous_manifest: self.manifest(previous),
            current_manifest: self.manifest(current),
        }
    }
}
