//! Environment checks and Android SDK tool discovery

use camino::Utf8PathBuf;

use crate::errors::ApkCompareError;

pub const ANDROID_HOME: &str = "ANDROID_HOME";
pub const JAVA_HOME: &str = "JAVA_HOME";

/// Value of an environment variable, treating empty and non-UTF-8 values as unset
fn variable(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

pub fn check_variable_set(name: &str) -> Result<(), ApkCompareError> {
    match variable(name) {
        Some(value) => {
            log::debug!("{} = {}", name, value);
            Ok(())
        }
        None => {
            log::error!("{} is not set", name);
            Err(ApkCompareError::VariableNotSet(name.to_string()))
        }
    }
}

/// apkanalyzer needs both the SDK and a JVM
pub fn verify_environment() -> Result<(), ApkCompareError> {
    check_variable_set(ANDROID_HOME)?;
    check_variable_set(JAVA_HOME)
}

/// `$ANDROID_HOME/tools/bin`, where the SDK command-line tools live
pub fn android_tools_bin_dir() -> Result<Utf8PathBuf, ApkCompareError> {
    let android_home =
        variable(ANDROID_HOME).ok_or_else(|| ApkCompareError::VariableNotSet(ANDROID_HOME.to_string()))?;
    Ok(tools_bin_dir(android_home))
}

fn tools_bin_dir(android_home: impl Into<Utf8PathBuf>) -> Utf8PathBuf {
    let mut dir = android_home.into();
    dir.push("tools");
    dir.push("bin");
    dir
}
