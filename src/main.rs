use std::fs;
use std::process;
use std::time::Duration;

use apk_compare::{
    formatting::format_size_diff_styled, render, AnalyzerConfig, ApkAnalyzer, ApkCompareError,
    ReportFormat, ReportInputs,
};
use camino::{Utf8Path, Utf8PathBuf};
use env_logger::Env;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;

const HELP: &str = "\
Compare two Android APK builds: size metrics, per-file size deltas and manifest changes

USAGE:
    apk-compare --prev-apk-path <PATH> --apk-path <PATH> [OPTIONS]

OPTIONS:
    -h, --help                      Prints help information
    -V, --version                   Prints version information
        --prev-apk-path <PATH>      Previous apk file path to compare with
        --apk-path <PATH>           Current apk file path to compare with
        --output <PATH>             Report file [default: result/report.txt]
        --apkanalyzer <PATH>        apkanalyzer executable [default: $ANDROID_HOME/tools/bin/apkanalyzer]
        --message-format <FMT>      Report format [default: text] [possible values: text, json]
    -v, --verbose                   Log every step

ENVIRONMENT:
    ANDROID_HOME                    Android SDK location, used to find apkanalyzer
    JAVA_HOME                       JVM used by apkanalyzer
";

struct Args {
    help: bool,
    version: bool,
    verbose: bool,
    prev_apk_path: Option<Utf8PathBuf>,
    apk_path: Option<Utf8PathBuf>,
    output: Option<Utf8PathBuf>,
    apkanalyzer: Option<Utf8PathBuf>,
    message_format: ReportFormat,
}

fn parse_message_format(s: &str) -> Result<ReportFormat, &'static str> {
    match s {
        "text" => Ok(ReportFormat::Text),
        "json" => Ok(ReportFormat::Json),
        _ => Err("invalid message format"),
    }
}

fn parse_args(raw_args: Vec<std::ffi::OsString>) -> Result<Args, pico_args::Error> {
    let mut input = pico_args::Arguments::from_vec(raw_args);
    let args = Args {
        help: input.contains(["-h", "--help"]),
        version: input.contains(["-V", "--version"]),
        verbose: input.contains(["-v", "--verbose"]),
        prev_apk_path: input.opt_value_from_str("--prev-apk-path")?,
        apk_path: input.opt_value_from_str("--apk-path")?,
        output: input.opt_value_from_str("--output")?,
        apkanalyzer: input.opt_value_from_str("--apkanalyzer")?,
        message_format: input
            .opt_value_from_fn("--message-format", parse_message_format)?
            .unwrap_or(ReportFormat::Text),
    };

    let remaining = input.finish();
    if !remaining.is_empty() {
        eprintln!("Warning: unused arguments left: {:?}.", remaining);
    }

    Ok(args)
}

fn main() {
    let args = match parse_args(std::env::args_os().skip(1).collect()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}.", e);
            process::exit(1);
        }
    };

    if args.help {
        println!("{}", HELP);
        return;
    }

    if args.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let (previous, current) = match (&args.prev_apk_path, &args.apk_path) {
        (Some(previous), Some(current)) => (previous.clone(), current.clone()),
        _ => {
            eprintln!("Error: both --prev-apk-path and --apk-path are required.");
            eprintln!();
            eprintln!("{}", HELP);
            process::exit(1);
        }
    };

    init_logger(args.verbose);

    if let Err(e) = run(&args, &previous, &current) {
        eprintln!("Error: {}.", e);
        process::exit(1);
    }
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        "warn,apk_compare=debug"
    } else {
        "warn,apk_compare=info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();
}

fn run(args: &Args, previous: &Utf8Path, current: &Utf8Path) -> Result<(), ApkCompareError> {
    for apk in [previous, current] {
        if !apk.is_file() {
            return Err(ApkCompareError::ApkNotFound(apk.to_owned()));
        }
    }

    let config = match args.apkanalyzer {
        Some(ref executable) => AnalyzerConfig::with_executable(executable.clone())?,
        None => AnalyzerConfig::from_env()?,
    };
    let analyzer = ApkAnalyzer::new(config.runner()?);

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Analyzing {} and {}", previous, current));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let inputs = analyzer.collect(previous, current);
    spinner.finish_and_clear();

    let report = render(&inputs, args.message_format)?;

    let output = match args.output {
        Some(ref output) => output.clone(),
        None => default_report_file(args.message_format),
    };
    save_report(&report, &output)?;

    print_summary(&inputs, &output);
    Ok(())
}

fn default_report_file(format: ReportFormat) -> Utf8PathBuf {
    let name = match format {
        ReportFormat::Text => "report.txt",
        ReportFormat::Json => "report.json",
    };
    Utf8PathBuf::from("result").join(name)
}

fn save_report(report: &str, file: &Utf8Path) -> Result<(), ApkCompareError> {
    log::info!("Saving report to {}", file);

    if let Some(dir) = file.parent().filter(|dir| !dir.as_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            log::error!("Failed to create {}: {}", dir, e);
            ApkCompareError::WriteFailed(file.to_owned())
        })?;
    }

    fs::write(file, report).map_err(|e| {
        log::error!("Failed to write {}: {}", file, e);
        ApkCompareError::WriteFailed(file.to_owned())
    })
}

fn print_summary(inputs: &ReportInputs, output: &Utf8Path) {
    let (previous, current) = (&inputs.previous, &inputs.current);
    let download_diff = (current.download_size - previous.download_size).value();
    let file_diff = (current.file_size - previous.file_size).value();
    let methods_diff = (current.methods_count - previous.methods_count).value();

    println!("{} {}", "Download size:".bold(), format_size_diff_styled(download_diff));
    println!("{}     {}", "File size:".bold(), format_size_diff_styled(file_diff));
    println!("{} {:+}", "Methods count:".bold(), methods_diff);
    println!();
    println!("Report saved to {}", output);
}
