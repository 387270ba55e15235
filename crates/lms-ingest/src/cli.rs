//! Command-line interface for `lms-load`

use chrono::{DateTime, Local};
use clap::Parser;
use lms_common::logging::{LogConfig, LogLevel, LogOutput};
use std::path::PathBuf;

use crate::config::{IngestConfig, DEFAULT_MAX_IN_FLIGHT};
use crate::source::validate_source_path;

/// Default directory for per-run results files
pub const DEFAULT_RESULTS_DIR: &str = "results";

#[derive(Parser, Debug)]
#[command(name = "lms-load")]
#[command(author, version, about = "Load LMS assignment data into DynamoDB")]
pub struct Cli {
    /// CSV extract to load
    #[arg(value_parser = validate_source_path)]
    pub file: PathBuf,

    /// Set logging level to DEBUG
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Target table (overrides LMS_TABLE_NAME)
    #[arg(long, env = "LMS_TABLE_NAME")]
    pub table: Option<String>,

    /// Stop after this many items have been written
    #[arg(long, env = "LMS_MAX_ITEMS")]
    pub max_items: Option<u64>,

    /// Maximum concurrent writes
    #[arg(long, env = "LMS_MAX_IN_FLIGHT", default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight: usize,

    /// Directory for the results file [default: results]
    #[arg(long, env = "LMS_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Log to the console only
    #[arg(long)]
    pub no_results_file: bool,
}

/// `load_dynamodb_lms_<YYYYMMDDHHMM>.txt` for a run started at `started`
pub fn results_file_name(started: DateTime<Local>) -> String {
    format!("load_dynamodb_lms_{}.txt", started.format("%Y%m%d%H%M"))
}

impl Cli {
    /// Logging for this run. `LOG_*` variables adjust the defaults; flags
    /// given on the command line win over both.
    pub fn log_config(&self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<LogConfig> {
        let mut config = LogConfig::builder()
            .output(LogOutput::Both)
            .log_dir(DEFAULT_RESULTS_DIR)
            .log_file_name(results_file_name(Local::now()))
            .build()
            .merge_lookup(lookup)?;

        if self.debug {
            config.level = LogLevel::Debug;
        }
        if self.no_results_file {
            config.output = LogOutput::Console;
        }
        if let Some(dir) = &self.results_dir {
            config.log_dir = dir.clone();
        }

        Ok(config)
    }

    pub fn ingest_config(&self) -> IngestConfig {
        let config = IngestConfig::new().with_max_in_flight(self.max_in_flight);
        match self.max_items {
            Some(max_items) => config.with_max_items(max_items),
            None => config,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn extract() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.csv");
        std::fs::write(&path, "Username\n").unwrap();
        let path = path.to_str().unwrap().to_string();
        (dir, path)
    }

    #[test]
    fn test_parse_minimal() {
        let (_dir, path) = extract();
        let cli = Cli::try_parse_from(["lms-load", path.as_str()]).unwrap();

        assert_eq!(cli.file, PathBuf::from(&path));
        assert!(!cli.debug);
        assert!(!cli.no_results_file);
        assert_eq!(cli.results_dir, None);

        let config = cli.ingest_config();
        assert_eq!(config.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
    }

    #[test]
    fn test_parse_all_flags() {
        let (_dir, path) = extract();
        let cli = Cli::try_parse_from([
            "lms-load",
            "-D",
            "--table",
            "lms_assignments_dev",
            "--max-items",
            "5000",
            "--max-in-flight",
            "4",
            "--no-results-file",
            path.as_str(),
        ])
        .unwrap();

        assert!(cli.debug);
        assert!(cli.no_results_file);
        assert_eq!(cli.table.as_deref(), Some("lms_assignments_dev"));

        let config = cli.ingest_config();
        assert_eq!(config.max_items, Some(5000));
        assert_eq!(config.max_in_flight, 4);
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_log_config_defaults() {
        let (_dir, path) = extract();
        let cli = Cli::try_parse_from(["lms-load", path.as_str()]).unwrap();

        let config = cli.log_config(env(&[])).unwrap();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.log_dir, PathBuf::from(DEFAULT_RESULTS_DIR));
        assert!(config.log_file_name.starts_with("load_dynamodb_lms_"));
    }

    #[test]
    fn test_log_env_applies_without_flags() {
        let (_dir, path) = extract();
        let cli = Cli::try_parse_from(["lms-load", path.as_str()]).unwrap();

        let config = cli
            .log_config(env(&[("LOG_LEVEL", "warn"), ("LOG_DIR", "/var/log/lms"), ("LOG_OUTPUT", "file")]))
            .unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/lms"));
    }

    #[test]
    fn test_flags_win_over_log_env() {
        let (_dir, path) = extract();
        let cli = Cli::try_parse_from([
            "lms-load",
            "-D",
            "--no-results-file",
            "--results-dir",
            "out",
            path.as_str(),
        ])
        .unwrap();

        let config = cli
            .log_config(env(&[("LOG_LEVEL", "info"), ("LOG_DIR", "/var/log/lms"), ("LOG_OUTPUT", "both")]))
            .unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.output, LogOutput::Console);
        assert_eq!(config.log_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_results_file_name() {
        let started = Local.with_ymd_and_hms(2024, 3, 15, 9, 5, 0).unwrap();
        assert_eq!(results_file_name(started), "load_dynamodb_lms_202403150905.txt");
    }

    #[test]
    fn test_rejects_bad_paths() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("assignments.txt");
        std::fs::write(&text, "Username\n").unwrap();

        assert!(Cli::try_parse_from(["lms-load", text.to_str().unwrap()]).is_err());
        assert!(Cli::try_parse_from(["lms-load", "/nonexistent/assignments.csv"]).is_err());
        assert!(Cli::try_parse_from(["lms-load"]).is_err());
    }

    #[test]
    fn test_zero_in_flight_fails_validation() {
        let (_dir, path) = extract();
        let cli = Cli::try_parse_from(["lms-load", "--max-in-flight", "0", path.as_str()]).unwrap();
        assert!(cli.ingest_config().validate().is_err());
        assert!(Cli::try_parse_from(["lms-load", "--max-in-flight", "many", path.as_str()]).is_err());
    }
}
