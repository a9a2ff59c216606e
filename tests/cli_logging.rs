// tests/cli_logging.rs

use clap::Parser;
use tracing::level_filters::LevelFilter;

use taskvisor::cli::{CliArgs, LogLevel};
use taskvisor::logging::build_filter;

#[test]
fn test_cli_defaults() {
    let args = CliArgs::try_parse_from(["taskvisor"]).unwrap();
    assert_eq!(args.plan, "Taskvisor.toml");
    assert!(!args.revert);
    assert!(!args.dry_run);
    assert!(args.log_level.is_none());
}

#[test]
fn test_cli_flags() {
    let args = CliArgs::try_parse_from([
        "taskvisor",
        "--plan",
        "deploy.toml",
        "--revert",
        "--dry-run",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(args.plan, "deploy.toml");
    assert!(args.revert);
    assert!(args.dry_run);
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
}

#[test]
fn test_cli_rejects_unknown_level() {
    assert!(CliArgs::try_parse_from(["taskvisor", "--log-level", "loud"]).is_err());
}

#[test]
fn test_filter_prefers_cli_level() {
    let filter = build_filter(Some(LogLevel::Error), Some("trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
}

#[test]
fn test_filter_accepts_env_directives() {
    let filter = build_filter(None, Some("taskvisor=trace,warn"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
}

#[test]
fn test_filter_falls_back_to_info() {
    for env in [None, Some(""), Some("taskvisor=loud")] {
        let filter = build_filter(None, env);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
