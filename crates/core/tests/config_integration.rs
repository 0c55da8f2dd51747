//! vigil.toml 통합 설정 테스트
//!
//! - vigil.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use serial_test::serial;

use vigil_core::config::VigilConfig;
use vigil_core::error::{ConfigError, VigilError};

// =============================================================================
// vigil.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../vigil.toml.example");
    let config = VigilConfig::parse(content).expect("example config should parse");

    // general 기본값 확인
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../vigil.toml.example");
    let config = VigilConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_correct_monitor_defaults() {
    let content = include_str!("../../../vigil.toml.example");
    let config = VigilConfig::parse(content).expect("should parse");

    assert!(config.monitor.enabled);
    assert_eq!(config.monitor.history_capacity, 10_000);
    assert_eq!(config.monitor.alert_capacity, 50_000);
    assert_eq!(config.monitor.sweep_interval_secs, 10);
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let config = VigilConfig::parse("[general]\nlog_level = \"trace\"").expect("should parse");
    assert_eq!(config.general.log_level, "trace");
    // monitor 섹션은 기본값
    assert!(config.monitor.enabled);
    assert_eq!(config.monitor.history_capacity, 10_000);
}

#[test]
fn partial_config_monitor_only() {
    let config = VigilConfig::parse("[monitor]\nenabled = false").expect("should parse");
    assert!(!config.monitor.enabled);
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn unknown_section_is_rejected_or_ignored() {
    // toml crate는 알 수 없는 필드를 기본적으로 무시합니다.
    let config = VigilConfig::parse("[unknown]\nfoo = 1").expect("should parse");
    assert_eq!(config.general.log_level, "info");
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial]
fn env_override_takes_precedence_over_file_value() {
    let toml = "[monitor]\nhistory_capacity = 5000";
    let mut config = VigilConfig::parse(toml).expect("should parse");
    assert_eq!(config.monitor.history_capacity, 5000);

    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe { std::env::set_var("VIGIL_MONITOR_HISTORY_CAPACITY", "7777") };
    config.apply_env_overrides();
    unsafe { std::env::remove_var("VIGIL_MONITOR_HISTORY_CAPACITY") };

    assert_eq!(config.monitor.history_capacity, 7777);
}

#[test]
#[serial]
fn env_override_log_level() {
    let mut config = VigilConfig::default();

    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe { std::env::set_var("VIGIL_GENERAL_LOG_LEVEL", "debug") };
    config.apply_env_overrides();
    unsafe { std::env::remove_var("VIGIL_GENERAL_LOG_LEVEL") };

    assert_eq!(config.general.log_level, "debug");
    config.validate().expect("debug is a valid level");
}

// =============================================================================
// 에러 케이스 테스트
// =============================================================================

#[test]
fn empty_config_uses_all_defaults() {
    let config = VigilConfig::parse("").expect("empty config should parse");
    config.validate().expect("defaults should validate");
}

#[test]
fn malformed_toml_returns_parse_error() {
    let result = VigilConfig::parse("[general\nlog_level = ");
    assert!(matches!(
        result.unwrap_err(),
        VigilError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn wrong_type_returns_parse_error() {
    let result = VigilConfig::parse("[monitor]\nhistory_capacity = \"lots\"");
    assert!(matches!(
        result.unwrap_err(),
        VigilError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[tokio::test]
async fn load_applies_overrides_from_temp_file() {
    use std::io::Write as _;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[monitor]\nalert_capacity = 123").expect("write");

    let config = VigilConfig::load(file.path()).await.expect("should load");
    assert_eq!(config.monitor.alert_capacity, 123);
}
