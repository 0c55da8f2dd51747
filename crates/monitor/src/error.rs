//! 보안 이벤트 모니터 에러 타입
//!
//! [`MonitorError`]는 모니터 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<MonitorError> for VigilError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use vigil_core::error::{ConfigError, DetectionError, VigilError};

/// 보안 이벤트 모니터 도메인 에러
///
/// 규칙 유효성 검증, 패턴 매칭, 생명주기, 설정 등
/// 모니터 내부의 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 이미 존재하는 규칙 ID로 추가 시도
    #[error("duplicate rule id: '{rule_id}'")]
    DuplicateRule {
        /// 중복된 규칙 ID
        rule_id: String,
    },

    /// 규칙 매칭 중 에러 (미컴파일 패턴 등)
    #[error("rule match error: {0}")]
    RuleMatch(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 모니터가 이미 실행 중
    #[error("monitor is already running")]
    AlreadyRunning,

    /// 모니터가 실행 중이 아님
    #[error("monitor is not running")]
    NotRunning,

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<MonitorError> for VigilError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Config { field, reason } => {
                VigilError::Config(ConfigError::InvalidValue { field, reason })
            }
            MonitorError::AlreadyRunning | MonitorError::NotRunning => {
                VigilError::Detection(DetectionError::Lifecycle(err.to_string()))
            }
            MonitorError::RuleMatch(_) => {
                VigilError::Detection(DetectionError::Evaluation(err.to_string()))
            }
            _ => VigilError::Detection(DetectionError::Rule(err.to_string())),
        }
    }
}
