//! 탐지 규칙 데이터 타입
//!
//! 규칙 구조체와 내장 규칙 세트를 정의합니다.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use vigil_core::types::{ThreatLevel, ThreatType};

use crate::error::MonitorError;

// --- 내장 규칙 ID 상수 ---

/// 로그인 무차별 대입 규칙 ID
pub const RULE_BRUTE_FORCE_LOGIN: &str = "brute_force_login";
/// SQL 인젝션 규칙 ID
pub const RULE_SQL_INJECTION: &str = "sql_injection";
/// 커맨드 인젝션 규칙 ID
pub const RULE_COMMAND_INJECTION: &str = "command_injection";
/// 악성 명령 키워드 규칙 ID
pub const RULE_MALICIOUS_COMMAND: &str = "malicious_command";
/// 요청 속도 제한 규칙 ID
pub const RULE_RATE_LIMIT: &str = "rate_limit";
/// 의심 패턴 규칙 ID
pub const RULE_SUSPICIOUS_PATTERN: &str = "suspicious_pattern";

/// 탐지 규칙
///
/// 하나의 패턴 + 임계값 + 시간 윈도우 + 심각도 조합입니다.
/// `enabled`를 제외한 모든 필드는 생성 이후 불변입니다.
/// 규칙은 제거되지 않고 비활성화만 가능합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// 규칙 고유 ID (저장소 내에서 유일해야 함)
    pub id: String,
    /// 규칙 이름 (알림 설명에 표시)
    pub name: String,
    /// 위협 분류
    pub threat_type: ThreatType,
    /// 매칭 패턴 (대소문자 무시 정규식, 부분 검색)
    pub pattern: String,
    /// 발화 임계값 — 1이면 첫 매칭에서 즉시 발화
    pub threshold: u32,
    /// 시간 윈도우 (초)
    pub window_secs: u64,
    /// 심각도
    pub threat_level: ThreatLevel,
    /// 활성화 여부
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// 시간 윈도우를 `Duration`으로 반환합니다.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// 규칙의 유효성을 검증합니다.
    ///
    /// 정규식 컴파일 검증은 [`PatternMatcher`](crate::rule::PatternMatcher)의
    /// `compile_rule`에서 수행됩니다.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.id.is_empty() {
            return Err(MonitorError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > 256 {
            return Err(MonitorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule id must not exceed 256 characters".to_owned(),
            });
        }

        if self.name.is_empty() {
            return Err(MonitorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule name must not be empty".to_owned(),
            });
        }

        if self.pattern.is_empty() {
            return Err(MonitorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule pattern must not be empty".to_owned(),
            });
        }

        if self.threshold == 0 {
            return Err(MonitorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule threshold must be greater than 0".to_owned(),
            });
        }

        if self.window_secs == 0 {
            return Err(MonitorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule window must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 내장 탐지 규칙 세트를 생성합니다.
///
/// 모니터 생성 시 삽입 순서대로 시딩되며, 평가도 이 순서를 따릅니다.
/// 속도 제한 규칙은 내용 기반 평가 루프에서 제외되고,
/// 전용 속도 제한기가 `(threshold, window)` 값을 참조합니다.
pub fn builtin_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: RULE_BRUTE_FORCE_LOGIN.to_owned(),
            name: "Brute Force Login Attempt".to_owned(),
            threat_type: ThreatType::BruteForce,
            pattern: r"failed (login|password)|authentication fail(ed|ure)|invalid (password|credentials)|login attempt failed".to_owned(),
            threshold: 5,
            window_secs: 600,
            threat_level: ThreatLevel::High,
            enabled: true,
        },
        Rule {
            id: RULE_SQL_INJECTION.to_owned(),
            name: "SQL Injection Attempt".to_owned(),
            threat_type: ThreatType::InjectionAttempt,
            pattern: r"union\s+select|drop\s+table|insert\s+into|delete\s+from|'\s*or\s+'?1'?\s*=\s*'?1|;\s*--|xp_cmdshell".to_owned(),
            threshold: 1,
            window_secs: 60,
            threat_level: ThreatLevel::Critical,
            enabled: true,
        },
        Rule {
            id: RULE_COMMAND_INJECTION.to_owned(),
            name: "Command Injection Attempt".to_owned(),
            threat_type: ThreatType::InjectionAttempt,
            pattern: r";\s*(rm|cat|wget|curl|nc|bash|sh)\b|\|\s*(nc|bash|sh)\b|\$\([^)]*\)|`[^`]*`|&&\s*(rm|wget|curl)\b".to_owned(),
            threshold: 1,
            window_secs: 60,
            threat_level: ThreatLevel::Critical,
            enabled: true,
        },
        Rule {
            id: RULE_MALICIOUS_COMMAND.to_owned(),
            name: "Malicious Command Keyword".to_owned(),
            threat_type: ThreatType::MaliciousCommand,
            pattern: r"rm\s+-rf\s+/|mkfs\.|dd\s+if=/dev/(zero|random)|:\(\)\s*\{\s*:\|:&\s*\};:|chmod\s+777\s+/|shutdown\s+-h".to_owned(),
            threshold: 1,
            window_secs: 60,
            threat_level: ThreatLevel::High,
            enabled: true,
        },
        Rule {
            id: RULE_RATE_LIMIT.to_owned(),
            name: "Request Rate Limit".to_owned(),
            threat_type: ThreatType::RateLimitExceeded,
            pattern: r".*".to_owned(),
            threshold: 100,
            window_secs: 60,
            threat_level: ThreatLevel::Medium,
            enabled: true,
        },
        Rule {
            id: RULE_SUSPICIOUS_PATTERN.to_owned(),
            name: "Suspicious Pattern".to_owned(),
            threat_type: ThreatType::SuspiciousPattern,
            pattern: r"\.\./\.\.|/etc/(passwd|shadow)|base64\s+(-d|--decode)|eval\s*\(|exec\s*\(|<script".to_owned(),
            threshold: 1,
            window_secs: 300,
            threat_level: ThreatLevel::High,
            enabled: true,
        },
    ]
}
