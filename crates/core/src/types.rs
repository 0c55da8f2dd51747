//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.
//! 수집된 원시 이벤트([`RawEvent`])와 탐지 결과 알림([`Alert`])이 중심입니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 위협 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    /// 낮은 심각도
    #[default]
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl ThreatLevel {
    /// 모든 레벨 (보고서 집계에서 빠짐없이 순회하기 위한 상수)
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 집계 키로 사용하는 소문자 식별자를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 위협 분류
///
/// 탐지 규칙이 어떤 종류의 위협을 찾는지 나타냅니다.
/// 문자열 기반 open enum이 아니라 닫힌 enum이므로
/// 집계/가중치 코드에서 누락 없이 match할 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    /// 반복된 로그인 실패 (brute force)
    BruteForce,
    /// SQL/커맨드 인젝션 시도
    InjectionAttempt,
    /// 악성 명령 키워드
    MaliciousCommand,
    /// 요청 속도 제한 초과
    RateLimitExceeded,
    /// 의심스러운 패턴 (경로 순회, 스크립트 삽입 등)
    SuspiciousPattern,
}

impl ThreatType {
    /// 모든 분류 (보고서 집계용)
    pub const ALL: [Self; 5] = [
        Self::BruteForce,
        Self::InjectionAttempt,
        Self::MaliciousCommand,
        Self::RateLimitExceeded,
        Self::SuspiciousPattern,
    ];

    /// 집계 키로 사용하는 snake_case 식별자를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BruteForce => "brute_force",
            Self::InjectionAttempt => "injection_attempt",
            Self::MaliciousCommand => "malicious_command",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::SuspiciousPattern => "suspicious_pattern",
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 수집된 원시 이벤트
///
/// 모든 `ingest` 호출마다 하나씩 생성되며, 생성 이후 변경되지 않습니다.
/// 이벤트 히스토리 버퍼에 보관되어 윈도우 카운팅 질의에 사용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// 수집 시각
    pub timestamp: SystemTime,
    /// 이벤트 출처 (예: "api_request", "voice_command")
    pub source: String,
    /// 이벤트 본문 (명령, API 호출, 로그 라인 등)
    pub payload: String,
    /// 연관 사용자 (익명일 수 있음)
    pub user_id: Option<String>,
    /// 호출자가 첨부한 추가 정보
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl RawEvent {
    /// 새 원시 이벤트를 생성합니다.
    pub fn new(
        source: impl Into<String>,
        payload: impl Into<String>,
        user_id: Option<&str>,
        details: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source: source.into(),
            payload: payload.into(),
            user_id: user_id.map(str::to_owned),
            details,
        }
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] user={} payload={}",
            self.source,
            self.user_id.as_deref().unwrap_or("anonymous"),
            self.payload,
        )
    }
}

/// 보안 알림
///
/// 규칙 또는 속도 제한기가 발화했을 때에만 생성됩니다.
/// `resolved` 및 해결 메타데이터만 가변이며, `resolve`로 한 번 설정됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 고유 ID (UUID v4)
    pub id: String,
    /// 위협 분류
    pub threat_type: ThreatType,
    /// 심각도
    pub threat_level: ThreatLevel,
    /// 이벤트 출처
    pub source: String,
    /// 사람이 읽을 수 있는 설명 (발화한 규칙 이름 포함)
    pub description: String,
    /// 상세 정보 (규칙 ID, 패턴, 원본 payload 등)
    pub details: serde_json::Map<String, serde_json::Value>,
    /// 생성 시각
    pub timestamp: SystemTime,
    /// 연관 사용자
    pub user_id: Option<String>,
    /// 처리 완료 여부
    pub resolved: bool,
    /// 해결 메모 (resolve 시 설정)
    pub resolution_notes: Option<String>,
    /// 해결 시각 (resolve 시 설정)
    pub resolved_at: Option<SystemTime>,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} from {}: {}",
            self.threat_level, self.threat_type, self.source, self.description,
        )
    }
}
