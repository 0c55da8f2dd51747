//! 보고서 생성 -- 통계 스냅샷과 기간별 위협 보고서
//!
//! 알림 저장소의 내용을 집계하여 운영자용 스냅샷을 만듭니다.
//! 권장 조치는 단순 임계값 기반의 결정적 문자열입니다 (ML 없음).

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime};

use serde::Serialize;

use vigil_core::types::{ThreatLevel, ThreatType};

use crate::store::AlertStore;

/// 현재 모니터 상태 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// 백그라운드 스위퍼 실행 여부
    pub monitoring_active: bool,
    /// 수집된 전체 이벤트 수
    pub total_events: u64,
    /// 탐지된 전체 위협 수
    pub total_threats: u64,
    /// 최근 24시간 동안 탐지된 위협 수
    pub threats_last_24h: u64,
    /// 미해결 알림 수
    pub unresolved_count: u64,
    /// 심각도별 알림 수 (모든 레벨 포함, 0이어도 키 존재)
    pub counts_by_level: BTreeMap<String, u64>,
    /// 위협 분류별 알림 수 (모든 분류 포함, 0이어도 키 존재)
    pub counts_by_type: BTreeMap<String, u64>,
    /// 활성 규칙 수
    pub active_rule_count: usize,
}

/// 기간별 보고서 요약
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// 보고 기간 (시간)
    pub period_hours: u32,
    /// 기간 내 전체 알림 수
    pub total_alerts: u64,
    /// 기간 내 치명적 알림 수
    pub critical_alerts: u64,
    /// 기간 내 미해결 알림 수
    pub unresolved_alerts: u64,
}

/// 출처별 알림 수
#[derive(Debug, Clone, Serialize)]
pub struct SourceCount {
    /// 이벤트 출처
    pub source: String,
    /// 알림 수
    pub count: u64,
}

/// 기간별 위협 보고서
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    /// 요약
    pub summary: ReportSummary,
    /// 위협 분류별 알림 수
    pub threat_breakdown: BTreeMap<String, u64>,
    /// 알림 수 기준 상위 10개 출처
    pub top_sources: Vec<SourceCount>,
    /// 권장 조치 목록
    pub recommendations: Vec<String>,
}

/// 현재 상태 스냅샷을 생성합니다.
pub(crate) fn build_stats(
    monitoring_active: bool,
    total_events: u64,
    total_threats: u64,
    active_rule_count: usize,
    alerts: &AlertStore,
    now: SystemTime,
) -> StatsSnapshot {
    // 모든 레벨/분류 키를 0으로 시딩하여 집계 누락을 방지
    let mut counts_by_level: BTreeMap<String, u64> = ThreatLevel::ALL
        .iter()
        .map(|level| (level.as_str().to_owned(), 0))
        .collect();
    let mut counts_by_type: BTreeMap<String, u64> = ThreatType::ALL
        .iter()
        .map(|threat_type| (threat_type.as_str().to_owned(), 0))
        .collect();

    let day_ago = now.checked_sub(Duration::from_secs(24 * 3600));
    let mut threats_last_24h = 0;

    for alert in alerts.iter() {
        *counts_by_level
            .entry(alert.threat_level.as_str().to_owned())
            .or_insert(0) += 1;
        *counts_by_type
            .entry(alert.threat_type.as_str().to_owned())
            .or_insert(0) += 1;

        if day_ago.is_none_or(|cutoff| alert.timestamp >= cutoff) {
            threats_last_24h += 1;
        }
    }

    StatsSnapshot {
        monitoring_active,
        total_events,
        total_threats,
        threats_last_24h,
        unresolved_count: alerts.unresolved_count(),
        counts_by_level,
        counts_by_type,
        active_rule_count,
    }
}

/// 최근 `hours`시간에 대한 위협 보고서를 생성합니다.
pub(crate) fn build_report(alerts: &AlertStore, hours: u32, now: SystemTime) -> ReportSnapshot {
    let cutoff = now.checked_sub(Duration::from_secs(u64::from(hours) * 3600));
    let in_period: Vec<_> = alerts
        .iter()
        .filter(|alert| cutoff.is_none_or(|cutoff| alert.timestamp >= cutoff))
        .collect();

    let mut threat_breakdown: BTreeMap<String, u64> = BTreeMap::new();
    let mut source_counts: HashMap<&str, u64> = HashMap::new();
    let mut critical_alerts = 0;
    let mut critical_unresolved = 0;
    let mut unresolved_alerts = 0;

    for alert in &in_period {
        *threat_breakdown
            .entry(alert.threat_type.as_str().to_owned())
            .or_insert(0) += 1;
        *source_counts.entry(alert.source.as_str()).or_insert(0) += 1;

        // 닫힌 enum이므로 누락 없이 심각도를 분기
        match alert.threat_level {
            ThreatLevel::Critical => {
                critical_alerts += 1;
                if !alert.resolved {
                    critical_unresolved += 1;
                }
            }
            ThreatLevel::Low | ThreatLevel::Medium | ThreatLevel::High => {}
        }
        if !alert.resolved {
            unresolved_alerts += 1;
        }
    }

    let mut top_sources: Vec<SourceCount> = source_counts
        .into_iter()
        .map(|(source, count)| SourceCount {
            source: source.to_owned(),
            count,
        })
        .collect();
    // 결정적 순서: 수 내림차순, 동률이면 이름 오름차순
    top_sources.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));
    top_sources.truncate(10);

    let recommendations = build_recommendations(
        critical_unresolved,
        unresolved_alerts,
        threat_breakdown.len(),
    );

    ReportSnapshot {
        summary: ReportSummary {
            period_hours: hours,
            total_alerts: in_period.len() as u64,
            critical_alerts,
            unresolved_alerts,
        },
        threat_breakdown,
        top_sources,
        recommendations,
    }
}

/// 임계값 기반 권장 조치를 생성합니다.
fn build_recommendations(
    critical_unresolved: u64,
    unresolved: u64,
    distinct_types: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if critical_unresolved >= 1 {
        recommendations.push(format!(
            "Escalate: {critical_unresolved} unresolved critical alert(s) require immediate attention"
        ));
    }
    if unresolved > 10 {
        recommendations.push(format!(
            "Review alert backlog: {unresolved} alerts are unresolved"
        ));
    }
    if distinct_types >= 3 {
        recommendations.push(format!(
            "Multiple threat categories active ({distinct_types}); consider a security audit"
        ));
    }
    if recommendations.is_empty() {
        recommendations.push("No immediate action required".to_owned());
    }

    recommendations
}
