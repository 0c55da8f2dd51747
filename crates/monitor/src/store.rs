//! 알림 저장소 -- 생성된 알림의 보관, 조회, 해결
//!
//! [`AlertStore`]는 탐지된 알림을 삽입 순서대로 보관합니다.
//! 장기 실행 프로세스에서 무한히 성장하지 않도록 용량 상한을 가지며,
//! 초과 시 가장 오래된 알림부터 제거합니다.

use std::collections::VecDeque;
use std::time::SystemTime;

use vigil_core::types::{Alert, ThreatLevel};

/// 기본 알림 저장소 용량
pub const DEFAULT_ALERT_CAPACITY: usize = 50_000;

/// 용량 제한이 있는 알림 저장소
pub struct AlertStore {
    /// 알림 목록 (삽입 순서 = 시간 순서)
    alerts: VecDeque<Alert>,
    /// 최대 용량
    capacity: usize,
    /// 용량 초과로 드롭된 알림 수
    dropped_count: u64,
}

impl AlertStore {
    /// 새 알림 저장소를 생성합니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(capacity.min(DEFAULT_ALERT_CAPACITY)),
            capacity,
            dropped_count: 0,
        }
    }

    /// 알림을 저장소에 추가합니다.
    ///
    /// 용량이 가득 찬 경우 가장 오래된 알림을 제거합니다.
    /// 드롭이 발생하면 `true`를 반환합니다.
    pub fn append(&mut self, alert: Alert) -> bool {
        let mut dropped = false;
        if self.alerts.len() >= self.capacity {
            self.alerts.pop_front();
            self.dropped_count += 1;
            dropped = true;
            tracing::warn!(
                dropped = self.dropped_count,
                capacity = self.capacity,
                "alert store full, dropped oldest alert"
            );
        }
        self.alerts.push_back(alert);
        dropped
    }

    /// 알림을 최신순으로 조회합니다.
    ///
    /// `level_filter`/`resolved_filter`가 지정되면 해당 조건으로 거릅니다.
    pub fn query(
        &self,
        limit: usize,
        level_filter: Option<ThreatLevel>,
        resolved_filter: Option<bool>,
    ) -> Vec<Alert> {
        self.alerts
            .iter()
            .rev()
            .filter(|alert| level_filter.is_none_or(|level| alert.threat_level == level))
            .filter(|alert| resolved_filter.is_none_or(|resolved| alert.resolved == resolved))
            .take(limit)
            .cloned()
            .collect()
    }

    /// 알림을 해결 처리합니다.
    ///
    /// 알 수 없는 ID면 `false`를 반환합니다.
    /// 이미 해결된 알림에 다시 호출해도 `true`를 반환하며,
    /// 최초 해결 시각과 메모는 유지됩니다.
    pub fn resolve(&mut self, alert_id: &str, notes: &str) -> bool {
        let Some(alert) = self.alerts.iter_mut().find(|a| a.id == alert_id) else {
            return false;
        };

        if !alert.resolved {
            alert.resolved = true;
            alert.resolution_notes = Some(notes.to_owned());
            alert.resolved_at = Some(SystemTime::now());
            tracing::info!(alert_id, "alert resolved");
        }
        true
    }

    /// ID로 알림을 조회합니다.
    pub fn get(&self, alert_id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == alert_id)
    }

    /// 보관 중인 알림을 과거순으로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    /// 현재 보관 중인 알림 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// 저장소가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// 최대 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 용량 초과로 드롭된 알림 수를 반환합니다.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// 미해결 알림 수를 반환합니다.
    pub fn unresolved_count(&self) -> u64 {
        self.alerts.iter().filter(|a| !a.resolved).count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::ThreatType;

    fn make_alert(id: &str, level: ThreatLevel) -> Alert {
        Alert {
            id: id.to_owned(),
            threat_type: ThreatType::SuspiciousPattern,
            threat_level: level,
            source: "test".to_owned(),
            description: format!("alert {id}"),
            details: Default::default(),
            timestamp: SystemTime::now(),
            user_id: None,
            resolved: false,
            resolution_notes: None,
            resolved_at: None,
        }
    }

    #[test]
    fn append_and_query_newest_first() {
        let mut store = AlertStore::new(100);
        store.append(make_alert("a", ThreatLevel::Low));
        store.append(make_alert("b", ThreatLevel::High));
        store.append(make_alert("c", ThreatLevel::Low));

        let all = store.query(10, None, None);
        let ids: Vec<&str> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn query_respects_limit() {
        let mut store = AlertStore::new(100);
        for i in 0..10 {
            store.append(make_alert(&format!("a{i}"), ThreatLevel::Low));
        }
        assert_eq!(store.query(3, None, None).len(), 3);
    }

    #[test]
    fn query_filters_by_level() {
        let mut store = AlertStore::new(100);
        store.append(make_alert("low", ThreatLevel::Low));
        store.append(make_alert("crit", ThreatLevel::Critical));

        let criticals = store.query(10, Some(ThreatLevel::Critical), None);
        assert_eq!(criticals.len(), 1);
        assert_eq!(criticals[0].id, "crit");
    }

    #[test]
    fn query_filters_by_resolved() {
        let mut store = AlertStore::new(100);
        store.append(make_alert("a", ThreatLevel::Low));
        store.append(make_alert("b", ThreatLevel::Low));
        store.resolve("a", "done");

        let unresolved = store.query(10, None, Some(false));
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].id, "b");

        let resolved = store.query(10, None, Some(true));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "a");
    }

    #[test]
    fn resolve_sets_metadata_once() {
        let mut store = AlertStore::new(100);
        store.append(make_alert("a", ThreatLevel::High));

        assert!(store.resolve("a", "first notes"));
        let first_resolved_at = store.get("a").unwrap().resolved_at;
        assert!(first_resolved_at.is_some());
        assert_eq!(
            store.get("a").unwrap().resolution_notes.as_deref(),
            Some("first notes")
        );

        // 두 번째 호출도 true를 반환하지만 메타데이터는 유지
        assert!(store.resolve("a", "second notes"));
        assert_eq!(
            store.get("a").unwrap().resolution_notes.as_deref(),
            Some("first notes")
        );
        assert_eq!(store.get("a").unwrap().resolved_at, first_resolved_at);
    }

    #[test]
    fn resolve_unknown_returns_false() {
        let mut store = AlertStore::new(100);
        assert!(!store.resolve("missing", "notes"));
    }

    #[test]
    fn unresolved_count_tracks_resolution() {
        let mut store = AlertStore::new(100);
        store.append(make_alert("a", ThreatLevel::Low));
        store.append(make_alert("b", ThreatLevel::Low));
        assert_eq!(store.unresolved_count(), 2);

        store.resolve("a", "done");
        assert_eq!(store.unresolved_count(), 1);
    }

    #[test]
    fn capacity_evicts_oldest_alert() {
        let mut store = AlertStore::new(2);
        store.append(make_alert("a", ThreatLevel::Low));
        store.append(make_alert("b", ThreatLevel::Low));
        let dropped = store.append(make_alert("c", ThreatLevel::Low));

        assert!(dropped);
        assert_eq!(store.len(), 2);
        assert_eq!(store.dropped_count(), 1);
        assert!(store.get("a").is_none());
        assert!(store.get("c").is_some());
    }

    #[test]
    fn empty_store_queries() {
        let store = AlertStore::new(10);
        assert!(store.is_empty());
        assert!(store.query(10, None, None).is_empty());
        assert_eq!(store.unresolved_count(), 0);
    }
}
