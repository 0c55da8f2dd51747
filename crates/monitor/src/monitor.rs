//! 모니터 오케스트레이션 -- 수집/분류/기록의 전체 흐름을 관리합니다.
//!
//! [`SecurityMonitor`]는 이 크레이트의 진입점입니다. 하나의 수신 이벤트에 대해:
//!
//! 1. 원시 이벤트를 히스토리에 기록하고 전체 카운터를 증가시킵니다 (항상).
//! 2. 속도 제한을 검사합니다. 발화하면 규칙 평가를 건너뜁니다.
//! 3. 활성 규칙을 삽입 순서대로 평가합니다. 패턴이 매칭되고 임계값
//!    조건까지 만족한 첫 번째 규칙이 이깁니다.
//! 4. 발화 시 알림을 생성하여 저장소에 기록하고 디스패처로 전달합니다.
//!
//! 이벤트당 알림은 최대 1건입니다. 개별 규칙의 평가 에러는 기록 후
//! 해당 규칙만 건너뛰며, 수집 자체를 중단시키지 않습니다.
//!
//! # 동시성
//! 모든 공유 상태는 하나의 `std::sync::Mutex` 뒤에 있으며, 어떤 연산도
//! 잠금을 쥔 채 suspend하지 않습니다. `ingest`/`resolve`/`stats`/`report`는
//! 모두 CPU 바운드 동기 호출이고, 여러 스레드에서 동시에 호출해도 안전합니다.
//! 백그라운드 스위퍼는 `start`/`stop` 생명주기로 관리되는 tokio 태스크입니다.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vigil_core::event::AlertEvent;
use vigil_core::metrics as m;
use vigil_core::types::{Alert, RawEvent, ThreatLevel, ThreatType};

use crate::config::MonitorConfig;
use crate::dispatch::{AlertCallback, AlertDispatcher, CallbackError};
use crate::error::MonitorError;
use crate::history::EventHistory;
use crate::report::{self, ReportSnapshot, StatsSnapshot};
use crate::rule::{PatternMatcher, Rule, RuleStore, builtin_rules};
use crate::store::AlertStore;
use crate::window::{RateLimiter, rate_key, rule_threshold_met};

/// 모니터 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    /// 초기화됨, 스위퍼 미시작
    Initialized,
    /// 스위퍼 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 뮤텍스로 보호되는 모니터 내부 상태
struct MonitorInner {
    /// 탐지 규칙 저장소
    rules: RuleStore,
    /// 컴파일된 패턴 매처
    matcher: PatternMatcher,
    /// 원시 이벤트 히스토리
    history: EventHistory,
    /// 속도 제한기
    limiter: RateLimiter,
    /// 알림 저장소
    alerts: AlertStore,
    /// 수집된 전체 이벤트 수
    total_events: u64,
    /// 탐지된 전체 위협 수
    total_threats: u64,
    /// 속도 제한 발화 수
    rate_limited: u64,
    /// 규칙 평가 에러 수
    eval_errors: u64,
    /// 실행 상태
    state: MonitorState,
}

/// 실행 중인 스위퍼 태스크 핸들
struct SweeperHandle {
    /// 정지 신호 토큰
    cancel: CancellationToken,
    /// 태스크 핸들
    task: JoinHandle<()>,
}

/// 보안 이벤트 모니터
///
/// 명시적으로 생성하여 호출자에게 전달하는 컴포넌트입니다.
/// 전역 싱글톤이 아니며, `Clone`으로 핸들을 복제하여 여러 호출자가
/// 공유할 수 있습니다.
///
/// # 사용 예시
/// ```ignore
/// use vigil_monitor::{SecurityMonitor, SecurityMonitorBuilder};
///
/// let monitor = SecurityMonitorBuilder::new()
///     .alert_callback(|event| {
///         println!("alert: {}", event.alert);
///         Ok(())
///     })
///     .build()?;
///
/// monitor.start().await?;
/// let alert = monitor.ingest("api_request", "'; DROP TABLE users; --", None, Default::default())?;
/// assert!(alert.is_some());
/// monitor.stop().await?;
/// ```
#[derive(Clone)]
pub struct SecurityMonitor {
    /// 모니터 설정
    config: MonitorConfig,
    /// 공유 내부 상태
    inner: Arc<Mutex<MonitorInner>>,
    /// 알림 디스패처 (잠금 밖에서 호출)
    dispatcher: Arc<AlertDispatcher>,
    /// 스위퍼 태스크 핸들
    sweeper: Arc<Mutex<Option<SweeperHandle>>>,
}

impl SecurityMonitor {
    /// 내부 상태 잠금을 획득합니다.
    ///
    /// 잠금을 쥔 스레드가 패닉해도 상태 불변식은 유지되므로
    /// poisoning은 복구 가능한 것으로 취급합니다.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, MonitorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 이벤트 하나를 수집하고 분류합니다.
    ///
    /// 분류 결과 알림이 생성되면 `Ok(Some(alert))`, 위협이 없으면
    /// `Ok(None)`을 반환합니다. 개별 규칙의 평가 에러는 해당 규칙만
    /// 건너뛰고 카운터에 기록되며, `Err`는 수집 자체가 불가능한
    /// 경우에만 반환됩니다 — "위협 없음"과 "평가 실패"를 구분합니다.
    pub fn ingest(
        &self,
        source: &str,
        payload: &str,
        user_id: Option<&str>,
        details: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<Alert>, MonitorError> {
        if !self.config.enabled {
            tracing::trace!(source, "monitor disabled, ignoring event");
            return Ok(None);
        }

        let now = SystemTime::now();
        let event = RawEvent {
            timestamp: now,
            source: source.to_owned(),
            payload: payload.to_owned(),
            user_id: user_id.map(str::to_owned),
            details: details.clone(),
        };

        let mut guard = self.lock_inner();
        let inner = &mut *guard;

        // 1. 결과와 무관하게 히스토리 기록 + 전체 카운터 증가
        inner.history.append(event);
        inner.total_events += 1;
        metrics::counter!(m::MONITOR_EVENTS_INGESTED_TOTAL).increment(1);
        metrics::gauge!(m::MONITOR_EVENT_HISTORY_SIZE).set(inner.history.len() as f64);

        // 2. 속도 제한 검사 — 내용과 무관하게 모든 이벤트에 적용
        let mut fired: Option<Alert> = None;
        if let Some(rate_rule) = inner.rules.rate_rule().cloned() {
            let key = rate_key(source, user_id);
            if let Some(observed) =
                inner
                    .limiter
                    .check(&key, now, rate_rule.window(), rate_rule.threshold)
            {
                inner.rate_limited += 1;
                metrics::counter!(m::MONITOR_RATE_LIMITED_TOTAL).increment(1);
                fired = Some(build_rate_alert(
                    &rate_rule, &key, source, payload, user_id, observed, &details, now,
                ));
            }
        }

        // 3. 속도 제한이 발화하지 않은 경우에만 규칙 평가 (first match wins)
        if fired.is_none() {
            let mut matched: Option<(Rule, Option<u64>)> = None;

            for rule in inner.rules.enabled() {
                // 속도 제한 규칙은 전용 제한기가 담당
                if rule.threat_type == ThreatType::RateLimitExceeded {
                    continue;
                }

                let is_match = match inner.matcher.matches(rule, payload) {
                    Ok(matched) => matched,
                    Err(error) => {
                        inner.eval_errors += 1;
                        metrics::counter!(m::MONITOR_RULE_EVAL_ERRORS_TOTAL).increment(1);
                        tracing::warn!(
                            rule_id = %rule.id,
                            error = %error,
                            "rule evaluation failed, skipping rule"
                        );
                        continue;
                    }
                };

                if !is_match {
                    continue;
                }

                // threshold 1은 윈도우 스캔 없이 즉시 발화
                if rule.threshold <= 1 {
                    matched = Some((rule.clone(), None));
                    break;
                }

                if let Some(count) = rule_threshold_met(
                    &inner.history,
                    &inner.matcher,
                    rule,
                    source,
                    user_id,
                    now,
                ) {
                    matched = Some((rule.clone(), Some(count)));
                    break;
                }
            }

            if let Some((rule, match_count)) = matched {
                fired = Some(build_rule_alert(
                    &rule,
                    source,
                    payload,
                    user_id,
                    match_count,
                    &details,
                    now,
                ));
            }
        }

        // 4. 알림 기록 및 디스패치
        let Some(alert) = fired else {
            return Ok(None);
        };

        inner.total_threats += 1;
        inner.alerts.append(alert.clone());
        metrics::counter!(
            m::MONITOR_THREATS_DETECTED_TOTAL,
            m::LABEL_THREAT_TYPE => alert.threat_type.as_str()
        )
        .increment(1);
        metrics::gauge!(m::MONITOR_ALERT_STORE_SIZE).set(inner.alerts.len() as f64);
        drop(guard);

        tracing::info!(
            alert_id = %alert.id,
            threat_type = %alert.threat_type,
            threat_level = %alert.threat_level,
            source,
            "security alert generated"
        );

        // 콜백은 잠금 밖에서 호출 — 실패해도 수집은 완료됨
        let alert_event = AlertEvent::new(alert.clone(), alert.threat_level);
        self.dispatcher.dispatch(&alert_event);

        Ok(Some(alert))
    }

    /// 알림을 해결 처리합니다.
    ///
    /// 알 수 없는 ID면 `false`, 처리되면 `true`를 반환합니다.
    /// 이미 해결된 알림에 다시 호출해도 `true`이며 최초 메타데이터가 유지됩니다.
    pub fn resolve(&self, alert_id: &str, notes: &str) -> bool {
        self.lock_inner().alerts.resolve(alert_id, notes)
    }

    /// 알림을 최신순으로 조회합니다.
    pub fn list_alerts(
        &self,
        limit: usize,
        level_filter: Option<ThreatLevel>,
        resolved_filter: Option<bool>,
    ) -> Vec<Alert> {
        self.lock_inner().alerts.query(limit, level_filter, resolved_filter)
    }

    /// 탐지 규칙을 추가합니다.
    ///
    /// 유효하지 않은 규칙(빈 패턴, 0 임계값, 잘못된 정규식)과
    /// 중복 ID는 명시적으로 거부합니다.
    pub fn add_rule(&self, rule: Rule) -> Result<(), MonitorError> {
        rule.validate()?;

        let mut inner = self.lock_inner();
        if inner.rules.get(&rule.id).is_some() {
            return Err(MonitorError::DuplicateRule {
                rule_id: rule.id.clone(),
            });
        }

        inner.matcher.compile_rule(&rule)?;
        let rule_id = rule.id.clone();
        inner.rules.add(rule)?;
        tracing::info!(rule_id, "detection rule added");
        Ok(())
    }

    /// 규칙을 비활성화합니다. 알 수 없는 ID면 `false`를 반환합니다.
    pub fn disable_rule(&self, rule_id: &str) -> bool {
        let disabled = self.lock_inner().rules.disable(rule_id);
        if disabled {
            tracing::info!(rule_id, "detection rule disabled");
        }
        disabled
    }

    /// 현재 상태 스냅샷을 생성합니다.
    pub fn stats(&self) -> StatsSnapshot {
        let inner = self.lock_inner();
        report::build_stats(
            inner.state == MonitorState::Running,
            inner.total_events,
            inner.total_threats,
            inner.rules.enabled_count(),
            &inner.alerts,
            SystemTime::now(),
        )
    }

    /// 최근 `hours`시간에 대한 위협 보고서를 생성합니다.
    pub fn report(&self, hours: u32) -> ReportSnapshot {
        let inner = self.lock_inner();
        report::build_report(&inner.alerts, hours, SystemTime::now())
    }

    /// 백그라운드 스위퍼를 시작합니다.
    ///
    /// 이미 실행 중이면 [`MonitorError::AlreadyRunning`]을 반환합니다.
    pub async fn start(&self) -> Result<(), MonitorError> {
        {
            let mut inner = self.lock_inner();
            if inner.state == MonitorState::Running {
                return Err(MonitorError::AlreadyRunning);
            }
            inner.state = MonitorState::Running;
        }

        tracing::info!(
            interval_secs = self.config.sweep_interval_secs,
            retention_secs = self.config.rate_retention_secs,
            "starting background sweeper"
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(sweeper_loop(
            Arc::clone(&self.inner),
            self.config.sweep_interval_secs,
            self.config.rate_retention_secs,
            cancel.clone(),
        ));

        *self.sweeper.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(SweeperHandle { cancel, task });
        Ok(())
    }

    /// 백그라운드 스위퍼를 정지합니다.
    ///
    /// 정지 신호 후 설정된 한도까지 태스크 종료를 기다리며,
    /// 한도를 넘기면 태스크를 중단시킵니다.
    /// 실행 중이 아니면 [`MonitorError::NotRunning`]을 반환합니다.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        let handle = {
            let mut inner = self.lock_inner();
            if inner.state != MonitorState::Running {
                return Err(MonitorError::NotRunning);
            }
            inner.state = MonitorState::Stopped;
            self.sweeper
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        };

        if let Some(SweeperHandle { cancel, task }) = handle {
            cancel.cancel();
            let abort = task.abort_handle();
            let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
            if tokio::time::timeout(timeout, task).await.is_err() {
                abort.abort();
                tracing::warn!(
                    timeout_secs = self.config.shutdown_timeout_secs,
                    "sweeper did not stop within timeout, aborting task"
                );
            }
        }

        tracing::info!("security monitor stopped");
        Ok(())
    }

    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &'static str {
        match self.lock_inner().state {
            MonitorState::Initialized => "initialized",
            MonitorState::Running => "running",
            MonitorState::Stopped => "stopped",
        }
    }

    /// 수집된 전체 이벤트 수를 반환합니다.
    pub fn total_events(&self) -> u64 {
        self.lock_inner().total_events
    }

    /// 탐지된 전체 위협 수를 반환합니다.
    pub fn total_threats(&self) -> u64 {
        self.lock_inner().total_threats
    }

    /// 속도 제한 발화 수를 반환합니다.
    pub fn rate_limited_count(&self) -> u64 {
        self.lock_inner().rate_limited
    }

    /// 규칙 평가 에러 수를 반환합니다.
    pub fn eval_error_count(&self) -> u64 {
        self.lock_inner().eval_errors
    }

    /// 전체 규칙 수를 반환합니다 (비활성 포함).
    pub fn rule_count(&self) -> usize {
        self.lock_inner().rules.len()
    }

    /// 디스패처 통계에 대한 참조를 반환합니다.
    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }
}

/// 백그라운드 스위퍼 루프
///
/// 주기마다 속도 제한 윈도우에서 보존 기간을 넘긴 엔트리를 제거하고
/// 빈 키를 정리합니다. 이벤트 히스토리는 용량 기반으로 관리되므로
/// 여기서 건드리지 않습니다.
async fn sweeper_loop(
    inner: Arc<Mutex<MonitorInner>>,
    interval_secs: u64,
    retention_secs: u64,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let retention = Duration::from_secs(retention_secs);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("sweeper received cancellation");
                break;
            }
            _ = interval.tick() => {
                let now = SystemTime::now();
                let (evicted, keys) = {
                    let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                    let evicted = inner.limiter.sweep(now, retention);
                    (evicted, inner.limiter.key_count())
                };

                metrics::gauge!(m::MONITOR_RATE_WINDOW_KEYS).set(keys as f64);
                if evicted > 0 {
                    metrics::counter!(m::MONITOR_SWEEPER_EVICTIONS_TOTAL).increment(evicted);
                    tracing::debug!(evicted, keys, "swept stale rate window entries");
                }
            }
        }
    }
}

/// 규칙 발화 알림을 생성합니다.
fn build_rule_alert(
    rule: &Rule,
    source: &str,
    payload: &str,
    user_id: Option<&str>,
    match_count: Option<u64>,
    caller_details: &serde_json::Map<String, serde_json::Value>,
    now: SystemTime,
) -> Alert {
    let mut details = caller_details.clone();
    details.insert("rule_id".to_owned(), rule.id.clone().into());
    details.insert("pattern".to_owned(), rule.pattern.clone().into());
    details.insert("payload".to_owned(), payload.to_owned().into());
    if let Some(count) = match_count {
        details.insert("match_count".to_owned(), count.into());
        details.insert("threshold".to_owned(), rule.threshold.into());
        details.insert("window_secs".to_owned(), rule.window_secs.into());
    }

    Alert {
        id: uuid::Uuid::new_v4().to_string(),
        threat_type: rule.threat_type,
        threat_level: rule.threat_level,
        source: source.to_owned(),
        description: format!("Rule '{}' matched event from {source}", rule.name),
        details,
        timestamp: now,
        user_id: user_id.map(str::to_owned),
        resolved: false,
        resolution_notes: None,
        resolved_at: None,
    }
}

/// 속도 제한 알림을 생성합니다.
#[allow(clippy::too_many_arguments)]
fn build_rate_alert(
    rate_rule: &Rule,
    key: &str,
    source: &str,
    payload: &str,
    user_id: Option<&str>,
    observed: u64,
    caller_details: &serde_json::Map<String, serde_json::Value>,
    now: SystemTime,
) -> Alert {
    let mut details = caller_details.clone();
    details.insert("rule_id".to_owned(), rate_rule.id.clone().into());
    details.insert("observed".to_owned(), observed.into());
    details.insert("threshold".to_owned(), rate_rule.threshold.into());
    details.insert("window_secs".to_owned(), rate_rule.window_secs.into());
    details.insert("payload".to_owned(), payload.to_owned().into());

    Alert {
        id: uuid::Uuid::new_v4().to_string(),
        threat_type: rate_rule.threat_type,
        threat_level: rate_rule.threat_level,
        source: source.to_owned(),
        description: format!(
            "Request rate limit exceeded for {key}: {observed} requests in {}s (limit {})",
            rate_rule.window_secs, rate_rule.threshold,
        ),
        details,
        timestamp: now,
        user_id: user_id.map(str::to_owned),
        resolved: false,
        resolution_notes: None,
        resolved_at: None,
    }
}

/// 보안 이벤트 모니터 빌더
///
/// 설정과 알림 콜백을 지정하여 모니터를 구성합니다.
/// 내장 규칙 세트가 생성 시 시딩됩니다.
pub struct SecurityMonitorBuilder {
    config: MonitorConfig,
    callback: Option<Arc<AlertCallback>>,
}

impl SecurityMonitorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: MonitorConfig::default(),
            callback: None,
        }
    }

    /// 모니터 설정을 지정합니다.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// 알림 콜백을 등록합니다 (인스턴스당 최대 1개).
    pub fn alert_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AlertEvent) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// 모니터를 빌드합니다.
    ///
    /// 설정 검증과 내장 규칙 시딩(정규식 컴파일 포함)을 수행합니다.
    pub fn build(self) -> Result<SecurityMonitor, MonitorError> {
        self.config.validate()?;

        let mut matcher = PatternMatcher::new();
        let mut rules = RuleStore::new();
        for rule in builtin_rules() {
            matcher.compile_rule(&rule)?;
            rules.add(rule)?;
        }

        let inner = MonitorInner {
            rules,
            matcher,
            history: EventHistory::new(self.config.history_capacity),
            limiter: RateLimiter::new(),
            alerts: AlertStore::new(self.config.alert_capacity),
            total_events: 0,
            total_threats: 0,
            rate_limited: 0,
            eval_errors: 0,
            state: MonitorState::Initialized,
        };

        let dispatcher = match self.callback {
            Some(callback) => AlertDispatcher::with_callback(callback),
            None => AlertDispatcher::new(),
        };

        Ok(SecurityMonitor {
            config: self.config,
            inner: Arc::new(Mutex::new(inner)),
            dispatcher: Arc::new(dispatcher),
            sweeper: Arc::new(Mutex::new(None)),
        })
    }
}

impl Default for SecurityMonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::{ThreatLevel, ThreatType};

    use crate::rule::RULE_RATE_LIMIT;

    fn build_monitor() -> SecurityMonitor {
        SecurityMonitorBuilder::new().build().unwrap()
    }

    #[test]
    fn builder_seeds_builtin_rules() {
        let monitor = build_monitor();
        assert_eq!(monitor.rule_count(), 6);
        assert_eq!(monitor.state_name(), "initialized");
        assert_eq!(monitor.total_events(), 0);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = MonitorConfig {
            history_capacity: 0,
            ..Default::default()
        };
        let result = SecurityMonitorBuilder::new().config(config).build();
        assert!(result.is_err());
    }

    #[test]
    fn benign_payload_produces_no_alert() {
        let monitor = build_monitor();
        let alert = monitor
            .ingest("voice_command", "what time is it", None, Default::default())
            .unwrap();
        assert!(alert.is_none());
        assert_eq!(monitor.total_events(), 1);
        assert_eq!(monitor.total_threats(), 0);
    }

    #[test]
    fn sql_injection_fires_critical_alert() {
        let monitor = build_monitor();
        let alert = monitor
            .ingest(
                "api_request",
                "'; DROP TABLE users; --",
                None,
                Default::default(),
            )
            .unwrap()
            .expect("sql injection should produce an alert");

        assert_eq!(alert.threat_type, ThreatType::InjectionAttempt);
        assert_eq!(alert.threat_level, ThreatLevel::Critical);
        assert_eq!(alert.source, "api_request");
        assert_eq!(alert.details["rule_id"], "sql_injection");
        assert!(alert.details.contains_key("pattern"));
        assert_eq!(alert.details["payload"], "'; DROP TABLE users; --");
        assert_eq!(monitor.total_threats(), 1);
    }

    #[test]
    fn first_match_wins_single_alert_per_event() {
        let monitor = build_monitor();
        // sql_injection과 suspicious_pattern 모두에 매칭되는 payload
        let alert = monitor
            .ingest(
                "api_request",
                "union select password from users; cat /etc/shadow",
                None,
                Default::default(),
            )
            .unwrap()
            .expect("should fire");

        // 삽입 순서상 먼저인 sql_injection이 이김
        assert_eq!(alert.details["rule_id"], "sql_injection");
        assert_eq!(monitor.total_threats(), 1);
    }

    #[test]
    fn disabled_monitor_ignores_events() {
        let config = MonitorConfig {
            enabled: false,
            ..Default::default()
        };
        let monitor = SecurityMonitorBuilder::new().config(config).build().unwrap();
        let alert = monitor
            .ingest("api", "'; DROP TABLE users; --", None, Default::default())
            .unwrap();
        assert!(alert.is_none());
        assert_eq!(monitor.total_events(), 0);
    }

    #[test]
    fn disable_rule_stops_detection() {
        let monitor = build_monitor();
        assert!(monitor.disable_rule("sql_injection"));

        // sql_injection 비활성화 후 해당 payload는 다른 규칙에도 걸리지 않음
        let alert = monitor
            .ingest("api", "'; DROP TABLE users; --", None, Default::default())
            .unwrap();
        assert!(alert.is_none());
    }

    #[test]
    fn disable_unknown_rule_returns_false() {
        let monitor = build_monitor();
        assert!(!monitor.disable_rule("no_such_rule"));
    }

    #[test]
    fn add_rule_and_detect() {
        let monitor = build_monitor();
        monitor
            .add_rule(Rule {
                id: "custom".to_owned(),
                name: "Custom Keyword".to_owned(),
                threat_type: ThreatType::SuspiciousPattern,
                pattern: "tarpit".to_owned(),
                threshold: 1,
                window_secs: 60,
                threat_level: ThreatLevel::Low,
                enabled: true,
            })
            .unwrap();

        let alert = monitor
            .ingest("api", "enable tarpit mode", None, Default::default())
            .unwrap()
            .expect("custom rule should fire");
        assert_eq!(alert.details["rule_id"], "custom");
        assert_eq!(alert.threat_level, ThreatLevel::Low);
    }

    #[test]
    fn add_rule_rejects_duplicate_id() {
        let monitor = build_monitor();
        let err = monitor
            .add_rule(Rule {
                id: "sql_injection".to_owned(),
                name: "Dup".to_owned(),
                threat_type: ThreatType::InjectionAttempt,
                pattern: "x".to_owned(),
                threshold: 1,
                window_secs: 60,
                threat_level: ThreatLevel::Low,
                enabled: true,
            })
            .unwrap_err();
        assert!(matches!(err, MonitorError::DuplicateRule { .. }));
    }

    #[test]
    fn add_rule_rejects_invalid_regex() {
        let monitor = build_monitor();
        let err = monitor
            .add_rule(Rule {
                id: "bad_regex".to_owned(),
                name: "Bad".to_owned(),
                threat_type: ThreatType::SuspiciousPattern,
                pattern: "[unclosed".to_owned(),
                threshold: 1,
                window_secs: 60,
                threat_level: ThreatLevel::Low,
                enabled: true,
            })
            .unwrap_err();
        assert!(matches!(err, MonitorError::RuleValidation { .. }));
        // 실패한 규칙은 저장소에 남지 않음
        assert_eq!(monitor.rule_count(), 6);
    }

    #[test]
    fn threshold_rule_fires_on_nth_event() {
        let monitor = build_monitor();

        // 내장 brute_force_login: threshold 5, window 600s
        for i in 0..4 {
            let alert = monitor
                .ingest("login", "failed login for admin", Some("admin"), Default::default())
                .unwrap();
            assert!(alert.is_none(), "event {i} should not fire yet");
        }

        let alert = monitor
            .ingest("login", "failed login for admin", Some("admin"), Default::default())
            .unwrap()
            .expect("5th failed login should fire");
        assert_eq!(alert.threat_type, ThreatType::BruteForce);
        assert_eq!(alert.threat_level, ThreatLevel::High);
        assert_eq!(alert.details["match_count"], 5);
    }

    #[test]
    fn threshold_counts_are_keyed_by_user() {
        let monitor = build_monitor();

        // 서로 다른 사용자에게 나뉜 실패는 합산되지 않음
        for _ in 0..3 {
            assert!(
                monitor
                    .ingest("login", "failed login", Some("alice"), Default::default())
                    .unwrap()
                    .is_none()
            );
            assert!(
                monitor
                    .ingest("login", "failed login", Some("bob"), Default::default())
                    .unwrap()
                    .is_none()
            );
        }
        assert_eq!(monitor.total_threats(), 0);
    }

    #[test]
    fn custom_rate_rule_fires_past_threshold() {
        let monitor = build_monitor();

        // 내장 rate_limit(100/60s)를 끄고 더 낮은 임계값으로 교체
        assert!(monitor.disable_rule(RULE_RATE_LIMIT));
        monitor
            .add_rule(Rule {
                id: "tight_rate".to_owned(),
                name: "Tight Rate Limit".to_owned(),
                threat_type: ThreatType::RateLimitExceeded,
                pattern: ".*".to_owned(),
                threshold: 2,
                window_secs: 60,
                threat_level: ThreatLevel::Medium,
                enabled: true,
            })
            .unwrap();

        assert!(
            monitor
                .ingest("api", "status check", Some("u"), Default::default())
                .unwrap()
                .is_none()
        );
        assert!(
            monitor
                .ingest("api", "status check", Some("u"), Default::default())
                .unwrap()
                .is_none()
        );

        let alert = monitor
            .ingest("api", "status check", Some("u"), Default::default())
            .unwrap()
            .expect("3rd request should exceed limit of 2");
        assert_eq!(alert.threat_type, ThreatType::RateLimitExceeded);
        assert_eq!(alert.details["observed"], 3);
        assert_eq!(alert.details["threshold"], 2);
        assert_eq!(monitor.rate_limited_count(), 1);
    }

    #[test]
    fn rate_limit_skips_rule_evaluation() {
        let monitor = build_monitor();
        assert!(monitor.disable_rule(RULE_RATE_LIMIT));
        monitor
            .add_rule(Rule {
                id: "tight_rate".to_owned(),
                name: "Tight Rate Limit".to_owned(),
                threat_type: ThreatType::RateLimitExceeded,
                pattern: ".*".to_owned(),
                threshold: 1,
                window_secs: 60,
                threat_level: ThreatLevel::Medium,
                enabled: true,
            })
            .unwrap();

        // 1번째는 통과, 2번째부터 속도 제한 — 인젝션 payload라도
        // 속도 제한 알림이 우선하며 이벤트당 알림은 1건
        assert!(
            monitor
                .ingest("api", "hello", Some("u"), Default::default())
                .unwrap()
                .is_none()
        );
        let alert = monitor
            .ingest("api", "'; DROP TABLE users; --", Some("u"), Default::default())
            .unwrap()
            .expect("rate limit should fire");
        assert_eq!(alert.threat_type, ThreatType::RateLimitExceeded);
        assert_eq!(monitor.total_threats(), 1);
    }

    #[test]
    fn resolve_roundtrip() {
        let monitor = build_monitor();
        let alert = monitor
            .ingest("api", "'; DROP TABLE users; --", None, Default::default())
            .unwrap()
            .unwrap();

        assert!(monitor.resolve(&alert.id, "confirmed and blocked upstream"));
        assert!(!monitor.resolve("unknown-id", "notes"));

        let resolved = monitor.list_alerts(10, None, Some(true));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, alert.id);
        assert_eq!(
            resolved[0].resolution_notes.as_deref(),
            Some("confirmed and blocked upstream")
        );
    }

    #[test]
    fn list_alerts_filters_by_level() {
        let monitor = build_monitor();
        monitor
            .ingest("api", "'; DROP TABLE users; --", None, Default::default())
            .unwrap();
        monitor
            .ingest("shell", "cat /etc/shadow", None, Default::default())
            .unwrap();

        let criticals = monitor.list_alerts(10, Some(ThreatLevel::Critical), None);
        assert_eq!(criticals.len(), 1);
        let highs = monitor.list_alerts(10, Some(ThreatLevel::High), None);
        assert_eq!(highs.len(), 1);
    }

    #[test]
    fn stats_reflect_ingest_activity() {
        let monitor = build_monitor();
        monitor
            .ingest("api", "benign request", None, Default::default())
            .unwrap();
        monitor
            .ingest("api", "'; DROP TABLE users; --", None, Default::default())
            .unwrap();

        let stats = monitor.stats();
        assert!(!stats.monitoring_active);
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.total_threats, 1);
        assert_eq!(stats.threats_last_24h, 1);
        assert_eq!(stats.unresolved_count, 1);
        assert_eq!(stats.counts_by_level["critical"], 1);
        assert_eq!(stats.active_rule_count, 6);
    }

    #[test]
    fn callback_receives_alert_event() {
        use std::sync::Mutex as StdMutex;

        let seen: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let monitor = SecurityMonitorBuilder::new()
            .alert_callback(move |event| {
                seen_clone.lock().unwrap().push(event.alert.id.clone());
                Ok(())
            })
            .build()
            .unwrap();

        let alert = monitor
            .ingest("api", "'; DROP TABLE users; --", None, Default::default())
            .unwrap()
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], alert.id);
    }

    #[test]
    fn failing_callback_does_not_break_ingest() {
        let monitor = SecurityMonitorBuilder::new()
            .alert_callback(|_| Err("sink offline".into()))
            .build()
            .unwrap();

        let alert = monitor
            .ingest("api", "'; DROP TABLE users; --", None, Default::default())
            .unwrap();
        assert!(alert.is_some());
        assert_eq!(monitor.dispatcher().failed_count(), 1);
        assert_eq!(monitor.total_threats(), 1);
    }

    #[tokio::test]
    async fn lifecycle_start_and_stop() {
        let monitor = build_monitor();
        assert_eq!(monitor.state_name(), "initialized");

        monitor.start().await.unwrap();
        assert_eq!(monitor.state_name(), "running");
        assert!(monitor.stats().monitoring_active);

        monitor.stop().await.unwrap();
        assert_eq!(monitor.state_name(), "stopped");
        assert!(!monitor.stats().monitoring_active);
    }

    #[tokio::test]
    async fn double_start_fails() {
        let monitor = build_monitor();
        monitor.start().await.unwrap();
        let err = monitor.start().await.unwrap_err();
        assert!(matches!(err, MonitorError::AlreadyRunning));
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_fails() {
        let monitor = build_monitor();
        let err = monitor.stop().await.unwrap_err();
        assert!(matches!(err, MonitorError::NotRunning));
    }

    #[tokio::test]
    async fn restart_after_stop_is_allowed() {
        let monitor = build_monitor();
        monitor.start().await.unwrap();
        monitor.stop().await.unwrap();
        monitor.start().await.unwrap();
        assert_eq!(monitor.state_name(), "running");
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn cloned_handles_share_state() {
        let monitor = build_monitor();
        let clone = monitor.clone();

        clone
            .ingest("api", "'; DROP TABLE users; --", None, Default::default())
            .unwrap();
        assert_eq!(monitor.total_threats(), 1);
        assert_eq!(monitor.list_alerts(10, None, None).len(), 1);
    }

    #[test]
    fn ingest_is_callable_from_multiple_threads() {
        let monitor = build_monitor();
        let mut handles = Vec::new();

        for t in 0..4 {
            let monitor = monitor.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    monitor
                        .ingest(
                            &format!("source_{t}"),
                            &format!("benign event {i}"),
                            Some(&format!("user_{t}")),
                            Default::default(),
                        )
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(monitor.total_events(), 100);
        assert_eq!(monitor.total_threats(), 0);
    }
}
