//! 슬라이딩 윈도우 카운팅 -- 속도 제한과 규칙 임계값 평가
//!
//! 두 가지 독립적인 윈도우 메커니즘을 제공합니다:
//!
//! - [`RateLimiter`]: 이벤트 내용과 무관하게 `(source, user)` 키별
//!   타임스탬프 큐를 유지하는 속도 제한기. 매 호출마다 push 후
//!   윈도우 밖 엔트리를 제거하고 남은 길이를 임계값과 비교합니다.
//! - [`rule_threshold_met`]: `threshold > 1`인 규칙에 대해
//!   [`EventHistory`]를 스캔하여 같은 `(source, user)`의 패턴 매칭
//!   이벤트 수를 세는 임계값 판정. `threshold <= 1`은 윈도우 스캔 없이
//!   첫 매칭에서 발화하므로 이 함수를 호출하지 않습니다.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

use crate::history::EventHistory;
use crate::rule::{PatternMatcher, Rule};

/// 익명 사용자 키
pub const ANONYMOUS_USER: &str = "anonymous";

/// `(source, user)` 조합을 속도 제한 키로 변환합니다.
pub fn rate_key(source: &str, user_id: Option<&str>) -> String {
    format!("{source}:{}", user_id.unwrap_or(ANONYMOUS_USER))
}

/// 속도 제한기 -- 키별 슬라이딩 윈도우 카운터
///
/// 각 키는 요청 타임스탬프 큐를 가지며, "push 후 만료 제거" 패턴으로
/// 항상 윈도우 안의 요청 수만 유지합니다.
pub struct RateLimiter {
    /// 키별 타임스탬프 큐
    windows: HashMap<String, VecDeque<SystemTime>>,
}

impl RateLimiter {
    /// 새 속도 제한기를 생성합니다.
    pub fn new() -> Self {
        Self {
            windows: HashMap::new(),
        }
    }

    /// 요청을 기록하고 속도 제한 초과 여부를 판정합니다.
    ///
    /// 현재 요청을 큐에 넣고, `window` 밖의 엔트리를 제거한 뒤,
    /// 남은 큐 길이가 `threshold`를 **초과**하면 관측된 수를 반환합니다.
    /// (threshold번째 요청까지는 허용, threshold+1번째부터 발화)
    pub fn check(
        &mut self,
        key: &str,
        now: SystemTime,
        window: Duration,
        threshold: u32,
    ) -> Option<u64> {
        let queue = self.windows.entry(key.to_owned()).or_default();
        queue.push_back(now);

        if let Some(cutoff) = now.checked_sub(window) {
            while let Some(front) = queue.front() {
                if *front < cutoff {
                    queue.pop_front();
                } else {
                    break;
                }
            }
        }

        let observed = queue.len() as u64;
        (observed > u64::from(threshold)).then_some(observed)
    }

    /// 보존 기간을 넘긴 엔트리를 모든 키에서 제거합니다.
    ///
    /// 빈 큐가 된 키는 맵에서 제거됩니다. 제거된 엔트리 수를 반환합니다.
    /// 백그라운드 스위퍼가 주기적으로 호출하여 메모리 성장을 방지합니다.
    pub fn sweep(&mut self, now: SystemTime, retention: Duration) -> u64 {
        let Some(cutoff) = now.checked_sub(retention) else {
            return 0;
        };

        let mut evicted = 0;
        for queue in self.windows.values_mut() {
            while let Some(front) = queue.front() {
                if *front < cutoff {
                    queue.pop_front();
                    evicted += 1;
                } else {
                    break;
                }
            }
        }
        self.windows.retain(|_, queue| !queue.is_empty());
        evicted
    }

    /// 현재 추적 중인 키 수를 반환합니다.
    pub fn key_count(&self) -> usize {
        self.windows.len()
    }

    /// 특정 키의 현재 윈도우 내 요청 수를 반환합니다.
    pub fn window_len(&self, key: &str) -> usize {
        self.windows.get(key).map_or(0, VecDeque::len)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// `threshold > 1`인 규칙의 윈도우 임계값 판정을 수행합니다.
///
/// 같은 `(source, user)`에서 발생했고 규칙 패턴에 매칭되는
/// 최근 `rule.window()` 안의 이벤트 수(현재 이벤트 포함)를 세어,
/// `rule.threshold` 이상이면 관측된 수를 반환합니다.
pub fn rule_threshold_met(
    history: &EventHistory,
    matcher: &PatternMatcher,
    rule: &Rule,
    source: &str,
    user_id: Option<&str>,
    now: SystemTime,
) -> Option<u64> {
    let count = history.recent_matching(now, rule.window(), |event| {
        event.source == source
            && event.user_id.as_deref() == user_id
            // 현재 이벤트의 매칭은 호출 전에 확인되었으므로,
            // 과거 이벤트에서의 매칭 실패는 불일치로만 취급합니다.
            && matcher.matches(rule, &event.payload).unwrap_or(false)
    });

    (count >= u64::from(rule.threshold)).then_some(count)
}
