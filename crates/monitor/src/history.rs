//! 이벤트 히스토리 -- 고정 용량 링 버퍼
//!
//! [`EventHistory`]는 수집된 원시 이벤트를 삽입 순서대로 보관합니다.
//! 용량이 초과되면 가장 오래된 엔트리를 제거합니다.
//! "최근 윈도우 W 안에 조건을 만족하는 이벤트가 몇 개인가" 질의에 사용됩니다.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use vigil_core::types::RawEvent;

/// 기본 히스토리 용량
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// 고정 용량 이벤트 히스토리
///
/// 엔트리는 append 시각 기준 시간 순서를 유지하므로,
/// 윈도우 질의는 최신에서 과거 방향으로 스캔하다가
/// 윈도우 경계를 벗어나는 즉시 중단할 수 있습니다.
pub struct EventHistory {
    /// 버퍼 내부 저장소
    buffer: VecDeque<RawEvent>,
    /// 최대 용량
    capacity: usize,
    /// 드롭된 엔트리 카운터 (통계용)
    dropped_count: u64,
    /// 총 유입 엔트리 카운터
    total_appended: u64,
}

impl EventHistory {
    /// 새 이벤트 히스토리를 생성합니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
            dropped_count: 0,
            total_appended: 0,
        }
    }

    /// 이벤트를 히스토리에 추가합니다.
    ///
    /// 용량이 가득 찬 경우 가장 오래된 엔트리를 제거합니다.
    /// 드롭이 발생하면 `true`를 반환합니다.
    pub fn append(&mut self, event: RawEvent) -> bool {
        self.total_appended += 1;

        let mut dropped = false;
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
            self.dropped_count += 1;
            dropped = true;
            tracing::debug!(
                dropped = self.dropped_count,
                capacity = self.capacity,
                "event history full, dropped oldest entry"
            );
        }

        self.buffer.push_back(event);
        dropped
    }

    /// 최근 `window` 안에서 조건을 만족하는 이벤트 수를 반환합니다.
    ///
    /// 최신 엔트리부터 역방향으로 스캔하며, 타임스탬프가 `now - window`보다
    /// 오래된 엔트리를 만나면 즉시 중단합니다. 엔트리가 시간 순서이므로
    /// 이 조기 종료가 정확하며 스캔 비용을 윈도우 크기로 제한합니다.
    pub fn recent_matching<F>(&self, now: SystemTime, window: Duration, predicate: F) -> u64
    where
        F: Fn(&RawEvent) -> bool,
    {
        let cutoff = now.checked_sub(window);

        let mut count = 0;
        for event in self.buffer.iter().rev() {
            if let Some(cutoff) = cutoff
                && event.timestamp < cutoff
            {
                break;
            }
            if predicate(event) {
                count += 1;
            }
        }
        count
    }

    /// 현재 보관 중인 이벤트 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// 히스토리가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 최대 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 지금까지 드롭된 엔트리 수를 반환합니다.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// 총 유입 엔트리 수를 반환합니다.
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }
}
