//! 알림 디스패치 -- 등록된 콜백으로 알림 전달
//!
//! [`AlertDispatcher`]는 모니터 인스턴스당 0개 또는 1개의 콜백을 보유하며,
//! 새 알림이 생성될 때 동기적으로 호출합니다.
//! 콜백 실패는 기록만 하고 절대 수집 호출자에게 전파하지 않습니다.
//! 수집은 콜백 성패와 무관하게 항상 완료되고 알림을 반환해야 합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use vigil_core::event::AlertEvent;
use vigil_core::metrics as m;

/// 알림 콜백 에러 타입
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// 알림 콜백 시그니처
///
/// 실패는 `Err`로 보고합니다. 디스패처가 기록 후 무시합니다.
pub type AlertCallback = dyn Fn(&AlertEvent) -> Result<(), CallbackError> + Send + Sync;

/// 알림 디스패처
pub struct AlertDispatcher {
    /// 등록된 콜백 (없을 수 있음)
    callback: Option<Arc<AlertCallback>>,
    /// 전달 성공 수
    dispatched: AtomicU64,
    /// 콜백 실패 수
    failed: AtomicU64,
}

impl AlertDispatcher {
    /// 콜백 없이 디스패처를 생성합니다.
    pub fn new() -> Self {
        Self {
            callback: None,
            dispatched: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// 콜백이 등록된 디스패처를 생성합니다.
    pub fn with_callback(callback: Arc<AlertCallback>) -> Self {
        Self {
            callback: Some(callback),
            dispatched: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// 알림 이벤트를 콜백에 전달합니다.
    ///
    /// 콜백이 없으면 아무 일도 하지 않습니다.
    /// 콜백 에러는 warn 로그와 카운터로만 기록됩니다.
    pub fn dispatch(&self, event: &AlertEvent) {
        let Some(callback) = &self.callback else {
            return;
        };

        match callback(event) {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(m::MONITOR_ALERTS_DISPATCHED_TOTAL).increment(1);
                tracing::debug!(
                    alert_id = %event.alert.id,
                    threat_type = %event.alert.threat_type,
                    "alert dispatched"
                );
            }
            Err(error) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(m::MONITOR_CALLBACK_FAILURES_TOTAL).increment(1);
                tracing::warn!(
                    alert_id = %event.alert.id,
                    error = %error,
                    "alert callback failed, continuing"
                );
            }
        }
    }

    /// 콜백 등록 여부를 반환합니다.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// 전달 성공 수를 반환합니다.
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// 콜백 실패 수를 반환합니다.
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
