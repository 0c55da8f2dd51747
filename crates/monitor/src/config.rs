//! 보안 이벤트 모니터 설정
//!
//! [`MonitorConfig`]는 core의 [`EventMonitorConfig`](vigil_core::config::EventMonitorConfig)를
//! 기반으로 모니터 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use vigil_core::config::VigilConfig;
//! use vigil_monitor::config::MonitorConfig;
//!
//! let core_config = VigilConfig::default();
//! let config = MonitorConfig::from_core(&core_config.monitor);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// 보안 이벤트 모니터 설정
///
/// core의 `EventMonitorConfig`에서 파생되며, 모니터 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 이벤트 히스토리 링 버퍼 용량
    pub history_capacity: usize,
    /// 알림 저장소 최대 용량
    pub alert_capacity: usize,
    /// 백그라운드 스위퍼 실행 주기 (초)
    pub sweep_interval_secs: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 속도 제한 윈도우 엔트리 보존 기간 (초) — 스위퍼가 이보다
    /// 오래된 엔트리를 제거합니다
    pub rate_retention_secs: u64,
    /// 스위퍼 정지 시 join 대기 한도 (초)
    pub shutdown_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            history_capacity: 10_000,
            alert_capacity: 50_000,
            sweep_interval_secs: 10,
            rate_retention_secs: 3600,
            shutdown_timeout_secs: 5,
        }
    }
}

impl MonitorConfig {
    /// core의 `EventMonitorConfig`에서 모니터 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &vigil_core::config::EventMonitorConfig) -> Self {
        Self {
            enabled: core.enabled,
            history_capacity: core.history_capacity,
            alert_capacity: core.alert_capacity,
            sweep_interval_secs: core.sweep_interval_secs,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), MonitorError> {
        const MAX_HISTORY_CAPACITY: usize = 10_000_000;
        const MAX_ALERT_CAPACITY: usize = 10_000_000;
        const MAX_SWEEP_INTERVAL_SECS: u64 = 3600; // 1 hour

        if self.history_capacity == 0 || self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(MonitorError::Config {
                field: "history_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_HISTORY_CAPACITY),
            });
        }

        if self.alert_capacity == 0 || self.alert_capacity > MAX_ALERT_CAPACITY {
            return Err(MonitorError::Config {
                field: "alert_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_ALERT_CAPACITY),
            });
        }

        if self.sweep_interval_secs == 0 || self.sweep_interval_secs > MAX_SWEEP_INTERVAL_SECS {
            return Err(MonitorError::Config {
                field: "sweep_interval_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_SWEEP_INTERVAL_SECS),
            });
        }

        if self.rate_retention_secs == 0 {
            return Err(MonitorError::Config {
                field: "rate_retention_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.shutdown_timeout_secs == 0 {
            return Err(MonitorError::Config {
                field: "shutdown_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 모니터 설정 빌더
#[derive(Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 활성화 여부를 설정합니다.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// 이벤트 히스토리 용량을 설정합니다.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// 알림 저장소 용량을 설정합니다.
    pub fn alert_capacity(mut self, capacity: usize) -> Self {
        self.config.alert_capacity = capacity;
        self
    }

    /// 스위퍼 실행 주기(초)를 설정합니다.
    pub fn sweep_interval_secs(mut self, secs: u64) -> Self {
        self.config.sweep_interval_secs = secs;
        self
    }

    /// 속도 제한 윈도우 보존 기간(초)을 설정합니다.
    pub fn rate_retention_secs(mut self, secs: u64) -> Self {
        self.config.rate_retention_secs = secs;
        self
    }

    /// 스위퍼 정지 대기 한도(초)를 설정합니다.
    pub fn shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.config.shutdown_timeout_secs = secs;
        self
    }

    /// 설정을 검증하고 `MonitorConfig`를 생성합니다.
    pub fn build(self) -> Result<MonitorConfig, MonitorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
