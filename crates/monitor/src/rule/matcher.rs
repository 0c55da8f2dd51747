//! 패턴 매칭 로직 -- 정규식 컴파일 및 캐싱
//!
//! [`PatternMatcher`]는 규칙의 패턴을 이벤트 본문에 대해 평가합니다.
//! 정규식은 규칙 추가 시 한 번만 컴파일하여 캐싱합니다.
//! 매 이벤트마다 모든 활성 규칙을 평가하므로 재컴파일 오버헤드를 제거해야 합니다.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use super::types::Rule;
use crate::error::MonitorError;

/// 패턴 매처 -- 대소문자 무시 정규식 검색 및 캐싱
///
/// 전체 일치(full match)가 아닌 부분 검색(search)을 수행합니다.
pub struct PatternMatcher {
    /// 컴파일된 정규식 캐시: rule_id -> Regex
    regex_cache: HashMap<String, Regex>,
}

impl PatternMatcher {
    /// 새 매처를 생성합니다.
    pub fn new() -> Self {
        Self {
            regex_cache: HashMap::new(),
        }
    }

    /// 규칙의 정규식 패턴을 미리 컴파일합니다.
    ///
    /// 규칙 추가 시 호출하여 패턴의 유효성을 검증하고 캐싱합니다.
    pub fn compile_rule(&mut self, rule: &Rule) -> Result<(), MonitorError> {
        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| MonitorError::RuleValidation {
                rule_id: rule.id.clone(),
                reason: format!("invalid regex pattern '{}': {e}", rule.pattern),
            })?;
        self.regex_cache.insert(rule.id.clone(), regex);
        Ok(())
    }

    /// 규칙 제거 시 캐시를 정리합니다.
    pub fn remove_rule(&mut self, rule_id: &str) {
        self.regex_cache.remove(rule_id);
    }

    /// 규칙의 패턴이 텍스트에 매칭되는지 평가합니다.
    ///
    /// 컴파일되지 않은 규칙에 대해 호출하면 에러를 반환합니다.
    pub fn matches(&self, rule: &Rule, text: &str) -> Result<bool, MonitorError> {
        let regex = self.regex_cache.get(&rule.id).ok_or_else(|| {
            MonitorError::RuleMatch(format!("pattern not compiled for rule '{}'", rule.id))
        })?;
        Ok(regex.is_match(text))
    }

    /// 캐싱된 패턴 수를 반환합니다.
    pub fn compiled_count(&self) -> usize {
        self.regex_cache.len()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}
