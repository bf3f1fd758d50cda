//! 분석 요청 병합기.
//!
//! AI 분석은 수십 초가 걸리는 외부 호출이므로 같은 심볼에 대한 중복 실행을
//! 막습니다. 심볼마다 `{in_progress, cache}` 슬롯을 두고 다음 규칙을 따릅니다.
//!
//! 1. 분석이 진행 중이면 즉시 `Conflict` (대기열 없음)
//! 2. 캐시가 유효 시간 안에 있으면 엔진 호출 없이 캐시 반환
//! 3. 그 외에는 진행 중으로 표시하고 시장 데이터 조회 → 지표 계산 → 분석
//!    순으로 실행한 뒤 결과를 캐시
//!
//! 1번 확인과 진행 중 표시는 같은 잠금 안에서 이루어집니다. 진행 중 플래그는
//! [`InProgressGuard`]의 `Drop`에서 해제되므로 성공, 에러, 타임아웃, 그리고
//! 요청 future가 중간에 버려지는 경우 모두 남지 않습니다.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trader_core::{AnalysisConfig, Granularity, TraderError, TraderResult, TradingEngine};

use super::market::fetch_candles;
use crate::metrics::record_analysis_request;

/// 캐시된 분석 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisCacheEntry {
    /// 심볼
    pub symbol: String,
    /// 엔진이 반환한 분석 결과
    pub result: serde_json::Value,
    /// 계산 시각
    pub computed_at: DateTime<Utc>,
}

impl AnalysisCacheEntry {
    /// 주어진 유효 시간 안에 있는지 확인합니다.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.computed_at < ttl,
            Err(_) => true,
        }
    }
}

/// 병합기 설정.
#[derive(Debug, Clone)]
pub struct CoalescerConfig {
    /// 캐시 유효 시간
    pub cache_ttl: Duration,
    /// 시장 데이터 조회 타임아웃
    pub market_data_timeout: Duration,
    /// 분석 타임아웃
    pub analysis_timeout: Duration,
    /// 분석에 사용할 캔들 간격
    pub granularity: Granularity,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for CoalescerConfig {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            cache_ttl: config.cache_ttl(),
            market_data_timeout: config.market_data_timeout(),
            analysis_timeout: config.analysis_timeout(),
            granularity: config.default_granularity,
        }
    }
}

#[derive(Debug, Default)]
struct SymbolSlot {
    in_progress: bool,
    cache: Option<AnalysisCacheEntry>,
}

enum Admission<'a> {
    Cached(AnalysisCacheEntry),
    Proceed(InProgressGuard<'a>),
}

/// 심볼별 분석 요청 병합기.
#[derive(Debug, Default)]
pub struct AnalysisCoalescer {
    slots: Mutex<HashMap<String, SymbolSlot>>,
    config: CoalescerConfig,
}

impl AnalysisCoalescer {
    /// 새 병합기를 생성합니다.
    pub fn new(config: CoalescerConfig) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// 설정 조회.
    pub fn config(&self) -> &CoalescerConfig {
        &self.config
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, SymbolSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 심볼의 분석이 진행 중인지 확인합니다.
    pub fn is_in_progress(&self, symbol: &str) -> bool {
        self.slots()
            .get(symbol)
            .map(|slot| slot.in_progress)
            .unwrap_or(false)
    }

    /// 캐시된 결과를 조회합니다 (유효 시간과 무관).
    pub fn cached(&self, symbol: &str) -> Option<AnalysisCacheEntry> {
        self.slots().get(symbol).and_then(|slot| slot.cache.clone())
    }

    /// 확인과 진행 중 표시를 한 번의 잠금 안에서 수행합니다.
    fn admit(&self, symbol: &str) -> TraderResult<Admission<'_>> {
        let mut slots = self.slots();
        let slot = slots.entry(symbol.to_string()).or_default();

        if slot.in_progress {
            return Err(TraderError::Conflict(format!(
                "analysis already in progress for {}",
                symbol
            )));
        }

        if let Some(entry) = &slot.cache {
            if entry.is_fresh(self.config.cache_ttl, Utc::now()) {
                return Ok(Admission::Cached(entry.clone()));
            }
        }

        slot.in_progress = true;
        Ok(Admission::Proceed(InProgressGuard {
            coalescer: self,
            symbol: symbol.to_string(),
        }))
    }

    /// 분석 결과를 반환합니다.
    ///
    /// # Errors
    ///
    /// - `Conflict`: 같은 심볼의 분석이 이미 진행 중
    /// - `Timeout`: 시장 데이터(기본 30초) 또는 분석(기본 60초) 제한 시간 초과
    /// - `DataUnavailable`: 엔진이 빈 데이터를 반환
    pub async fn get_analysis(
        &self,
        symbol: &str,
        engine: &dyn TradingEngine,
    ) -> TraderResult<AnalysisCacheEntry> {
        let guard = match self.admit(symbol) {
            Ok(Admission::Cached(entry)) => {
                debug!(symbol, computed_at = %entry.computed_at, "Analysis cache hit");
                record_analysis_request(symbol, "hit");
                return Ok(entry);
            }
            Ok(Admission::Proceed(guard)) => guard,
            Err(e) => {
                info!(symbol, "Analysis already in progress, rejecting request");
                record_analysis_request(symbol, "conflict");
                return Err(e);
            }
        };

        record_analysis_request(symbol, "miss");
        info!(symbol, engine = engine.name(), "Running analysis");

        match self.compute(symbol, engine).await {
            Ok(result) => {
                let entry = AnalysisCacheEntry {
                    symbol: symbol.to_string(),
                    result,
                    computed_at: Utc::now(),
                };
                guard.store(entry.clone());
                info!(symbol, "Analysis completed and cached");
                Ok(entry)
            }
            Err(e) => {
                warn!(symbol, error = %e, "Analysis failed");
                record_analysis_request(symbol, "error");
                Err(e)
            }
        }
    }

    async fn compute(
        &self,
        symbol: &str,
        engine: &dyn TradingEngine,
    ) -> TraderResult<serde_json::Value> {
        let candles = fetch_candles(
            engine,
            symbol,
            self.config.granularity,
            self.config.market_data_timeout,
        )
        .await?;

        let rows = engine.calculate_technical_indicators(&candles).await?;
        if rows.is_empty() {
            return Err(TraderError::DataUnavailable(format!(
                "no indicator rows for {}",
                symbol
            )));
        }

        let limit = self.config.analysis_timeout;
        let result = tokio::time::timeout(limit, engine.analyze_with_ai(symbol, &rows))
            .await
            .map_err(|_| {
                TraderError::Timeout(format!(
                    "analysis for {} exceeded {}s",
                    symbol,
                    limit.as_secs()
                ))
            })??;

        Ok(result)
    }

    #[cfg(test)]
    fn seed(&self, entry: AnalysisCacheEntry) {
        let symbol = entry.symbol.clone();
        self.slots().entry(symbol).or_default().cache = Some(entry);
    }
}

/// 진행 중 플래그를 해제하는 RAII 가드.
struct InProgressGuard<'a> {
    coalescer: &'a AnalysisCoalescer,
    symbol: String,
}

impl InProgressGuard<'_> {
    /// 결과를 캐시에 저장합니다. 플래그는 가드가 버려질 때 해제됩니다.
    fn store(&self, entry: AnalysisCacheEntry) {
        self.coalescer
            .slots()
            .entry(self.symbol.clone())
            .or_default()
            .cache = Some(entry);
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.coalescer.slots().get_mut(&self.symbol) {
            slot.in_progress = false;
        }
    }
}
