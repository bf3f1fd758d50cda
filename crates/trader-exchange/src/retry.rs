//! 재시도와 호출 로깅을 덧붙이는 엔진 래퍼.
//!
//! `LoggingEngine`은 다른 `TradingEngine`을 감싸 모든 호출의 소요 시간을
//! 기록합니다. 조회성 호출(시장 데이터, 잔고, 거래 기록)은 재시도 가능한
//! 에러에 한해 지수 백오프로 다시 시도합니다. 주문 실행과 거래 기록 추가는
//! 중복 실행을 막기 위해 재시도하지 않습니다.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use trader_core::{
    AssetBalance, Candle, EngineError, ExecutionOutcome, Granularity, IndicatorRow, TradeOrder,
    TradeRecord, TradingEngine,
};

/// 재시도 정책.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 최대 재시도 횟수 (첫 시도 제외)
    pub max_retries: u32,
    /// 첫 재시도 전 대기 시간 (ms)
    pub initial_delay_millis: u64,
    /// 최대 대기 시간 (ms)
    pub max_delay_millis: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_millis: 500,
            max_delay_millis: 5000,
        }
    }
}

impl RetryPolicy {
    /// 재시도하지 않는 정책.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// `attempt`번째 재시도 전 대기 시간 (ms).
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let factor = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
        self.initial_delay_millis
            .saturating_mul(factor)
            .min(self.max_delay_millis)
    }

    /// 재시도 가능한 에러에 한해 작업을 반복합니다.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay,
                        error = %e,
                        "Engine call failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// 호출 로깅과 재시도를 추가하는 엔진 래퍼.
pub struct LoggingEngine {
    inner: Arc<dyn TradingEngine>,
    policy: RetryPolicy,
}

impl LoggingEngine {
    /// 엔진을 감쌉니다.
    pub fn new(inner: Arc<dyn TradingEngine>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn timed<T, Fut>(&self, operation: &str, fut: Fut) -> Result<T, EngineError>
    where
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let start = Instant::now();
        let result = fut.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!(engine = self.inner.name(), operation, elapsed_ms, "Engine call completed"),
            Err(e) => warn!(engine = self.inner.name(), operation, elapsed_ms, error = %e, "Engine call failed"),
        }
        result
    }
}

#[async_trait]
impl TradingEngine for LoggingEngine {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_market_data(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Vec<Candle>, EngineError> {
        let op = "fetch_market_data";
        self.timed(
            op,
            self.policy
                .run(op, || self.inner.fetch_market_data(symbol, granularity)),
        )
        .await
    }

    async fn calculate_technical_indicators(
        &self,
        candles: &[Candle],
    ) -> Result<Vec<IndicatorRow>, EngineError> {
        self.timed(
            "calculate_technical_indicators",
            self.inner.calculate_technical_indicators(candles),
        )
        .await
    }

    async fn analyze_with_ai(
        &self,
        symbol: &str,
        rows: &[IndicatorRow],
    ) -> Result<serde_json::Value, EngineError> {
        self.timed("analyze_with_ai", self.inner.analyze_with_ai(symbol, rows))
            .await
    }

    async fn fetch_account_balance(&self) -> Result<BTreeMap<String, AssetBalance>, EngineError> {
        let op = "fetch_account_balance";
        self.timed(op, self.policy.run(op, || self.inner.fetch_account_balance()))
            .await
    }

    async fn execute_trade(&self, order: &TradeOrder) -> Result<ExecutionOutcome, EngineError> {
        self.timed("execute_trade", self.inner.execute_trade(order))
            .await
    }

    async fn get_trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>, EngineError> {
        let op = "get_trade_history";
        self.timed(op, self.policy.run(op, || self.inner.get_trade_history(limit)))
            .await
    }

    async fn log_trade(&self, trade: TradeRecord) -> Result<(), EngineError> {
        self.timed("log_trade", self.inner.log_trade(trade)).await
    }

    async fn run_strategy(&self, symbol: &str) -> Result<serde_json::Value, EngineError> {
        self.timed("run_strategy", self.inner.run_strategy(symbol))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 처음 `failures`번은 네트워크 에러를 내는 엔진.
    struct FlakyEngine {
        failures: u32,
        calls: AtomicU32,
        error: fn() -> EngineError,
    }

    impl FlakyEngine {
        fn new(failures: u32, error: fn() -> EngineError) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                error,
            }
        }

        fn step(&self) -> Result<(), EngineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)())
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TradingEngine for FlakyEngine {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch_market_data(
            &self,
            _symbol: &str,
            _granularity: Granularity,
        ) -> Result<Vec<Candle>, EngineError> {
            self.step().map(|_| Vec::new())
        }

        async fn calculate_technical_indicators(
            &self,
            _candles: &[Candle],
        ) -> Result<Vec<IndicatorRow>, EngineError> {
            self.step().map(|_| Vec::new())
        }

        async fn analyze_with_ai(
            &self,
            _symbol: &str,
            _rows: &[IndicatorRow],
        ) -> Result<serde_json::Value, EngineError> {
            self.step().map(|_| serde_json::Value::Null)
        }

        async fn fetch_account_balance(
            &self,
        ) -> Result<BTreeMap<String, AssetBalance>, EngineError> {
            self.step().map(|_| BTreeMap::new())
        }

        async fn execute_trade(
            &self,
            _order: &TradeOrder,
        ) -> Result<ExecutionOutcome, EngineError> {
            self.step().map(|_| ExecutionOutcome::Filled {
                order_id: "o1".to_string(),
            })
        }

        async fn get_trade_history(&self, _limit: usize) -> Result<Vec<TradeRecord>, EngineError> {
            self.step().map(|_| Vec::new())
        }

        async fn log_trade(&self, _trade: TradeRecord) -> Result<(), EngineError> {
            self.step()
        }

        async fn run_strategy(&self, _symbol: &str) -> Result<serde_json::Value, EngineError> {
            self.step().map(|_| serde_json::Value::Null)
        }
    }

    fn network() -> EngineError {
        EngineError::Network("connection reset".to_string())
    }

    fn auth() -> EngineError {
        EngineError::Authentication("bad key".to_string())
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay_millis: 1,
            max_delay_millis: 2,
        }
    }

    #[test]
    fn test_delay_for_attempt() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay_millis: 100,
            max_delay_millis: 1000,
        };
        assert_eq!(policy.delay_for_attempt(0), 100);
        assert_eq!(policy.delay_for_attempt(2), 400);
        assert_eq!(policy.delay_for_attempt(10), 1000);
        assert_eq!(policy.delay_for_attempt(80), 1000);
    }

    #[tokio::test]
    async fn test_reads_retry_transient_errors() {
        let flaky = Arc::new(FlakyEngine::new(2, network));
        let engine = LoggingEngine::new(flaky.clone(), fast_policy());

        assert!(engine.fetch_account_balance().await.is_ok());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let flaky = Arc::new(FlakyEngine::new(10, network));
        let engine = LoggingEngine::new(flaky.clone(), fast_policy());

        let err = engine
            .fetch_market_data("BTC-USD", Granularity::OneHour)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Network(_)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let flaky = Arc::new(FlakyEngine::new(1, auth));
        let engine = LoggingEngine::new(flaky.clone(), fast_policy());

        assert!(engine.get_trade_history(10).await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_orders_are_never_retried() {
        let flaky = Arc::new(FlakyEngine::new(1, network));
        let engine = LoggingEngine::new(flaky.clone(), fast_policy());

        let order = TradeOrder::market("BTC-USD", trader_core::Side::Buy, rust_decimal::Decimal::ONE);
        assert!(engine.execute_trade(&order).await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.name(), "flaky");
    }
}
