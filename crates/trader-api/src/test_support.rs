//! 테스트용 트레이딩 엔진과 상태 헬퍼.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Notify;
use trader_core::{
    AppConfig, AssetBalance, Candle, EngineCredentials, EngineError, ExecutionOutcome,
    Granularity, IndicatorRow, TradeOrder, TradeRecord, TraderResult, TradingEngine,
};
use trader_exchange::EngineFactory;

use crate::state::AppState;

/// 호출 횟수를 세고 동작을 조절할 수 있는 엔진.
#[derive(Default)]
pub struct MockEngine {
    price: Decimal,
    gated: bool,
    empty_market_data: bool,
    reject_orders: bool,
    fail_history: bool,
    market_delay: Option<Duration>,
    market_calls: AtomicUsize,
    analysis_calls: AtomicUsize,
    strategy_calls: AtomicUsize,
    analysis_started: Notify,
    analysis_release: Notify,
    orders: Mutex<Vec<TradeOrder>>,
    trades: Mutex<Vec<TradeRecord>>,
}

impl MockEngine {
    /// 마지막 종가가 `price`인 엔진.
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            ..Default::default()
        }
    }

    /// 분석이 `release_analysis` 호출 전까지 끝나지 않게 합니다.
    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    /// 빈 캔들을 반환하게 합니다.
    pub fn with_empty_market_data(mut self) -> Self {
        self.empty_market_data = true;
        self
    }

    /// 시장 데이터 응답을 지연시킵니다.
    pub fn with_market_delay(mut self, delay: Duration) -> Self {
        self.market_delay = Some(delay);
        self
    }

    /// 모든 주문을 거절합니다.
    pub fn with_rejected_orders(mut self) -> Self {
        self.reject_orders = true;
        self
    }

    /// 거래 이력 조회를 실패시킵니다.
    pub fn with_failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    /// 분석 호출이 시작될 때까지 기다립니다.
    pub async fn wait_until_analysis_started(&self) {
        self.analysis_started.notified().await;
    }

    /// 대기 중인 분석을 끝냅니다.
    pub fn release_analysis(&self) {
        self.analysis_release.notify_one();
    }

    pub fn analysis_calls(&self) -> usize {
        self.analysis_calls.load(Ordering::SeqCst)
    }

    pub fn market_calls(&self) -> usize {
        self.market_calls.load(Ordering::SeqCst)
    }

    pub fn strategy_calls(&self) -> usize {
        self.strategy_calls.load(Ordering::SeqCst)
    }

    /// 실행된 주문 목록.
    pub fn orders(&self) -> Vec<TradeOrder> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// 기록된 거래 목록.
    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// 거래 기록을 미리 넣습니다.
    pub fn push_trade(&self, trade: TradeRecord) {
        if let Ok(mut trades) = self.trades.lock() {
            trades.push(trade);
        }
    }

    fn candles(&self) -> Vec<Candle> {
        let now = Utc::now();
        (0..3)
            .map(|i| {
                let close = self.price - Decimal::from(2 - i);
                Candle {
                    timestamp: now - chrono::Duration::hours(3 - i),
                    open: close,
                    high: close + Decimal::ONE,
                    low: close - Decimal::ONE,
                    close,
                    volume: dec!(10),
                }
            })
            .collect()
    }
}

#[async_trait]
impl TradingEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_market_data(
        &self,
        _symbol: &str,
        _granularity: Granularity,
    ) -> Result<Vec<Candle>, EngineError> {
        self.market_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.market_delay {
            tokio::time::sleep(delay).await;
        }
        if self.empty_market_data {
            return Ok(Vec::new());
        }
        Ok(self.candles())
    }

    async fn calculate_technical_indicators(
        &self,
        candles: &[Candle],
    ) -> Result<Vec<IndicatorRow>, EngineError> {
        Ok(candles
            .iter()
            .cloned()
            .map(|candle| {
                let mut row = IndicatorRow::from_candle(candle);
                row.indicators.insert("sma_20".to_string(), None);
                row
            })
            .collect())
    }

    async fn analyze_with_ai(
        &self,
        symbol: &str,
        _rows: &[IndicatorRow],
    ) -> Result<serde_json::Value, EngineError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        self.analysis_started.notify_one();
        if self.gated {
            self.analysis_release.notified().await;
        }
        Ok(serde_json::json!({
            "symbol": symbol,
            "signal": "BUY",
            "confidence": 0.8,
        }))
    }

    async fn fetch_account_balance(&self) -> Result<BTreeMap<String, AssetBalance>, EngineError> {
        let mut balances = BTreeMap::new();
        balances.insert("USD".to_string(), AssetBalance::new(dec!(1000), Decimal::ZERO));
        balances.insert("BTC".to_string(), AssetBalance::new(dec!(0.5), Decimal::ZERO));
        Ok(balances)
    }

    async fn execute_trade(&self, order: &TradeOrder) -> Result<ExecutionOutcome, EngineError> {
        if self.reject_orders {
            return Ok(ExecutionOutcome::Rejected {
                message: "insufficient balance".to_string(),
                kind: "INSUFFICIENT_FUND".to_string(),
            });
        }
        let mut orders = self
            .orders
            .lock()
            .map_err(|_| EngineError::Api("order book poisoned".to_string()))?;
        orders.push(order.clone());
        Ok(ExecutionOutcome::Filled {
            order_id: format!("order-{}", orders.len()),
        })
    }

    async fn get_trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>, EngineError> {
        if self.fail_history {
            return Err(EngineError::Api("trade history store offline".to_string()));
        }
        let trades = self.trades();
        let skip = trades.len().saturating_sub(limit);
        Ok(trades.into_iter().skip(skip).collect())
    }

    async fn log_trade(&self, trade: TradeRecord) -> Result<(), EngineError> {
        self.push_trade(trade);
        Ok(())
    }

    async fn run_strategy(&self, symbol: &str) -> Result<serde_json::Value, EngineError> {
        self.strategy_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!({"symbol": symbol, "executed": false}))
    }
}

/// 항상 같은 엔진을 돌려주는 팩토리.
pub struct FixedEngineFactory(pub Arc<MockEngine>);

impl EngineFactory for FixedEngineFactory {
    fn create(&self, _credentials: &EngineCredentials) -> TraderResult<Arc<dyn TradingEngine>> {
        Ok(self.0.clone())
    }
}

/// 임시 디렉터리를 사용하는 테스트 상태.
///
/// 반환된 `TempDir`이 살아 있는 동안만 저장소 파일이 유지됩니다.
pub fn create_test_state(engine: Arc<MockEngine>) -> (Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.data_dir = dir.path().join("data");
    config.storage.credentials_file = dir.path().join("config/api_keys.json");
    config.scheduler.enabled = false;

    let state = AppState::new(config, Arc::new(FixedEngineFactory(engine)));
    (Arc::new(state), dir)
}

/// 엔진이 이미 설정된 테스트 상태.
pub async fn create_configured_state(
    engine: Arc<MockEngine>,
) -> (Arc<AppState>, tempfile::TempDir) {
    let (state, dir) = create_test_state(engine);
    let credentials = EngineCredentials::new("test-key", "test-secret", "test-ai").unwrap();
    state.configure(&credentials).await.unwrap();
    (state, dir)
}

/// 응답 본문을 JSON으로 읽습니다.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// 전체 API 라우터로 요청 하나를 보냅니다.
pub async fn send(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    crate::routes::create_api_router()
        .with_state(state.clone())
        .oneshot(request)
        .await
        .unwrap()
}
