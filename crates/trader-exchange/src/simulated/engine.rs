//! 모의 트레이딩 엔진 구현.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};
use trader_analytics::indicators;
use trader_core::{
    AssetBalance, Candle, EngineError, ExecutionOutcome, Granularity, IndicatorRow, Side,
    TradeOrder, TradeRecord, TradingEngine,
};
use uuid::Uuid;

use super::candles::generate_candles;

/// 모의 엔진 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// 자산별 초기 잔고
    pub initial_balances: HashMap<String, Decimal>,
    /// 처음 보는 심볼의 시작 가격
    pub start_price: Decimal,
    /// 캔들당 최대 변동 비율 (0.01 = 1%)
    pub volatility: Decimal,
    /// 한 번에 생성할 캔들 수
    pub candle_count: usize,
    /// 거래 수수료율 (0.006 = 0.6%)
    pub fee_rate: Decimal,
    /// 난수 시드 (None이면 엔트로피 사용)
    pub seed: Option<u64>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        let mut initial_balances = HashMap::new();
        initial_balances.insert("USD".to_string(), dec!(10000));

        Self {
            initial_balances,
            start_price: dec!(43000),
            volatility: dec!(0.01),
            candle_count: 200,
            fee_rate: dec!(0.006),
            seed: None,
        }
    }
}

impl PaperConfig {
    /// 자산의 초기 잔고를 추가합니다.
    pub fn with_initial_balance(mut self, asset: &str, amount: Decimal) -> Self {
        self.initial_balances.insert(asset.to_uppercase(), amount);
        self
    }

    /// 시작 가격을 설정합니다.
    pub fn with_start_price(mut self, price: Decimal) -> Self {
        self.start_price = price;
        self
    }

    /// 수수료율을 설정합니다.
    pub fn with_fee_rate(mut self, rate: Decimal) -> Self {
        self.fee_rate = rate;
        self
    }

    /// 난수 시드를 설정합니다.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// 내부 계정 상태.
#[derive(Debug)]
struct PaperState {
    /// 자산별 잔고
    balances: HashMap<String, Decimal>,
    /// 심볼별 마지막 가격
    last_prices: HashMap<String, Decimal>,
    /// 거래 기록 (오래된 순)
    trades: Vec<TradeRecord>,
    /// 난수 생성기
    rng: StdRng,
}

impl PaperState {
    fn new(config: &PaperConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            balances: config
                .initial_balances
                .iter()
                .map(|(asset, amount)| (asset.to_uppercase(), *amount))
                .collect(),
            last_prices: HashMap::new(),
            trades: Vec::new(),
            rng,
        }
    }

    fn balance(&self, asset: &str) -> Decimal {
        self.balances.get(asset).copied().unwrap_or_default()
    }

    fn adjust(&mut self, asset: &str, delta: Decimal) {
        *self.balances.entry(asset.to_string()).or_default() += delta;
    }
}

/// 모의 트레이딩 엔진.
///
/// 가격은 심볼별 무작위 보행으로 움직이며, 주문은 마지막 가격에 즉시 체결됩니다.
pub struct PaperEngine {
    config: PaperConfig,
    state: Arc<RwLock<PaperState>>,
}

impl PaperEngine {
    /// 새 모의 엔진을 생성합니다.
    pub fn new(config: PaperConfig) -> Self {
        let state = PaperState::new(&config);
        Self {
            config,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// 심볼의 마지막 가격.
    pub async fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.state.read().await.last_prices.get(symbol).copied()
    }

    fn split_symbol(symbol: &str) -> Result<(String, String), EngineError> {
        let mut parts = symbol.split(['-', '/']);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok((base.to_uppercase(), quote.to_uppercase()))
            }
            _ => Err(EngineError::InvalidData(format!(
                "symbol must look like BASE-QUOTE: {}",
                symbol
            ))),
        }
    }

    fn signal_from(row: &IndicatorRow) -> (&'static str, Decimal, String) {
        let close = row.candle.close;
        let rsi = row.indicator("rsi_14");
        let sma_fast = row.indicator("sma_20");
        let sma_slow = row.indicator("sma_50");

        match (rsi, sma_fast, sma_slow) {
            (Some(rsi), _, _) if rsi < dec!(30) => (
                "BUY",
                dec!(0.7),
                format!("RSI {} is oversold", rsi.round_dp(2)),
            ),
            (Some(rsi), _, _) if rsi > dec!(70) => (
                "SELL",
                dec!(0.7),
                format!("RSI {} is overbought", rsi.round_dp(2)),
            ),
            (_, Some(fast), Some(slow)) if fast > slow && close > fast => (
                "BUY",
                dec!(0.55),
                "price above rising short-term average".to_string(),
            ),
            (_, Some(fast), Some(slow)) if fast < slow && close < fast => (
                "SELL",
                dec!(0.55),
                "price below falling short-term average".to_string(),
            ),
            _ => ("HOLD", dec!(0.5), "no clear trend".to_string()),
        }
    }
}

#[async_trait]
impl TradingEngine for PaperEngine {
    fn name(&self) -> &str {
        "paper"
    }

    async fn fetch_market_data(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Vec<Candle>, EngineError> {
        Self::split_symbol(symbol)?;

        let mut state = self.state.write().await;
        let start = state
            .last_prices
            .get(symbol)
            .copied()
            .unwrap_or(self.config.start_price);
        let candles = generate_candles(
            &mut state.rng,
            granularity,
            self.config.candle_count,
            start,
            self.config.volatility,
        );

        let last = candles
            .last()
            .map(|c| c.close)
            .ok_or_else(|| EngineError::NoData(format!("no candles for {}", symbol)))?;
        state.last_prices.insert(symbol.to_string(), last);

        debug!(symbol, %granularity, count = candles.len(), last = %last, "Generated paper candles");
        Ok(candles)
    }

    async fn calculate_technical_indicators(
        &self,
        candles: &[Candle],
    ) -> Result<Vec<IndicatorRow>, EngineError> {
        if candles.is_empty() {
            return Err(EngineError::NoData("no candles to analyze".to_string()));
        }

        let close: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let high: Vec<Decimal> = candles.iter().map(|c| c.high).collect();
        let low: Vec<Decimal> = candles.iter().map(|c| c.low).collect();

        let columns = [
            ("sma_20", indicators::sma(&close, 20)),
            ("sma_50", indicators::sma(&close, 50)),
            ("rsi_14", indicators::rsi(&close, 14)),
            ("atr_14", indicators::atr(&high, &low, &close, 14)),
        ];

        Ok(candles
            .iter()
            .enumerate()
            .map(|(i, candle)| {
                let mut row = IndicatorRow::from_candle(candle.clone());
                for (name, values) in &columns {
                    row.indicators
                        .insert(name.to_string(), values.get(i).copied().flatten());
                }
                row
            })
            .collect())
    }

    async fn analyze_with_ai(
        &self,
        symbol: &str,
        rows: &[IndicatorRow],
    ) -> Result<serde_json::Value, EngineError> {
        let last = rows
            .last()
            .ok_or_else(|| EngineError::NoData(format!("no indicator rows for {}", symbol)))?;
        let (signal, confidence, reasoning) = Self::signal_from(last);

        Ok(json!({
            "symbol": symbol,
            "signal": signal,
            "confidence": confidence,
            "reasoning": reasoning,
            "price": last.candle.close,
            "indicators": last.indicators,
            "model": "paper-heuristic",
        }))
    }

    async fn fetch_account_balance(&self) -> Result<BTreeMap<String, AssetBalance>, EngineError> {
        let state = self.state.read().await;
        Ok(state
            .balances
            .iter()
            .map(|(asset, amount)| (asset.clone(), AssetBalance::new(*amount, Decimal::ZERO)))
            .collect())
    }

    async fn execute_trade(&self, order: &TradeOrder) -> Result<ExecutionOutcome, EngineError> {
        let (base, quote) = Self::split_symbol(&order.symbol)?;
        if order.amount <= Decimal::ZERO {
            return Ok(ExecutionOutcome::Rejected {
                message: format!("amount must be positive: {}", order.amount),
                kind: "INVALID_SIZE".to_string(),
            });
        }

        let mut state = self.state.write().await;
        let price = state
            .last_prices
            .get(&order.symbol)
            .copied()
            .unwrap_or(self.config.start_price);
        let fee_factor = Decimal::ONE - self.config.fee_rate;

        match order.side {
            Side::Buy => {
                if state.balance(&quote) < order.amount {
                    return Ok(ExecutionOutcome::Rejected {
                        message: format!("insufficient {} balance", quote),
                        kind: "INSUFFICIENT_FUND".to_string(),
                    });
                }
                let filled = (order.amount * fee_factor / price).round_dp(8);
                state.adjust(&quote, -order.amount);
                state.adjust(&base, filled);
            }
            Side::Sell => {
                if state.balance(&base) < order.amount {
                    return Ok(ExecutionOutcome::Rejected {
                        message: format!("insufficient {} balance", base),
                        kind: "INSUFFICIENT_FUND".to_string(),
                    });
                }
                let proceeds = (order.amount * price * fee_factor).round_dp(8);
                state.adjust(&base, -order.amount);
                state.adjust(&quote, proceeds);
            }
        }

        let order_id = Uuid::new_v4().to_string();
        info!(
            order_id = %order_id,
            symbol = %order.symbol,
            side = %order.side,
            amount = %order.amount,
            price = %price,
            "Paper order filled"
        );

        Ok(ExecutionOutcome::Filled { order_id })
    }

    async fn get_trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>, EngineError> {
        let state = self.state.read().await;
        let skip = state.trades.len().saturating_sub(limit);
        Ok(state.trades[skip..].to_vec())
    }

    async fn log_trade(&self, trade: TradeRecord) -> Result<(), EngineError> {
        self.state.write().await.trades.push(trade);
        Ok(())
    }

    async fn run_strategy(&self, symbol: &str) -> Result<serde_json::Value, EngineError> {
        let candles = self
            .fetch_market_data(symbol, Granularity::OneHour)
            .await?;
        let rows = self.calculate_technical_indicators(&candles).await?;
        let analysis = self.analyze_with_ai(symbol, &rows).await?;

        info!(symbol, signal = %analysis["signal"], "Paper strategy evaluated");
        Ok(json!({
            "symbol": symbol,
            "analysis": analysis,
            "executed": false,
        }))
    }
}
