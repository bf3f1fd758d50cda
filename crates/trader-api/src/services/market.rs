//! 타임아웃이 걸린 시장 데이터 조회.

use std::time::Duration;

use rust_decimal::Decimal;
use trader_core::{last_close, Candle, Granularity, Price, TraderError, TraderResult, TradingEngine};

/// 캔들을 조회합니다.
///
/// 제한 시간을 넘기면 `Timeout`, 빈 응답이면 `DataUnavailable`을 반환합니다.
pub async fn fetch_candles(
    engine: &dyn TradingEngine,
    symbol: &str,
    granularity: Granularity,
    limit: Duration,
) -> TraderResult<Vec<Candle>> {
    let candles = tokio::time::timeout(limit, engine.fetch_market_data(symbol, granularity))
        .await
        .map_err(|_| {
            TraderError::Timeout(format!(
                "market data for {} exceeded {}s",
                symbol,
                limit.as_secs()
            ))
        })??;

    if candles.is_empty() {
        return Err(TraderError::DataUnavailable(format!(
            "engine returned no candles for {}",
            symbol
        )));
    }
    Ok(candles)
}

/// 마지막 종가를 현재가로 조회합니다.
pub async fn current_price(
    engine: &dyn TradingEngine,
    symbol: &str,
    granularity: Granularity,
    limit: Duration,
) -> TraderResult<Price> {
    let candles = fetch_candles(engine, symbol, granularity, limit).await?;
    last_close(&candles)
        .filter(|price| *price > Decimal::ZERO)
        .ok_or_else(|| TraderError::DataUnavailable(format!("no valid close price for {}", symbol)))
}
