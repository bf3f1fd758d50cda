//! 성과 통계 및 손익 요약 endpoint.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use trader_analytics::{pair_round_trips, PerformanceSummary, ProfitSummary};

use super::response::ApiEnvelope;
use crate::error::{into_api_error, ApiResult};
use crate::services::current_price;
use crate::state::AppState;

fn default_limit() -> usize {
    100
}

/// 성과 통계 쿼리.
#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    /// 집계할 최근 거래 수
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// 손익 요약 쿼리.
#[derive(Debug, Deserialize)]
pub struct ProfitSummaryQuery {
    /// 현재가를 조회할 심볼 (기본: 설정의 기본 심볼)
    pub symbol: Option<String>,
    /// 집계할 최근 거래 수
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// 매수/매도 쌍으로 묶은 거래의 승률과 손익 통계.
///
/// GET /api/performance
pub async fn get_performance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<Json<ApiEnvelope<PerformanceSummary>>> {
    let engine = state.require_engine().await?;
    let history = engine
        .get_trade_history(query.limit)
        .await
        .map_err(|e| into_api_error(e.into()))?;

    let round_trips = pair_round_trips(&history);
    debug!(
        records = history.len(),
        round_trips = round_trips.len(),
        "Computing performance summary"
    );

    Ok(Json(ApiEnvelope::success(PerformanceSummary::from_trades(
        &round_trips,
    ))))
}

/// 실현/미실현 손익 요약.
///
/// 미실현 손익은 오픈 포지션과 심볼의 마지막 종가로 계산합니다. 거래 이력을
/// 가져오지 못하면 빈 이력으로 계산하여 미실현 부분만 반환합니다. 현재가나
/// 포지션을 읽지 못하면 실패합니다.
/// GET /api/profit-summary
pub async fn get_profit_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfitSummaryQuery>,
) -> ApiResult<Json<ApiEnvelope<ProfitSummary>>> {
    let engine = state.require_engine().await?;
    let symbol = query
        .symbol
        .unwrap_or_else(|| state.default_symbol().to_string());
    let timeout = state.config.analysis.market_data_timeout();

    let history = match tokio::time::timeout(timeout, engine.get_trade_history(query.limit)).await
    {
        Ok(Ok(history)) => Some(history),
        Ok(Err(e)) => {
            warn!(error = %e, "Trade history unavailable, profit summary is partial");
            None
        }
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "Trade history timed out, profit summary is partial"
            );
            None
        }
    };
    let price = current_price(
        engine.as_ref(),
        &symbol,
        state.config.analysis.default_granularity,
        timeout,
    )
    .await
    .map_err(into_api_error)?;

    let positions = state
        .with_positions(|store| Ok(store.snapshot()))
        .await
        .map_err(into_api_error)?;
    let summary = ProfitSummary::compute(history.as_deref().unwrap_or_default(), &positions, price)
        .map_err(into_api_error)?;

    let envelope = match history {
        Some(_) => ApiEnvelope::success(summary),
        None => ApiEnvelope::with_message(
            "Trade history unavailable, realized profit not included",
            summary,
        ),
    };
    Ok(Json(envelope))
}

/// 성과 라우터 생성.
pub fn performance_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performance", get(get_performance))
        .route("/profit-summary", get(get_profit_summary))
}
