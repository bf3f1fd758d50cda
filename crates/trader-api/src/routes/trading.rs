//! 수동 주문, 거래 이력, 전략 실행 endpoint.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};
use trader_core::{
    position_risk_pct, require_positive, DecimalExt, ExecutionOutcome, NewPosition, OrderType,
    Side, TradeOrder, TradeRecord, TraderError, TradingEngine,
};

use super::response::ApiEnvelope;
use crate::error::{into_api_error, ApiErrorResponse, ApiResult};
use crate::metrics::record_order;
use crate::services::current_price;
use crate::state::AppState;
use crate::tasks::run_strategy_once;
use crate::websocket::ServerMessage;

/// 수동 주문 요청.
#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    /// 주문 방향
    pub action: Side,
    /// 매수: 호가 통화 금액, 매도: 기준 통화 수량
    pub amount: Decimal,
    /// 주문 유형
    #[serde(default)]
    pub order_type: OrderType,
    /// 심볼 (기본: 설정의 기본 심볼)
    #[serde(default)]
    pub symbol: Option<String>,
}

/// 거래 이력 쿼리.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    10
}

/// 주문을 실행하고 체결된 주문 ID를 반환합니다.
///
/// 거절된 주문은 502 `ORDER_REJECTED`로 변환됩니다.
pub(crate) async fn submit_order(
    engine: &dyn TradingEngine,
    order: &TradeOrder,
) -> ApiResult<String> {
    let side = order.side.to_string();
    let outcome = engine
        .execute_trade(order)
        .await
        .map_err(|e| {
            record_order(&side, "error");
            into_api_error(e.into())
        })?;

    match outcome {
        ExecutionOutcome::Filled { order_id } => {
            record_order(&side, "filled");
            info!(
                symbol = %order.symbol,
                side = %order.side,
                amount = %order.amount,
                order_id = %order_id,
                "Order filled"
            );
            Ok(order_id)
        }
        ExecutionOutcome::Rejected { message, kind } => {
            record_order(&side, "rejected");
            info!(symbol = %order.symbol, side = %order.side, kind = %kind, "Order rejected");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ApiErrorResponse::with_details(
                    "ORDER_REJECTED",
                    message,
                    json!({ "type": kind }),
                )),
            ))
        }
    }
}

/// 거래를 엔진 이력에 남기고 WebSocket으로 알립니다.
///
/// 주문은 이미 체결되었으므로 기록 실패는 로그만 남깁니다.
pub(crate) async fn record_trade(state: &AppState, engine: &dyn TradingEngine, trade: TradeRecord) {
    if let Err(e) = engine.log_trade(trade.clone()).await {
        error!(
            order_id = ?trade.order_id,
            position_id = ?trade.position_id,
            error = %e,
            "Failed to log trade after execution"
        );
        return;
    }
    state.publish(ServerMessage::Trade(trade));
}

/// 수동 주문을 실행합니다.
///
/// 매수가 체결되면 설정의 기본 손절/익절 파라미터로 포지션을 만듭니다.
/// 포지션 수량은 수수료를 빼지 않은 `금액 / 현재가`이므로 엔진이 실제로
/// 적립한 수량보다 조금 클 수 있습니다. 이 경우 나중의 전량 청산 주문이
/// 잔고 부족으로 거절될 수 있습니다.
/// POST /api/execute-trade
pub async fn execute_trade(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TradeRequest>,
) -> ApiResult<Json<ApiEnvelope<Value>>> {
    let engine = state.require_engine().await?;
    require_positive("amount", request.amount).map_err(into_api_error)?;
    if request.order_type != OrderType::Market {
        return Err(into_api_error(TraderError::InvalidInput(
            "only market orders are supported".to_string(),
        )));
    }

    let symbol = request
        .symbol
        .unwrap_or_else(|| state.default_symbol().to_string());
    let granularity = state.config.analysis.default_granularity;
    let timeout = state.config.analysis.market_data_timeout();

    // 체결 전에 가격을 확보해 실패 시 부작용이 없게 합니다.
    let price = current_price(engine.as_ref(), &symbol, granularity, timeout)
        .await
        .map_err(into_api_error)?;

    let order = TradeOrder::market(&symbol, request.action, request.amount);
    let order_id = submit_order(engine.as_ref(), &order).await?;

    match request.action {
        Side::Buy => {
            let size = request
                .amount
                .checked_ratio(price)
                .ok_or_else(|| into_api_error(TraderError::DataUnavailable(format!(
                    "cannot size position at price {}",
                    price
                ))))?;

            let defaults = &state.config.trading;
            let stop_loss = defaults.stop_loss_for(price);
            let new_position = NewPosition::new(price, size)
                .with_stop_loss(stop_loss)
                .with_take_profit(defaults.take_profit_for(price))
                .with_trailing_stop_pct(defaults.trailing_stop_pct)
                .with_dynamic_stop_loss(defaults.dynamic_stop_loss, defaults.atr_multiplier);
            let position_id = state
                .with_positions(move |store| store.add(new_position))
                .await
                .map_err(into_api_error)?;

            let trade = TradeRecord::buy(&position_id, price, size)
                .with_order_id(&order_id)
                .with_symbol(&symbol)
                .with_reason("manual");
            record_trade(&state, engine.as_ref(), trade).await;

            Ok(Json(ApiEnvelope::with_message(
                "Trade executed successfully",
                json!({
                    "order_id": order_id,
                    "position_id": position_id,
                    "risk_pct": position_risk_pct(price, Some(stop_loss)),
                }),
            )))
        }
        Side::Sell => {
            let trade = TradeRecord::sell(Some("manual_sell".to_string()), price, request.amount, None)
                .with_order_id(&order_id)
                .with_symbol(&symbol)
                .with_reason("manual");
            record_trade(&state, engine.as_ref(), trade).await;

            Ok(Json(ApiEnvelope::with_message(
                "Trade executed successfully",
                json!({ "order_id": order_id }),
            )))
        }
    }
}

/// 최근 거래 이력을 조회합니다.
///
/// GET /api/trade-history
pub async fn get_trade_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiEnvelope<Vec<TradeRecord>>>> {
    let engine = state.require_engine().await?;
    let history = engine
        .get_trade_history(query.limit)
        .await
        .map_err(|e| into_api_error(e.into()))?;

    Ok(Json(ApiEnvelope::success(history)))
}

/// 전략 실행을 백그라운드로 시작하고 즉시 응답합니다.
///
/// 결과는 WebSocket `strategy` 이벤트로 전달됩니다.
/// POST /api/run-strategy
pub async fn run_strategy(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiEnvelope<Value>>> {
    state.require_engine().await?;

    let symbol = state.default_symbol().to_string();
    let task_state = state.clone();
    tokio::spawn(async move {
        run_strategy_once(&task_state, "manual").await;
    });

    Ok(Json(ApiEnvelope::with_message(
        "Strategy execution started",
        json!({ "symbol": symbol }),
    )))
}

/// 주문 라우터 생성.
pub fn trading_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/execute-trade", post(execute_trade))
        .route("/trade-history", get(get_trade_history))
        .route("/run-strategy", post(run_strategy))
}
