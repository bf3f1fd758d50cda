//! 포지션 조회, 수정, 청산 endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use trader_core::{Position, PositionUpdate, Side, TradeOrder, TradeRecord, TraderError};
use trader_execution::position_store::PositionMap;

use super::response::ApiEnvelope;
use super::trading::{record_trade, submit_order};
use crate::error::{into_api_error, ApiError, ApiErrorResponse, ApiResult};
use crate::metrics::set_open_positions;
use crate::services::current_price;
use crate::state::AppState;

/// 오픈 포지션 전체를 ID → 포지션 맵으로 조회합니다.
///
/// GET /api/positions
pub async fn list_positions(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiEnvelope<PositionMap>>> {
    let positions = state
        .with_positions(|store| Ok(store.load_all()))
        .await
        .map_err(into_api_error)?;
    set_open_positions(positions.len());
    Ok(Json(ApiEnvelope::success(positions)))
}

/// 손절가, 익절가, 수량 중 주어진 필드만 수정합니다.
///
/// PUT /api/position/{id}
pub async fn update_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<PositionUpdate>,
) -> ApiResult<Json<ApiEnvelope<Position>>> {
    let position = state
        .with_positions(move |store| store.update(&id, update))
        .await
        .map_err(into_api_error)?;
    Ok(Json(ApiEnvelope::with_message("Position updated", position)))
}

/// 같은 포지션의 청산이 이미 진행 중일 때의 에러.
fn already_closing(err: TraderError) -> ApiError {
    match err {
        TraderError::Conflict(message) => (
            StatusCode::CONFLICT,
            Json(ApiErrorResponse::new("POSITION_CLOSING", message)),
        ),
        other => into_api_error(other),
    }
}

/// 포지션 전량을 시장가로 매도하고 삭제합니다.
///
/// 매도 기록에는 현재가 기준 실현 손익이 남습니다. 청산 표시를 먼저 잡으므로
/// 같은 포지션에 대한 동시 요청 중 하나만 주문을 내고 나머지는 409를 받습니다.
/// DELETE /api/position/{id}
pub async fn close_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<Value>>> {
    let engine = state.require_engine().await?;
    let _claim = state.positions.begin_close(&id).map_err(already_closing)?;

    let lookup_id = id.clone();
    let position = state
        .with_positions(move |store| {
            store
                .get(&lookup_id)
                .ok_or_else(|| TraderError::NotFound(format!("position {}", lookup_id)))
        })
        .await
        .map_err(into_api_error)?;

    let symbol = state.default_symbol().to_string();
    let price = current_price(
        engine.as_ref(),
        &symbol,
        state.config.analysis.default_granularity,
        state.config.analysis.market_data_timeout(),
    )
    .await
    .map_err(into_api_error)?;

    let order = TradeOrder::market(&symbol, Side::Sell, position.size);
    let order_id = submit_order(engine.as_ref(), &order).await?;

    let remove_id = id.clone();
    let (closed, remaining) = state
        .with_positions(move |store| {
            let closed = store.remove(&remove_id)?;
            Ok((closed, store.len()))
        })
        .await
        .map_err(into_api_error)?;
    let profit = closed.unrealized_pnl(price);
    let profit_percentage = closed.return_pct(price).ok();
    set_open_positions(remaining);
    info!(
        position_id = %id,
        exit_price = %price,
        profit = %profit,
        "Position closed"
    );

    let trade = TradeRecord::sell(Some(id), price, closed.size, Some(profit))
        .with_order_id(&order_id)
        .with_symbol(&symbol)
        .with_reason("manual_close");
    record_trade(&state, engine.as_ref(), trade).await;

    Ok(Json(ApiEnvelope::with_message(
        "Position closed successfully",
        json!({
            "order_id": order_id,
            "profit_amount": profit,
            "profit_percentage": profit_percentage,
        }),
    )))
}

/// 포지션 라우터 생성.
pub fn positions_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/positions", get(list_positions))
        .route("/position/{id}", put(update_position).delete(close_position))
}
