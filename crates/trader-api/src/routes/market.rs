//! 시장 데이터 및 계좌 잔고 endpoint.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use trader_core::{AssetBalance, Granularity, IndicatorRow, TraderError};

use super::response::ApiEnvelope;
use crate::error::{into_api_error, ApiResult};
use crate::services::fetch_candles;
use crate::state::AppState;

/// 시장 데이터 쿼리.
#[derive(Debug, Default, Deserialize)]
pub struct MarketDataQuery {
    /// 심볼 (기본: 설정의 기본 심볼)
    pub symbol: Option<String>,
    /// 캔들 간격 (예: ONE_HOUR)
    pub granularity: Option<String>,
}

/// 캔들과 기술적 지표를 조회합니다.
///
/// 계산 구간이 부족한 지표는 `null`로 반환됩니다.
/// GET /api/market-data
pub async fn get_market_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MarketDataQuery>,
) -> ApiResult<Json<ApiEnvelope<Vec<IndicatorRow>>>> {
    let engine = state.require_engine().await?;

    let granularity = match query.granularity.as_deref() {
        Some(raw) => raw
            .parse::<Granularity>()
            .map_err(|e| into_api_error(TraderError::InvalidInput(e)))?,
        None => Granularity::default(),
    };
    let symbol = query
        .symbol
        .unwrap_or_else(|| state.default_symbol().to_string());

    let candles = fetch_candles(
        engine.as_ref(),
        &symbol,
        granularity,
        state.config.analysis.market_data_timeout(),
    )
    .await
    .map_err(into_api_error)?;

    let rows = engine
        .calculate_technical_indicators(&candles)
        .await
        .map_err(|e| into_api_error(e.into()))?;

    Ok(Json(ApiEnvelope::success(rows)))
}

/// 자산별 계좌 잔고를 조회합니다.
///
/// GET /api/account-balance
pub async fn get_account_balance(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiEnvelope<BTreeMap<String, AssetBalance>>>> {
    let engine = state.require_engine().await?;
    let balances = engine
        .fetch_account_balance()
        .await
        .map_err(|e| into_api_error(e.into()))?;

    Ok(Json(ApiEnvelope::success(balances)))
}

/// 시장 라우터 생성.
pub fn market_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/market-data", get(get_market_data))
        .route("/account-balance", get(get_account_balance))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_json, create_configured_state, create_test_state, send, MockEngine};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_market_data_requires_engine() {
        let (state, _dir) = create_test_state(Arc::new(MockEngine::new(dec!(100))));
        let response = send(&state, "GET", "/api/market-data", None).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "ENGINE_NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_market_data_includes_null_indicators() {
        let (state, _dir) = create_configured_state(Arc::new(MockEngine::new(dec!(100)))).await;
        let response = send(
            &state,
            "GET",
            "/api/market-data?symbol=ETH-USD&granularity=ONE_HOUR",
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["indicators"]["sma_20"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_granularity_is_invalid() {
        let (state, _dir) = create_configured_state(Arc::new(MockEngine::new(dec!(100)))).await;
        let response = send(&state, "GET", "/api/market-data?granularity=WEEKLY", None).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_empty_market_data_is_unavailable() {
        let engine = Arc::new(MockEngine::new(dec!(100)).with_empty_market_data());
        let (state, _dir) = create_configured_state(engine).await;
        let response = send(&state, "GET", "/api/market-data", None).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_account_balance() {
        let (state, _dir) = create_configured_state(Arc::new(MockEngine::new(dec!(100)))).await;
        let response = send(&state, "GET", "/api/account-balance", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["USD"]["available"], "1000");
    }
}
