//! AI 분석 endpoint.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::response::ApiEnvelope;
use crate::error::{into_api_error, ApiResult};
use crate::services::AnalysisCacheEntry;
use crate::state::AppState;

/// 심볼 분석 결과를 조회합니다.
///
/// 캐시가 신선하면 엔진을 호출하지 않고, 같은 심볼의 분석이 진행 중이면
/// 429 `ANALYSIS_IN_PROGRESS`로 즉시 거절합니다.
/// GET /api/analysis/{symbol}
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<ApiEnvelope<AnalysisCacheEntry>>> {
    let engine = state.require_engine().await?;
    let entry = state
        .analysis
        .get_analysis(&symbol, engine.as_ref())
        .await
        .map_err(into_api_error)?;

    Ok(Json(ApiEnvelope::success(entry)))
}

/// 분석 라우터 생성.
pub fn analysis_router() -> Router<Arc<AppState>> {
    Router::new().route("/analysis/{symbol}", get(get_analysis))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_json, create_configured_state, send, MockEngine};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_analysis_is_cached() {
        let engine = Arc::new(MockEngine::new(dec!(100)));
        let (state, _dir) = create_configured_state(engine.clone()).await;

        let first = send(&state, "GET", "/api/analysis/BTC-USD", None).await;
        assert_eq!(first.status(), StatusCode::OK);
        let body = body_json(first).await;
        assert_eq!(body["data"]["symbol"], "BTC-USD");
        assert_eq!(body["data"]["result"]["signal"], "BUY");

        let second = send(&state, "GET", "/api/analysis/BTC-USD", None).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(engine.analysis_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_analysis_conflict() {
        let engine = Arc::new(MockEngine::new(dec!(100)).gated());
        let (state, _dir) = create_configured_state(engine.clone()).await;

        let first = {
            let state = state.clone();
            tokio::spawn(async move { send(&state, "GET", "/api/analysis/BTC-USD", None).await })
        };
        engine.wait_until_analysis_started().await;

        let second = send(&state, "GET", "/api/analysis/BTC-USD", None).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(second).await["code"], "ANALYSIS_IN_PROGRESS");

        engine.release_analysis();
        assert_eq!(first.await.unwrap().status(), StatusCode::OK);
        assert_eq!(engine.analysis_calls(), 1);
    }

    #[tokio::test]
    async fn test_analysis_without_data() {
        let engine = Arc::new(MockEngine::new(dec!(100)).with_empty_market_data());
        let (state, _dir) = create_configured_state(engine).await;

        let response = send(&state, "GET", "/api/analysis/BTC-USD", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!state.analysis.is_in_progress("BTC-USD"));
    }
}
