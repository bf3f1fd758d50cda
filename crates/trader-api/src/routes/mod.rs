//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크
//! - `/api/configure` - 엔진 자격증명 설정
//! - `/api/market-data`, `/api/account-balance` - 시장 데이터와 잔고
//! - `/api/positions`, `/api/position/{id}` - 포지션 조회/수정/청산
//! - `/api/execute-trade`, `/api/trade-history`, `/api/run-strategy` - 주문과 전략
//! - `/api/analysis/{symbol}` - 병합된 AI 분석
//! - `/api/performance`, `/api/profit-summary` - 성과 통계와 손익 요약
//! - `/ws` - 실시간 이벤트 WebSocket

pub mod analysis;
pub mod configure;
pub mod health;
pub mod market;
pub mod performance;
pub mod positions;
pub mod response;
pub mod trading;

pub use analysis::analysis_router;
pub use configure::{configure_router, ConfigureRequest};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use market::{market_router, MarketDataQuery};
pub use performance::{performance_router, PerformanceQuery, ProfitSummaryQuery};
pub use positions::positions_router;
pub use response::ApiEnvelope;
pub use trading::{trading_router, HistoryQuery, TradeRequest};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;
use crate::websocket::websocket_router;

/// 전체 API 라우터 생성.
///
/// 모든 서브 라우터를 조합하여 하나의 라우터로 반환합니다.
pub fn create_api_router() -> Router<Arc<AppState>> {
    let api = Router::new()
        .merge(configure_router())
        .merge(market_router())
        .merge(positions_router())
        .merge(trading_router())
        .merge(analysis_router())
        .merge(performance_router());

    Router::new()
        // 헬스 체크 엔드포인트
        .merge(health_router())
        .nest("/api", api)
        // WebSocket 엔드포인트
        .merge(websocket_router())
}

#[cfg(test)]
mod tests {
    use crate::test_support::{create_test_state, send, MockEngine};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (state, _dir) = create_test_state(Arc::new(MockEngine::new(dec!(100))));
        let response = send(&state, "GET", "/api/unknown", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_engine_routes_require_configuration() {
        let (state, _dir) = create_test_state(Arc::new(MockEngine::new(dec!(100))));

        for (method, uri) in [
            ("GET", "/api/account-balance"),
            ("GET", "/api/analysis/BTC-USD"),
            ("GET", "/api/performance"),
            ("GET", "/api/profit-summary"),
            ("DELETE", "/api/position/p1"),
        ] {
            let response = send(&state, method, uri, None).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
        }
    }
}
