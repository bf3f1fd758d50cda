//! REST API 및 WebSocket 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (포지션, 주문, 손익 요약)
//! - 실시간 업데이트를 위한 WebSocket 서버
//! - 심볼별 AI 분석 요청 병합과 캐시
//! - 주기적 전략 실행 스케줄러
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`services`]: 분석 병합기와 시장 데이터 조회
//! - [`tasks`]: 백그라운드 전략 스케줄러
//! - [`websocket`]: 실시간 WebSocket 서버
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod tasks;
pub mod websocket;

#[cfg(test)]
mod test_support;

pub use error::{ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::{create_api_router, ApiEnvelope};
pub use state::AppState;
pub use tasks::{start_strategy_scheduler, StrategySchedulerConfig};
pub use websocket::{ClientMessage, ServerMessage, WsError};
