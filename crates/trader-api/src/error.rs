//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다. 서비스 계층의
//! `TraderError`는 [`into_api_error`]로 HTTP 상태 코드와 응답 본문으로 바뀝니다.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trader_core::TraderError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "POSITION_NOT_FOUND",
///   "message": "찾을 수 없음: position 3f2a...",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_INPUT", "ANALYSIS_IN_PROGRESS")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    /// 에러 코드 반환.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 에러 타입.
pub type ApiError = (StatusCode, Json<ApiErrorResponse>);

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

/// `TraderError`의 HTTP 상태 코드와 에러 코드.
pub fn status_and_code(err: &TraderError) -> (StatusCode, &'static str) {
    match err {
        TraderError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        TraderError::Conflict(_) => (StatusCode::TOO_MANY_REQUESTS, "ANALYSIS_IN_PROGRESS"),
        TraderError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        TraderError::DataUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "DATA_UNAVAILABLE"),
        TraderError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        TraderError::Config(_) => (StatusCode::BAD_REQUEST, "CONFIG_ERROR"),
        TraderError::Engine(_) => (StatusCode::BAD_GATEWAY, "ENGINE_ERROR"),
        TraderError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
        TraderError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR")
        }
        TraderError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

/// `TraderError`를 API 에러 응답으로 변환합니다.
///
/// 서버 측 에러는 `error!`, 클라이언트 측 에러는 `debug!`로 남깁니다.
pub fn into_api_error(err: TraderError) -> ApiError {
    let (status, code) = status_and_code(&err);
    if status.is_server_error() {
        tracing::error!(code, error = %err, "Request failed");
    } else {
        tracing::debug!(code, error = %err, "Request rejected");
    }
    (status, Json(ApiErrorResponse::new(code, err.to_string())))
}

/// 엔진이 아직 설정되지 않았을 때의 에러.
pub fn engine_not_configured() -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse::new(
            "ENGINE_NOT_CONFIGURED",
            "Trader is not initialized. Please configure API keys first.",
        )),
    )
}
