//! 엔진 자격증명 설정 endpoint.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use trader_core::EngineCredentials;

use super::response::ApiEnvelope;
use crate::error::{into_api_error, ApiResult};
use crate::state::AppState;

/// 자격증명 설정 요청.
///
/// 빠진 필드는 빈 문자열로 받아 검증 단계에서 `INVALID_INPUT`으로 거절합니다.
#[derive(Debug, Deserialize)]
pub struct ConfigureRequest {
    #[serde(default)]
    pub coinbase_api_key: String,
    #[serde(default)]
    pub coinbase_api_secret: String,
    #[serde(default, alias = "openai_api_key")]
    pub ai_api_key: String,
}

/// 자격증명을 저장하고 엔진을 생성합니다.
///
/// POST /api/configure
pub async fn configure(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfigureRequest>,
) -> ApiResult<Json<ApiEnvelope<Value>>> {
    let credentials = EngineCredentials::new(
        request.coinbase_api_key,
        request.coinbase_api_secret,
        request.ai_api_key,
    )
    .map_err(into_api_error)?;

    state
        .configure(&credentials)
        .await
        .map_err(into_api_error)?;

    let engine = state
        .engine()
        .await
        .map(|engine| engine.name().to_string());

    Ok(Json(ApiEnvelope::with_message(
        "API keys configured successfully",
        json!({ "engine": engine }),
    )))
}

/// 설정 라우터 생성.
pub fn configure_router() -> Router<Arc<AppState>> {
    Router::new().route("/configure", post(configure))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_json, create_test_state, send, MockEngine};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_configure_creates_engine() {
        let (state, _dir) = create_test_state(Arc::new(MockEngine::new(dec!(100))));

        let response = send(
            &state,
            "POST",
            "/api/configure",
            Some(json!({
                "coinbase_api_key": "key",
                "coinbase_api_secret": "line1\\nline2",
                "openai_api_key": "sk-test",
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["engine"], "mock");
        assert!(state.has_engine().await);

        let saved: serde_json::Value = serde_json::from_slice(
            &std::fs::read(&state.config.storage.credentials_file).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["coinbase_api_secret"], "line1\nline2");
    }

    #[tokio::test]
    async fn test_configure_rejects_missing_field() {
        let (state, _dir) = create_test_state(Arc::new(MockEngine::new(dec!(100))));

        let response = send(
            &state,
            "POST",
            "/api/configure",
            Some(json!({"coinbase_api_key": "key", "coinbase_api_secret": "secret"})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_INPUT");
        assert!(!state.has_engine().await);
        assert!(!state.config.storage.credentials_file.exists());
    }
}
