//! WebSocket 메시지 타입.
//!
//! 클라이언트-서버 간 교환되는 메시지 정의.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trader_core::TradeRecord;
use trader_execution::PositionEvent;

/// WebSocket 에러.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("잘못된 메시지 형식: {0}")]
    InvalidMessage(String),
    #[error("직렬화 실패: {0}")]
    SerializationError(#[from] serde_json::Error),
}

// ==================== 클라이언트 → 서버 메시지 ====================

/// 클라이언트에서 서버로 보내는 메시지.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 핑 (연결 유지)
    Ping,
}

impl ClientMessage {
    /// JSON 문자열에서 파싱.
    pub fn from_json(json: &str) -> Result<Self, WsError> {
        serde_json::from_str(json).map_err(|e| WsError::InvalidMessage(e.to_string()))
    }
}

// ==================== 서버 → 클라이언트 메시지 ====================

/// 서버에서 클라이언트로 보내는 메시지.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 연결 직후 환영 메시지
    Welcome {
        /// 서버 버전
        version: String,
        /// 서버 타임스탬프 (ms)
        timestamp: i64,
    },
    /// 포지션 변경
    Position(PositionEvent),
    /// 새 거래 기록
    Trade(TradeRecord),
    /// 전략 실행 결과
    Strategy {
        /// 심볼
        symbol: String,
        /// 실행 트리거 (manual, scheduled)
        trigger: String,
        /// 성공 여부
        success: bool,
        /// 엔진 결과 또는 에러 메시지
        result: Value,
        /// 서버 타임스탬프 (ms)
        timestamp: i64,
    },
    /// 퐁 응답
    Pong {
        /// 서버 타임스탬프 (ms)
        timestamp: i64,
    },
    /// 에러
    Error {
        /// 에러 코드
        code: String,
        /// 에러 메시지
        message: String,
    },
}

impl ServerMessage {
    /// 에러 메시지 생성.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> Result<String, WsError> {
        Ok(serde_json::to_string(self)?)
    }
}
