//! 공통 성공 응답 형식.

use serde::{Deserialize, Serialize};

/// 성공 응답 봉투.
///
/// ```json
/// {"status": "success", "message": "Position updated", "data": {...}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// 항상 "success"
    pub status: String,
    /// 사람이 읽을 수 있는 메시지
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 응답 데이터
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    /// 데이터만 담은 성공 응답.
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data,
        }
    }

    /// 메시지를 함께 담은 성공 응답.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}
