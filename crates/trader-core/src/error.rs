//! 트레이딩 서버의 에러 타입.
//!
//! 이 모듈은 포지션 저장소, 손익 집계, 분석 요청 병합 등에서
//! 공통으로 사용되는 에러 타입을 정의합니다.

use thiserror::Error;

use crate::domain::EngineError;

/// 핵심 트레이딩 에러.
#[derive(Debug, Error)]
pub enum TraderError {
    /// 찾을 수 없음 (알 수 없는 포지션 ID 등)
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 동일 심볼에 대한 분석이 이미 진행 중
    #[error("요청 충돌: {0}")]
    Conflict(String),

    /// 외부 호출 시간 초과
    #[error("시간 초과: {0}")]
    Timeout(String),

    /// 외부 엔진이 비어 있거나 잘못된 데이터를 반환
    #[error("데이터 없음: {0}")]
    DataUnavailable(String),

    /// 저장소 읽기/쓰기 실패
    #[error("저장 에러: {0}")]
    Persistence(String),

    /// 잘못된 입력 (0 또는 음수 가격/수량 등)
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 트레이딩 엔진 에러
    #[error("엔진 에러: {0}")]
    Engine(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 트레이딩 작업을 위한 Result 타입.
pub type TraderResult<T> = Result<T, TraderError>;

impl TraderError {
    /// 잠시 후 같은 요청을 다시 보내면 성공할 수 있는 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TraderError::Conflict(_) | TraderError::Timeout(_) | TraderError::DataUnavailable(_)
        )
    }

    /// 호출자의 입력에 원인이 있는 에러인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TraderError::NotFound(_) | TraderError::InvalidInput(_) | TraderError::Config(_)
        )
    }
}

impl From<serde_json::Error> for TraderError {
    fn from(err: serde_json::Error) -> Self {
        TraderError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for TraderError {
    fn from(err: std::io::Error) -> Self {
        TraderError::Persistence(err.to_string())
    }
}

impl From<config::ConfigError> for TraderError {
    fn from(err: config::ConfigError) -> Self {
        TraderError::Config(err.to_string())
    }
}

impl From<EngineError> for TraderError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NoData(msg) | EngineError::InvalidData(msg) => {
                TraderError::DataUnavailable(msg)
            }
            EngineError::Timeout(msg) => TraderError::Timeout(msg),
            other => TraderError::Engine(other.to_string()),
        }
    }
}
