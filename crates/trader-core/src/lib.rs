//! # Trader Core
//!
//! 트레이딩 봇 서버의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 서버 전반에서 사용되는 기본 구성 요소를 제공합니다:
//! - 주문 방향, 포지션, 거래 기록
//! - 손익(PnL) 계산 함수
//! - 트레이딩 엔진 인터페이스
//! - 설정 관리 및 로깅 인프라
//! - JSON 파일 저장소 헬퍼와 자격증명

pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod types;

pub use self::config::*;
pub use credentials::EngineCredentials;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
