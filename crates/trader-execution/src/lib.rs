//! 오픈 포지션 관리.
//!
//! 이 crate는 다음을 제공합니다:
//! - 포지션 ID를 키로 하는 파일 기반 포지션 저장소
//! - 생성, 부분 업데이트(손절/익절/수량), 삭제
//! - 변경 이벤트 브로드캐스트
//!
//! # 예제
//!
//! ```rust,no_run
//! use trader_core::NewPosition;
//! use trader_execution::PositionStore;
//! use rust_decimal_macros::dec;
//!
//! let store = PositionStore::open("data/positions.json");
//! let id = store.add(NewPosition::new(dec!(43000), dec!(0.01))).unwrap();
//! store.update_stop_loss(&id, dec!(41000)).unwrap();
//! ```

pub mod position_store;

// 주요 타입 재내보내기
pub use position_store::{CloseClaim, PositionEvent, PositionStore};
