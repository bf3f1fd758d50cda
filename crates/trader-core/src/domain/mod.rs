//! 포지션 추적과 손익 계산을 위한 도메인 모델.

mod calculations;
mod engine;
mod order;
mod position;
mod trade;

pub use calculations::*;
pub use engine::*;
pub use order::*;
pub use position::*;
pub use trade::*;
