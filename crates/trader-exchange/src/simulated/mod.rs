//! 모의 트레이딩 엔진.
//!
//! 실제 거래소나 AI 서비스 없이 서버 전체 흐름을 실행하기 위한 엔진입니다.

mod candles;
mod engine;

pub use candles::generate_candles;
pub use engine::{PaperConfig, PaperEngine};
