//! 요청 핸들러가 공유하는 서비스 모듈.
//!
//! - 분석 요청 병합: 심볼별 진행 중 플래그와 시간 제한 캐시
//! - 시세 조회: 타임아웃이 걸린 현재가 조회

pub mod analysis;
pub mod market;

pub use analysis::{AnalysisCacheEntry, AnalysisCoalescer, CoalescerConfig};
pub use market::{current_price, fetch_candles};
