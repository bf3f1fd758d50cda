//! 성과 및 손익 집계.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 종료 거래 기반 성과 요약 (승률, 평균 손익, 최대 손익)
//! - 거래 이력과 오픈 포지션을 합친 총 손익 요약
//! - 거래 이력의 진입/청산 짝짓기
//! - 모의 엔진용 기본 기술적 지표
//!
//! # Re-exports
//!
//! - [`performance`]: `PerformanceSummary`, `ProfitSummary`, `pair_round_trips`
//! - [`indicators`]: SMA, RSI, ATR

pub mod indicators;
pub mod performance;

pub use performance::profit::ProfitSummary;
pub use performance::summary::{pair_round_trips, PerformanceSummary};
