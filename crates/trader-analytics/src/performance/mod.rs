//! 성과 분석 모듈
//!
//! # 모듈 구성
//!
//! - [`summary`]: 종료 거래 집합의 성과 요약
//! - [`profit`]: 실현 + 미실현 총 손익 요약

pub mod profit;
pub mod summary;

pub use profit::ProfitSummary;
pub use summary::{pair_round_trips, PerformanceSummary};
