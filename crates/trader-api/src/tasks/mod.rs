//! 백그라운드 태스크 모듈.
//!
//! 서버 실행 중 주기적으로 실행되는 백그라운드 작업을 정의합니다.
//! - 전략 스케줄러: 기본 심볼의 전략을 일정 주기로 실행

pub mod scheduler;

pub use scheduler::{run_strategy_once, start_strategy_scheduler, StrategySchedulerConfig};
