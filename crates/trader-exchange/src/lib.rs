//! 트레이딩 엔진 구현.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 모의(paper) 트레이딩 엔진: 난수 기반 캔들, 기본 지표, 휴리스틱 분석
//! - 재시도/로깅 래퍼: 임의의 엔진을 감싸 호출을 기록하고 일시적 오류를 재시도
//! - 엔진 팩토리: 자격증명으로 엔진 인스턴스를 생성

pub mod factory;
pub mod retry;
pub mod simulated;

pub use factory::{EngineFactory, PaperEngineFactory};
pub use retry::{LoggingEngine, RetryPolicy};
pub use simulated::{PaperConfig, PaperEngine};
