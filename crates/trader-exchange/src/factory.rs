//! 트레이딩 엔진 팩토리.
//!
//! 서버는 자격 증명이 설정되는 시점에 팩토리로 엔진을 생성합니다.
//! 실제 거래소 연동은 이 trait을 구현해 주입합니다.

use std::sync::Arc;

use tracing::info;
use trader_core::{EngineCredentials, TraderResult, TradingEngine};

use crate::retry::{LoggingEngine, RetryPolicy};
use crate::simulated::{PaperConfig, PaperEngine};

/// 자격 증명으로 엔진을 만드는 팩토리.
pub trait EngineFactory: Send + Sync {
    /// 새 엔진 인스턴스를 생성합니다.
    fn create(&self, credentials: &EngineCredentials) -> TraderResult<Arc<dyn TradingEngine>>;
}

/// 모의 엔진 팩토리.
#[derive(Debug, Clone, Default)]
pub struct PaperEngineFactory {
    config: PaperConfig,
    policy: RetryPolicy,
}

impl PaperEngineFactory {
    /// 새 팩토리를 생성합니다.
    pub fn new(config: PaperConfig, policy: RetryPolicy) -> Self {
        Self { config, policy }
    }
}

impl EngineFactory for PaperEngineFactory {
    fn create(&self, credentials: &EngineCredentials) -> TraderResult<Arc<dyn TradingEngine>> {
        info!(
            api_key = %credentials.masked_api_key(),
            "Creating paper trading engine"
        );
        let engine: Arc<dyn TradingEngine> = Arc::new(PaperEngine::new(self.config.clone()));
        Ok(Arc::new(LoggingEngine::new(engine, self.policy.clone())))
    }
}
