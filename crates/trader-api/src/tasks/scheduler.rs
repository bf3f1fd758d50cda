//! 전략 실행 스케줄러.
//!
//! 서버 실행 중 주기적으로 기본 심볼의 전략을 실행합니다.
//! - 엔진이 설정되지 않았으면 해당 주기는 건너뜁니다
//! - 결과는 WebSocket `strategy` 이벤트로 브로드캐스트됩니다

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use trader_core::SchedulerConfig;

use crate::metrics::record_strategy_run;
use crate::state::AppState;
use crate::websocket::ServerMessage;

/// 전략 스케줄러 설정.
#[derive(Debug, Clone)]
pub struct StrategySchedulerConfig {
    /// 실행 주기 (기본: 1시간)
    pub run_interval: Duration,
    /// 서버 시작 후 첫 실행까지 대기 (기본: 10초)
    pub initial_delay: Duration,
}

impl Default for StrategySchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for StrategySchedulerConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            run_interval: Duration::from_secs(config.interval_secs.max(1)),
            initial_delay: Duration::from_secs(config.initial_delay_secs),
        }
    }
}

/// 전략을 한 번 실행하고 결과를 브로드캐스트합니다.
///
/// 엔진이 없으면 아무것도 하지 않고 `false`를 반환합니다.
pub async fn run_strategy_once(state: &AppState, trigger: &'static str) -> bool {
    let Some(engine) = state.engine().await else {
        debug!(trigger, "Engine not configured, skipping strategy run");
        return false;
    };

    let symbol = state.default_symbol().to_string();
    let started = std::time::Instant::now();
    let (success, result) = match engine.run_strategy(&symbol).await {
        Ok(result) => {
            info!(
                trigger,
                symbol = %symbol,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Strategy run completed"
            );
            (true, result)
        }
        Err(e) => {
            error!(trigger, symbol = %symbol, error = %e, "Strategy run failed");
            (false, json!({ "error": e.to_string() }))
        }
    };

    record_strategy_run(trigger, success);
    state.publish(ServerMessage::Strategy {
        symbol,
        trigger: trigger.to_string(),
        success,
        result,
        timestamp: Utc::now().timestamp_millis(),
    });
    success
}

/// 전략 스케줄러 시작.
///
/// 초기 대기 후 한 번 실행하고, 이후 `run_interval`마다 실행합니다.
/// `shutdown_token`이 취소되면 종료합니다.
pub fn start_strategy_scheduler(
    state: Arc<AppState>,
    config: StrategySchedulerConfig,
    shutdown_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = config.run_interval.as_secs(),
            initial_delay_secs = config.initial_delay.as_secs(),
            "Strategy scheduler started"
        );

        // 서버 초기화 완료 후 시작
        tokio::select! {
            _ = tokio::time::sleep(config.initial_delay) => {}
            _ = shutdown_token.cancelled() => {
                info!("Strategy scheduler cancelled before first run");
                return;
            }
        }

        run_strategy_once(&state, "scheduled").await;

        let mut run_interval = interval(config.run_interval);
        run_interval.tick().await; // 첫 tick 건너뛰기 (이미 위에서 실행함)

        loop {
            tokio::select! {
                _ = run_interval.tick() => {
                    run_strategy_once(&state, "scheduled").await;
                }
                _ = shutdown_token.cancelled() => {
                    info!("Strategy scheduler received shutdown signal");
                    break;
                }
            }
        }

        info!("Strategy scheduler stopped");
    })
}
