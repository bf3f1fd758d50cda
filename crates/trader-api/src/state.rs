//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 모든 API 핸들러에서 공유되는 상태를 관리합니다.
//! Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use trader_core::{AppConfig, EngineCredentials, TraderError, TraderResult, TradingEngine};
use trader_exchange::EngineFactory;
use trader_execution::PositionStore;

use crate::error::{engine_not_configured, ApiResult};
use crate::services::{AnalysisCoalescer, CoalescerConfig};
use crate::websocket::ServerMessage;

/// 서버 이벤트 브로드캐스트 채널 크기.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 애플리케이션 공유 상태.
///
/// 이 구조체는 모든 API 핸들러에서 접근할 수 있는 공유 리소스를 포함합니다.
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 서버 설정
    pub config: Arc<AppConfig>,

    /// 오픈 포지션 저장소
    pub positions: Arc<PositionStore>,

    /// 트레이딩 엔진 - 자격증명 설정 전에는 `None`
    engine: Arc<RwLock<Option<Arc<dyn TradingEngine>>>>,

    /// 자격증명으로 엔진을 만드는 팩토리
    engine_factory: Arc<dyn EngineFactory>,

    /// 심볼별 분석 요청 병합기
    pub analysis: Arc<AnalysisCoalescer>,

    /// WebSocket 클라이언트로 내보내는 서버 이벤트
    events: broadcast::Sender<ServerMessage>,

    /// 서버 시작 시간
    pub started_at: DateTime<Utc>,

    /// 애플리케이션 버전
    pub version: String,
}

impl AppState {
    /// 새 AppState 생성.
    ///
    /// 엔진은 자격증명이 설정될 때 [`configure`](Self::configure)로 만들어집니다.
    pub fn new(config: AppConfig, engine_factory: Arc<dyn EngineFactory>) -> Self {
        let positions = PositionStore::open(config.storage.positions_path());
        let analysis = AnalysisCoalescer::new(CoalescerConfig::from(&config.analysis));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config: Arc::new(config),
            positions: Arc::new(positions),
            engine: Arc::new(RwLock::new(None)),
            engine_factory,
            analysis: Arc::new(analysis),
            events,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 현재 엔진 핸들.
    ///
    /// 잠금은 복제 직후 풀리므로 엔진 호출 중에는 잡혀 있지 않습니다.
    pub async fn engine(&self) -> Option<Arc<dyn TradingEngine>> {
        self.engine.read().await.clone()
    }

    /// 엔진이 없으면 `ENGINE_NOT_CONFIGURED` 에러.
    pub async fn require_engine(&self) -> ApiResult<Arc<dyn TradingEngine>> {
        self.engine().await.ok_or_else(engine_not_configured)
    }

    /// 엔진 설정 여부.
    pub async fn has_engine(&self) -> bool {
        self.engine.read().await.is_some()
    }

    /// 자격증명으로 엔진을 만들어 교체합니다.
    ///
    /// 엔진 생성이 성공한 뒤에만 자격증명 파일을 저장합니다.
    pub async fn configure(&self, credentials: &EngineCredentials) -> TraderResult<()> {
        let engine = self.engine_factory.create(credentials)?;
        credentials.save(&self.config.storage.credentials_file)?;

        let name = engine.name().to_string();
        *self.engine.write().await = Some(engine);
        info!(
            engine = %name,
            api_key = %credentials.masked_api_key(),
            "Trading engine configured"
        );
        Ok(())
    }

    /// 저장된 자격증명이 있으면 엔진을 생성합니다.
    ///
    /// 실패해도 서버는 엔진 없이 시작됩니다.
    pub async fn load_saved_credentials(&self) -> bool {
        let path = &self.config.storage.credentials_file;
        let credentials = match EngineCredentials::load(path) {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                info!(path = %path.display(), "No saved credentials, engine not configured");
                return false;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load saved credentials");
                return false;
            }
        };

        match self.engine_factory.create(&credentials) {
            Ok(engine) => {
                info!(engine = %engine.name(), "Trading engine restored from saved credentials");
                *self.engine.write().await = Some(engine);
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to create engine from saved credentials");
                false
            }
        }
    }

    /// 포지션 저장소 작업을 blocking thread pool에서 실행합니다.
    ///
    /// 저장소는 동기 파일 I/O(`sync_all` 포함)를 하므로 async worker thread에서
    /// 직접 호출하지 않습니다.
    pub async fn with_positions<T, F>(&self, f: F) -> TraderResult<T>
    where
        F: FnOnce(&PositionStore) -> TraderResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.positions);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| TraderError::Internal(format!("position store task failed: {}", e)))?
    }

    /// 서버 이벤트 구독.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerMessage> {
        self.events.subscribe()
    }

    /// 서버 이벤트 발행. 구독자가 없으면 버려집니다.
    pub fn publish(&self, message: ServerMessage) {
        let _ = self.events.send(message);
    }

    /// 서버 가동 시간 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// 기본 거래 심볼.
    pub fn default_symbol(&self) -> &str {
        &self.config.analysis.default_symbol
    }
}
