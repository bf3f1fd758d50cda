//! 설정 관리.
//!
//! 이 모듈은 서버 설정을 정의하고 관리합니다. 설정은 기본값, TOML 파일,
//! `TRADER__` 접두사 환경 변수 순으로 덮어씁니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{Granularity, Percentage, Price};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 파일 저장소 설정
    pub storage: StorageConfig,
    /// 분석 캐시 및 타임아웃 설정
    pub analysis: AnalysisConfig,
    /// 주기적 전략 실행 설정
    pub scheduler: SchedulerConfig,
    /// 신규 포지션 기본 리스크 파라미터
    pub trading: TradingDefaults,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 허용할 CORS origin (쉼표 구분)
    pub cors_origins: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: "http://localhost:3000,http://localhost:5173".to_string(),
            request_timeout_secs: 90,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 파일 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 데이터 디렉터리
    pub data_dir: PathBuf,
    /// 포지션 파일 이름
    pub positions_file: String,
    /// 자격증명 파일 경로
    pub credentials_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            positions_file: "positions.json".to_string(),
            credentials_file: PathBuf::from("config/api_keys.json"),
        }
    }
}

impl StorageConfig {
    /// 포지션 파일 전체 경로.
    pub fn positions_path(&self) -> PathBuf {
        self.data_dir.join(&self.positions_file)
    }
}

/// 분석 요청 병합 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 분석 결과 캐시 유효 시간 (초)
    pub cache_ttl_secs: u64,
    /// 시장 데이터 조회 타임아웃 (초)
    pub market_data_timeout_secs: u64,
    /// AI 분석 타임아웃 (초)
    pub analysis_timeout_secs: u64,
    /// 기본 심볼
    pub default_symbol: String,
    /// 기본 캔들 간격
    pub default_granularity: Granularity,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 15 * 60,
            market_data_timeout_secs: 30,
            analysis_timeout_secs: 60,
            default_symbol: "BTC-USD".to_string(),
            default_granularity: Granularity::OneHour,
        }
    }
}

impl AnalysisConfig {
    /// 캐시 유효 시간.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// 시장 데이터 조회 타임아웃.
    pub fn market_data_timeout(&self) -> Duration {
        Duration::from_secs(self.market_data_timeout_secs)
    }

    /// 분석 타임아웃.
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }
}

/// 주기적 전략 실행 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 실행 주기 (초)
    pub interval_secs: u64,
    /// 서버 시작 후 첫 실행까지 대기 (초)
    pub initial_delay_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60 * 60,
            initial_delay_secs: 10,
        }
    }
}

/// 신규 포지션 기본 리스크 파라미터.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TradingDefaults {
    /// 진입가 대비 손절 비율 (%)
    pub stop_loss_pct: Percentage,
    /// 진입가 대비 익절 비율 (%)
    pub take_profit_pct: Percentage,
    /// 트레일링 스톱 비율 (%)
    pub trailing_stop_pct: Percentage,
    /// 동적 손절 사용 여부
    pub dynamic_stop_loss: bool,
    /// ATR 배수
    pub atr_multiplier: Decimal,
}

impl Default for TradingDefaults {
    fn default() -> Self {
        Self {
            stop_loss_pct: dec!(5),
            take_profit_pct: dec!(10),
            trailing_stop_pct: Decimal::ZERO,
            dynamic_stop_loss: true,
            atr_multiplier: dec!(3),
        }
    }
}

impl TradingDefaults {
    /// 진입가에 대한 기본 손절가.
    pub fn stop_loss_for(&self, entry_price: Price) -> Price {
        entry_price * (Decimal::ONE_HUNDRED - self.stop_loss_pct) / Decimal::ONE_HUNDRED
    }

    /// 진입가에 대한 기본 익절가.
    pub fn take_profit_for(&self, entry_price: Price) -> Price {
        entry_price * (Decimal::ONE_HUNDRED + self.take_profit_pct) / Decimal::ONE_HUNDRED
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("TRADER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}
