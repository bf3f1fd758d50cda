//! 트레이딩 엔진 추상화.
//!
//! 시장 데이터 조회, 지표 계산, AI 분석, 주문 실행, 거래 기록을 담당하는
//! 외부 트레이딩 엔진에 대한 인터페이스를 제공합니다. 서버는 이 trait만
//! 알고 있으며 실제 구현은 팩토리를 통해 주입됩니다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::order::{OrderType, Side, TimeInForce};
use super::trade::TradeRecord;
use crate::types::{Granularity, Price};

// =============================================================================
// 에러 타입
// =============================================================================

/// 트레이딩 엔진 에러.
#[derive(Debug, Error)]
pub enum EngineError {
    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 인증 실패
    #[error("인증 실패: {0}")]
    Authentication(String),

    /// 거래소/AI API 에러
    #[error("API 에러: {0}")]
    Api(String),

    /// 빈 데이터
    #[error("데이터 없음: {0}")]
    NoData(String),

    /// 잘못된 데이터
    #[error("잘못된 데이터: {0}")]
    InvalidData(String),

    /// 시간 초과
    #[error("시간 초과: {0}")]
    Timeout(String),

    /// 지원하지 않는 기능
    #[error("지원하지 않는 기능: {0}")]
    Unsupported(String),
}

impl EngineError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Network(_) | EngineError::Timeout(_))
    }
}

// =============================================================================
// 데이터 타입
// =============================================================================

/// OHLCV 캔들.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    pub volume: Decimal,
}

/// 지표가 추가된 캔들 한 행.
///
/// 계산 구간이 부족한 지표는 `None`(JSON `null`)으로 남습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// 원본 캔들
    #[serde(flatten)]
    pub candle: Candle,
    /// 지표 이름 → 값
    #[serde(default)]
    pub indicators: BTreeMap<String, Option<Decimal>>,
}

impl IndicatorRow {
    /// 지표 없이 캔들만으로 행을 만듭니다.
    pub fn from_candle(candle: Candle) -> Self {
        Self {
            candle,
            indicators: BTreeMap::new(),
        }
    }

    /// 지표 값을 조회합니다.
    pub fn indicator(&self, name: &str) -> Option<Decimal> {
        self.indicators.get(name).copied().flatten()
    }
}

/// 자산별 잔고.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    /// 사용 가능
    pub available: Decimal,
    /// 주문에 묶인 금액
    pub hold: Decimal,
    /// 합계
    pub total: Decimal,
}

impl AssetBalance {
    /// 사용 가능/보류 금액으로 잔고를 만듭니다.
    pub fn new(available: Decimal, hold: Decimal) -> Self {
        Self {
            available,
            hold,
            total: available + hold,
        }
    }
}

/// 주문 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOrder {
    /// 심볼
    pub symbol: String,
    /// 방향
    pub side: Side,
    /// 금액(매수: 호가 통화) 또는 수량(매도: 기준 통화)
    pub amount: Decimal,
    /// 주문 유형
    #[serde(default)]
    pub order_type: OrderType,
    /// 유효 기간
    #[serde(default)]
    pub time_in_force: TimeInForce,
}

impl TradeOrder {
    /// 시장가 주문을 생성합니다.
    pub fn market(symbol: impl Into<String>, side: Side, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            amount,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Gtc,
        }
    }
}

/// 주문 실행 결과.
///
/// 거래소 응답 형태(`{success, success_response: {order_id}}` /
/// `{success: false, error: {message, type}}`)로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// 체결
    Filled {
        /// 주문 ID
        order_id: String,
    },
    /// 거절
    Rejected {
        /// 거절 사유
        message: String,
        /// 거절 유형
        kind: String,
    },
}

impl ExecutionOutcome {
    /// 체결 여부.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Filled { .. })
    }

    /// 체결된 주문 ID.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Filled { order_id } => Some(order_id),
            ExecutionOutcome::Rejected { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct OutcomeWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    success_response: Option<SuccessWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorWire>,
}

#[derive(Serialize, Deserialize)]
struct SuccessWire {
    order_id: String,
}

#[derive(Serialize, Deserialize)]
struct ErrorWire {
    message: String,
    #[serde(rename = "type")]
    kind: String,
}

impl Serialize for ExecutionOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            ExecutionOutcome::Filled { order_id } => OutcomeWire {
                success: true,
                success_response: Some(SuccessWire {
                    order_id: order_id.clone(),
                }),
                error: None,
            },
            ExecutionOutcome::Rejected { message, kind } => OutcomeWire {
                success: false,
                success_response: None,
                error: Some(ErrorWire {
                    message: message.clone(),
                    kind: kind.clone(),
                }),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExecutionOutcome {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = OutcomeWire::deserialize(deserializer)?;
        match (wire.success, wire.success_response, wire.error) {
            (true, Some(ok), _) => Ok(ExecutionOutcome::Filled {
                order_id: ok.order_id,
            }),
            (_, _, Some(err)) => Ok(ExecutionOutcome::Rejected {
                message: err.message,
                kind: err.kind,
            }),
            _ => Ok(ExecutionOutcome::Rejected {
                message: "missing order response".to_string(),
                kind: "UNKNOWN".to_string(),
            }),
        }
    }
}

// =============================================================================
// TradingEngine Trait
// =============================================================================

/// 외부 트레이딩 엔진 trait.
///
/// 모든 메서드는 네트워크 또는 외부 AI 호출을 포함할 수 있으며, 호출자가
/// 타임아웃을 걸 수 있도록 취소 안전(cancel-safe)해야 합니다.
#[async_trait]
pub trait TradingEngine: Send + Sync {
    /// 엔진 이름.
    fn name(&self) -> &str;

    /// 캔들 데이터 조회.
    ///
    /// # Errors
    ///
    /// - `EngineError::NoData`: 빈 응답
    /// - `EngineError::Network`: 네트워크 연결 실패
    async fn fetch_market_data(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Vec<Candle>, EngineError>;

    /// 캔들에 기술적 지표 열을 추가합니다.
    async fn calculate_technical_indicators(
        &self,
        candles: &[Candle],
    ) -> Result<Vec<IndicatorRow>, EngineError>;

    /// AI 기반 분석. 수십 초가 걸릴 수 있습니다.
    async fn analyze_with_ai(
        &self,
        symbol: &str,
        rows: &[IndicatorRow],
    ) -> Result<serde_json::Value, EngineError>;

    /// 자산별 잔고 조회.
    async fn fetch_account_balance(&self) -> Result<BTreeMap<String, AssetBalance>, EngineError>;

    /// 주문 실행.
    async fn execute_trade(&self, order: &TradeOrder) -> Result<ExecutionOutcome, EngineError>;

    /// 최근 거래 기록 조회 (오래된 순).
    async fn get_trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>, EngineError>;

    /// 거래 기록 추가.
    async fn log_trade(&self, trade: TradeRecord) -> Result<(), EngineError>;

    /// 전략 1회 실행.
    async fn run_strategy(&self, symbol: &str) -> Result<serde_json::Value, EngineError>;
}

/// 마지막 캔들의 종가를 반환합니다.
pub fn last_close(candles: &[Candle]) -> Option<Price> {
    candles.last().map(|c| c.close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_execution_outcome_wire_format() {
        let filled = ExecutionOutcome::Filled {
            order_id: "ord-1".to_string(),
        };
        let json = serde_json::to_value(&filled).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["success_response"]["order_id"], "ord-1");

        let rejected: ExecutionOutcome = serde_json::from_str(
            r#"{"success": false, "error": {"message": "insufficient funds", "type": "INSUFFICIENT_FUND"}}"#,
        )
        .unwrap();
        assert!(!rejected.is_success());
        assert_eq!(rejected.order_id(), None);
    }

    #[test]
    fn test_indicator_row_serializes_missing_as_null() {
        let mut row = IndicatorRow::from_candle(Candle {
            timestamp: Utc::now(),
            open: dec!(1),
            high: dec!(2),
            low: dec!(1),
            close: dec!(2),
            volume: dec!(10),
        });
        row.indicators.insert("sma_20".to_string(), None);
        row.indicators.insert("rsi_14".to_string(), Some(dec!(55)));

        let json = serde_json::to_value(&row).unwrap();
        assert!(json["indicators"]["sma_20"].is_null());
        assert_eq!(row.indicator("rsi_14"), Some(dec!(55)));
        assert_eq!(row.indicator("sma_20"), None);
    }

    #[test]
    fn test_asset_balance_total() {
        let balance = AssetBalance::new(dec!(90), dec!(10));
        assert_eq!(balance.total, dec!(100));
    }
}
