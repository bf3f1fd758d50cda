//! 거래 기록.
//!
//! 트레이딩 엔진이 남기는 거래 기록(`TradeRecord`)과, 진입/청산을 한 쌍으로
//! 묶은 종료 거래(`ClosedTrade`)를 정의합니다.
//!
//! 거래 기록은 외부 엔진이 소유하는 데이터이므로 모든 필드를 선택적으로
//! 역직렬화합니다. 일부 필드가 깨진 레코드도 전체 이력 로드를 실패시키지
//! 않고 해당 필드만 비어 있는 상태로 읽힙니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use super::calculations::{checked_profit_loss, profit_loss_percentage};
use super::order::Side;
use crate::types::{Price, Quantity};

/// 엔진이 기록한 단일 거래.
///
/// 생성 후 변경되지 않습니다. `profit_amount`는 청산(SELL) 거래에만 존재합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// 이 거래가 속한 포지션 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    /// 주문 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// 거래 심볼
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// 거래 방향 (알 수 없는 값은 None)
    #[serde(default, deserialize_with = "lenient_side")]
    pub side: Option<Side>,
    /// 체결 가격
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Price>,
    /// 체결 수량
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub size: Option<Quantity>,
    /// 체결 시각
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// 청산으로 확정된 손익
    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub profit_amount: Option<Decimal>,
    /// 거래 사유 (strategy, manual_sell 등)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TradeRecord {
    /// 매수 기록을 생성합니다.
    pub fn buy(position_id: impl Into<String>, price: Price, size: Quantity) -> Self {
        Self {
            position_id: Some(position_id.into()),
            side: Some(Side::Buy),
            price: Some(price),
            size: Some(size),
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// 매도(청산) 기록을 생성합니다.
    pub fn sell(
        position_id: Option<String>,
        price: Price,
        size: Quantity,
        profit_amount: Option<Decimal>,
    ) -> Self {
        Self {
            position_id,
            side: Some(Side::Sell),
            price: Some(price),
            size: Some(size),
            timestamp: Some(Utc::now()),
            profit_amount,
            ..Default::default()
        }
    }

    /// 주문 ID를 설정합니다.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// 심볼을 설정합니다.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// 거래 사유를 설정합니다.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// 진입과 청산이 짝지어진 거래.
///
/// 청산 가격이 없으면 아직 열려 있는 거래로 보고 성과 통계에서 승리로
/// 분류하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// 포지션 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    /// 진입 방향 (없으면 BUY로 간주)
    #[serde(default, deserialize_with = "lenient_side")]
    pub side: Option<Side>,
    /// 진입 가격
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub entry_price: Option<Price>,
    /// 청산 가격
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub exit_price: Option<Price>,
    /// 수량
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub size: Option<Quantity>,
}

impl ClosedTrade {
    /// 새 종료 거래를 생성합니다.
    pub fn new(entry_price: Price, exit_price: Price, size: Quantity, side: Side) -> Self {
        Self {
            position_id: None,
            side: Some(side),
            entry_price: Some(entry_price),
            exit_price: Some(exit_price),
            size: Some(size),
        }
    }

    /// 롱 포지션인지 여부. 방향이 없으면 롱으로 봅니다.
    pub fn is_long(&self) -> bool {
        self.side.unwrap_or(Side::Buy).is_long()
    }

    /// 청산 여부.
    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some()
    }

    /// 실현 손익. 진입/청산 가격이 모두 있어야 계산되며 수량이 없으면 0입니다.
    /// Decimal 범위를 넘으면 None.
    pub fn profit_loss(&self) -> Option<Decimal> {
        let entry = self.entry_price?;
        let exit = self.exit_price?;
        checked_profit_loss(entry, exit, self.size.unwrap_or_default(), self.is_long())
    }

    /// 수익률(%). 진입 가격이 0이면 None.
    pub fn profit_loss_percentage(&self) -> Option<Decimal> {
        let entry = self.entry_price?;
        let exit = self.exit_price?;
        profit_loss_percentage(entry, exit, self.is_long()).ok()
    }
}

// ==================== 관대한 역직렬화 ====================

fn lenient_side<'de, D>(deserializer: D) -> Result<Option<Side>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Side::from_str(&s).ok(),
        _ => None,
    })
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => decimal_from_str(&n.to_string()),
        Some(serde_json::Value::String(s)) => decimal_from_str(s.trim()),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        _ => None,
    })
}

fn decimal_from_str(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
