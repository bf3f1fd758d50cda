//! 오픈 포지션.
//!
//! 이 모듈은 포지션 저장소가 소유하는 타입을 정의합니다:
//! - `Position` - 현재 열려 있는 포지션
//! - `NewPosition` - 포지션 생성 요청
//! - `PositionUpdate` - 부분 업데이트 요청
//!
//! 포지션은 저장소에 존재하는 동안만 열려 있는 것으로 보며, 청산은 플래그가
//! 아니라 삭제로 표현합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calculations::{profit_loss, profit_loss_percentage};
use crate::error::{TraderError, TraderResult};
use crate::types::{Percentage, Price, Quantity};

/// 저장소에 기록된 오픈 포지션. 모든 포지션은 롱으로 취급합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// 고유 포지션 ID (파일에서는 키와 동일)
    #[serde(default)]
    pub id: String,
    /// 진입 가격 (> 0)
    pub entry_price: Price,
    /// 보유 수량 (> 0)
    pub size: Quantity,
    /// 손절가
    #[serde(default)]
    pub stop_loss: Option<Price>,
    /// 익절가
    #[serde(default)]
    pub take_profit: Option<Price>,
    /// 트레일링 스톱 비율 (%)
    #[serde(default)]
    pub trailing_stop_pct: Percentage,
    /// ATR 기반 동적 손절 사용 여부
    #[serde(default)]
    pub dynamic_stop_loss: bool,
    /// 동적 손절에 사용할 ATR 배수
    #[serde(default)]
    pub atr_multiplier: Decimal,
    /// 포지션 오픈 시각
    #[serde(default = "Utc::now")]
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// 생성 요청과 ID로 포지션을 만듭니다.
    pub fn from_request(id: impl Into<String>, request: NewPosition) -> Self {
        Self {
            id: id.into(),
            entry_price: request.entry_price,
            size: request.size,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            trailing_stop_pct: request.trailing_stop_pct,
            dynamic_stop_loss: request.dynamic_stop_loss,
            atr_multiplier: request.atr_multiplier,
            opened_at: Utc::now(),
        }
    }

    /// 원가 (진입가 × 수량). Decimal 범위를 넘으면 None.
    pub fn cost_basis(&self) -> Option<Decimal> {
        self.entry_price.checked_mul(self.size)
    }

    /// 현재가 기준 미실현 손익.
    pub fn unrealized_pnl(&self, current_price: Price) -> Decimal {
        profit_loss(self.entry_price, current_price, self.size, true)
    }

    /// 현재가 기준 수익률(%).
    pub fn return_pct(&self, current_price: Price) -> TraderResult<Percentage> {
        profit_loss_percentage(self.entry_price, current_price, true)
    }

    /// 부분 업데이트를 적용합니다.
    pub fn apply(&mut self, update: &PositionUpdate) {
        if let Some(stop_loss) = update.stop_loss {
            self.stop_loss = Some(stop_loss);
        }
        if let Some(take_profit) = update.take_profit {
            self.take_profit = Some(take_profit);
        }
        if let Some(size) = update.size {
            self.size = size;
        }
    }
}

/// 포지션 생성 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPosition {
    /// 진입 가격
    pub entry_price: Price,
    /// 수량
    pub size: Quantity,
    /// 손절가
    pub stop_loss: Option<Price>,
    /// 익절가
    pub take_profit: Option<Price>,
    /// 트레일링 스톱 비율 (%)
    pub trailing_stop_pct: Percentage,
    /// 동적 손절 사용 여부
    pub dynamic_stop_loss: bool,
    /// ATR 배수
    pub atr_multiplier: Decimal,
}

impl NewPosition {
    /// 진입가와 수량만으로 생성 요청을 만듭니다.
    pub fn new(entry_price: Price, size: Quantity) -> Self {
        Self {
            entry_price,
            size,
            stop_loss: None,
            take_profit: None,
            trailing_stop_pct: Decimal::ZERO,
            dynamic_stop_loss: false,
            atr_multiplier: Decimal::ZERO,
        }
    }

    /// 손절가를 설정합니다.
    pub fn with_stop_loss(mut self, stop_loss: Price) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    /// 익절가를 설정합니다.
    pub fn with_take_profit(mut self, take_profit: Price) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    /// 트레일링 스톱 비율을 설정합니다.
    pub fn with_trailing_stop_pct(mut self, pct: Percentage) -> Self {
        self.trailing_stop_pct = pct;
        self
    }

    /// 동적 손절을 설정합니다.
    pub fn with_dynamic_stop_loss(mut self, enabled: bool, atr_multiplier: Decimal) -> Self {
        self.dynamic_stop_loss = enabled;
        self.atr_multiplier = atr_multiplier;
        self
    }

    /// 입력값을 검증합니다.
    pub fn validate(&self) -> TraderResult<()> {
        require_positive("entry_price", self.entry_price)?;
        require_positive("size", self.size)?;
        if let Some(stop_loss) = self.stop_loss {
            require_positive("stop_loss", stop_loss)?;
        }
        if let Some(take_profit) = self.take_profit {
            require_positive("take_profit", take_profit)?;
        }
        if self.trailing_stop_pct < Decimal::ZERO {
            return Err(TraderError::InvalidInput(
                "trailing_stop_pct must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// 포지션 부분 업데이트.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// 새 손절가
    #[serde(default)]
    pub stop_loss: Option<Price>,
    /// 새 익절가
    #[serde(default)]
    pub take_profit: Option<Price>,
    /// 새 수량
    #[serde(default)]
    pub size: Option<Quantity>,
}

impl PositionUpdate {
    /// 변경할 필드가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.stop_loss.is_none() && self.take_profit.is_none() && self.size.is_none()
    }

    /// 지정된 값이 모두 양수인지 검증합니다.
    pub fn validate(&self) -> TraderResult<()> {
        if let Some(stop_loss) = self.stop_loss {
            require_positive("stop_loss", stop_loss)?;
        }
        if let Some(take_profit) = self.take_profit {
            require_positive("take_profit", take_profit)?;
        }
        if let Some(size) = self.size {
            require_positive("size", size)?;
        }
        Ok(())
    }
}

/// 값이 양수인지 검증합니다.
pub fn require_positive(field: &str, value: Decimal) -> TraderResult<()> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(TraderError::InvalidInput(format!(
            "{} must be positive, got {}",
            field, value
        )))
    }
}
