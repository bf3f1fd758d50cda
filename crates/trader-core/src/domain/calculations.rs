//! 손익(PnL) 계산 공통 로직.
//!
//! 단일 거래 또는 포지션의 손익, 수익률, 승패 분류를 계산하는 순수 함수를
//! 제공합니다. 반올림은 하지 않으며 표시용 포맷은 호출자가 담당합니다.

use rust_decimal::Decimal;

use super::trade::ClosedTrade;
use crate::error::{TraderError, TraderResult};
use crate::types::{DecimalExt, Percentage, Price, Quantity, HUNDRED};

/// 손익 계산.
///
/// 롱이면 `(현재가 - 진입가) × 수량`, 숏이면 `(진입가 - 현재가) × 수량`.
/// Decimal 범위를 넘으면 0입니다. 넘침을 구분해야 하면
/// [`checked_profit_loss`]를 사용합니다.
///
/// # Examples
///
/// ```
/// use trader_core::profit_loss;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(profit_loss(dec!(100), dec!(110), dec!(2), true), dec!(20));
/// assert_eq!(profit_loss(dec!(100), dec!(110), dec!(2), false), dec!(-20));
/// ```
pub fn profit_loss(entry_price: Price, current_price: Price, size: Quantity, is_long: bool) -> Decimal {
    checked_profit_loss(entry_price, current_price, size, is_long).unwrap_or(Decimal::ZERO)
}

/// 손익 계산. Decimal 범위를 넘으면 None.
pub fn checked_profit_loss(
    entry_price: Price,
    current_price: Price,
    size: Quantity,
    is_long: bool,
) -> Option<Decimal> {
    let change = if is_long {
        current_price.checked_sub(entry_price)?
    } else {
        entry_price.checked_sub(current_price)?
    };
    change.checked_mul(size)
}

/// 방향을 반영한 수익률(%) 계산.
///
/// # Errors
///
/// 진입 가격이 0이거나 결과가 Decimal 범위를 넘으면 `TraderError::InvalidInput`.
pub fn profit_loss_percentage(
    entry_price: Price,
    current_price: Price,
    is_long: bool,
) -> TraderResult<Percentage> {
    if entry_price.is_zero() {
        return Err(TraderError::InvalidInput(
            "entry price must be non-zero to compute a return".to_string(),
        ));
    }

    let change = if is_long {
        current_price.checked_sub(entry_price)
    } else {
        entry_price.checked_sub(current_price)
    };

    change
        .and_then(|change| change.checked_div(entry_price))
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .ok_or_else(|| {
            TraderError::InvalidInput(format!(
                "return from {} to {} is out of range",
                entry_price, current_price
            ))
        })
}

/// 수익 거래 여부.
///
/// 진입/청산 가격이 모두 있어야 하며, 방향이 없으면 BUY(롱)로 간주합니다.
/// 진입 가격이 0인 레코드는 수익 거래로 분류하지 않습니다.
pub fn is_winning_trade(trade: &ClosedTrade) -> bool {
    trade
        .profit_loss_percentage()
        .is_some_and(|pct| pct > Decimal::ZERO)
}

/// 현재가 기준 손절가까지의 거리(%).
///
/// 손절가가 없거나 현재가가 0이면 None.
pub fn position_risk_pct(current_price: Price, stop_loss: Option<Price>) -> Option<Percentage> {
    let stop = stop_loss?;
    current_price
        .checked_sub(stop)?
        .abs()
        .checked_ratio(current_price)?
        .checked_mul(HUNDRED)
}

/// 승률(%) 계산. 전체가 0이면 0.
pub fn win_rate(wins: usize, total: usize) -> Percentage {
    Decimal::from(wins).pct_of(Decimal::from(total))
}
