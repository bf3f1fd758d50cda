//! 정밀한 금융 계산을 위한 Decimal 유틸리티.

use rust_decimal::Decimal;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 주문/포지션 수량 타입.
pub type Quantity = Decimal;

/// 퍼센트 타입 (10 = 10%).
pub type Percentage = Decimal;

/// 100 상수.
pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 분모가 0이면 `None`을 반환하는 나눗셈.
    fn checked_ratio(&self, denominator: Decimal) -> Option<Decimal>;

    /// `self / denominator * 100`, 분모가 0이거나 범위를 넘으면 0.
    fn pct_of(&self, denominator: Decimal) -> Percentage;
}

impl DecimalExt for Decimal {
    fn checked_ratio(&self, denominator: Decimal) -> Option<Decimal> {
        if denominator.is_zero() {
            None
        } else {
            self.checked_div(denominator)
        }
    }

    fn pct_of(&self, denominator: Decimal) -> Percentage {
        self.checked_ratio(denominator)
            .and_then(|ratio| ratio.checked_mul(HUNDRED))
            .unwrap_or(Decimal::ZERO)
    }
}
