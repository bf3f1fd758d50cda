//! 총 손익 요약 모듈
//!
//! 거래 이력(실현 손익)과 현재 오픈 포지션(미실현 손익)을 합쳐 총 손익을
//! 계산합니다.
//!
//! - BUY: `가격 × 수량`을 총 투자금에, 수량을 총 매수량에 더합니다.
//! - SELL: 수량을 총 매도량에 더하고 포지션 ID를 청산 집합에 기록하며,
//!   `profit_amount`가 있으면 실현 손익에 더합니다.
//! - 오픈 포지션은 모두 롱으로 보고 현재가 기준 미실현 손익을 구합니다.
//!
//! 실현/총 손익률의 분모는 총 투자금, 미실현 손익률의 분모는 오픈 포지션의
//! 원가 합계입니다.
//!
//! 합계가 Decimal 범위를 넘게 만드는 레코드나 포지션은 0으로 기여합니다.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use trader_core::{
    checked_profit_loss, DecimalExt, Position, Price, Side, TradeRecord, TraderError,
    TraderResult,
};

/// 총 손익 요약.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitSummary {
    /// 실현 손익
    pub realized_profit: Decimal,
    /// 미실현 손익
    pub unrealized_profit: Decimal,
    /// 실현 + 미실현
    pub total_profit: Decimal,
    /// 실현 손익률 (총 투자금 대비 %)
    pub realized_profit_percentage: Decimal,
    /// 미실현 손익률 (오픈 포지션 원가 대비 %)
    pub unrealized_profit_percentage: Decimal,
    /// 총 손익률 (총 투자금 대비 %)
    pub total_profit_percentage: Decimal,
    /// 총 투자금 (BUY 가격 × 수량 합계)
    pub total_investment: Decimal,
    /// 총 매수 수량
    pub total_buy_volume: Decimal,
    /// 총 매도 수량
    pub total_sell_volume: Decimal,
    /// 오픈 포지션 수
    pub open_positions_count: usize,
    /// 청산된 포지션 수 (포지션 ID 기준 중복 제거)
    pub closed_positions_count: usize,
}

impl ProfitSummary {
    /// 거래 이력, 오픈 포지션, 현재가로 요약을 계산합니다.
    ///
    /// 필드가 빠진 거래 레코드는 0으로 기여합니다. 현재가가 없거나 0 이하면
    /// 전체 요약을 계산할 수 없으므로 `DataUnavailable`을 반환합니다.
    pub fn compute(
        trade_history: &[TradeRecord],
        active_positions: &[Position],
        current_price: Price,
    ) -> TraderResult<Self> {
        if current_price <= Decimal::ZERO {
            return Err(TraderError::DataUnavailable(format!(
                "current price unavailable ({})",
                current_price
            )));
        }

        let mut summary = Self::default();
        // 포지션 ID 없는 SELL은 None 하나로 묶여 한 번만 셉니다.
        let mut closed_positions: HashSet<Option<&str>> = HashSet::new();
        let mut skipped = 0usize;
        let mut out_of_range = 0usize;

        for trade in trade_history {
            let price = trade.price.unwrap_or_default();
            let size = trade.size.unwrap_or_default();
            if trade.side.is_none() || trade.price.is_none() || trade.size.is_none() {
                skipped += 1;
            }

            match trade.side {
                Some(Side::Buy) => {
                    let totals = price
                        .checked_mul(size)
                        .and_then(|notional| summary.total_investment.checked_add(notional))
                        .zip(summary.total_buy_volume.checked_add(size));
                    match totals {
                        Some((investment, volume)) => {
                            summary.total_investment = investment;
                            summary.total_buy_volume = volume;
                        }
                        None => out_of_range += 1,
                    }
                }
                Some(Side::Sell) => {
                    closed_positions.insert(trade.position_id.as_deref());
                    let profit = trade.profit_amount.unwrap_or_default();
                    let totals = summary
                        .total_sell_volume
                        .checked_add(size)
                        .zip(summary.realized_profit.checked_add(profit));
                    match totals {
                        Some((volume, realized)) => {
                            summary.total_sell_volume = volume;
                            summary.realized_profit = realized;
                        }
                        None => out_of_range += 1,
                    }
                }
                None => {}
            }
        }

        let mut open_cost_basis = Decimal::ZERO;
        for position in active_positions {
            if position.entry_price <= Decimal::ZERO || position.size <= Decimal::ZERO {
                continue;
            }
            let totals = checked_profit_loss(position.entry_price, current_price, position.size, true)
                .and_then(|pnl| summary.unrealized_profit.checked_add(pnl))
                .zip(
                    position
                        .cost_basis()
                        .and_then(|cost| open_cost_basis.checked_add(cost)),
                );
            match totals {
                Some((unrealized, cost)) => {
                    summary.unrealized_profit = unrealized;
                    open_cost_basis = cost;
                }
                None => out_of_range += 1,
            }
        }

        summary.total_profit = summary
            .realized_profit
            .saturating_add(summary.unrealized_profit);
        summary.realized_profit_percentage =
            summary.realized_profit.pct_of(summary.total_investment);
        summary.total_profit_percentage = summary.total_profit.pct_of(summary.total_investment);
        summary.unrealized_profit_percentage = summary.unrealized_profit.pct_of(open_cost_basis);
        summary.open_positions_count = active_positions.len();
        summary.closed_positions_count = closed_positions.len();

        if skipped > 0 {
            debug!(skipped, "Incomplete trade records counted as zero");
        }
        if out_of_range > 0 {
            warn!(out_of_range, "Out-of-range trade records or positions counted as zero");
        }

        Ok(summary)
    }
}

/// 총 손익 요약.
pub fn summarize(
    trade_history: &[TradeRecord],
    active_positions: &[Position],
    current_price: Price,
) -> TraderResult<ProfitSummary> {
    ProfitSummary::compute(trade_history, active_positions, current_price)
}
