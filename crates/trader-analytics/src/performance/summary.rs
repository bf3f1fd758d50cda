//! 성과 요약 모듈
//!
//! 진입/청산이 짝지어진 거래 목록에서 승률, 총 손익, 평균 수익/손실,
//! 최대 수익/손실을 계산합니다.
//!
//! 개별 레코드에 필드가 빠져 있거나 손익이 Decimal 범위를 넘어도 예외를 내지
//! 않고 해당 레코드의 손익을 0으로 취급합니다. 빈 부분집합의 평균은 0입니다.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use trader_core::{is_winning_trade, win_rate, ClosedTrade, Side, TradeRecord};

/// 거래 성과 요약.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// 전체 거래 수
    pub total_trades: usize,
    /// 승률 (%)
    pub win_rate: Decimal,
    /// 청산된 거래의 손익 합계
    pub profit_loss: Decimal,
    /// 수익 거래 평균 손익
    pub avg_profit_per_trade: Decimal,
    /// 손실 거래 평균 손익
    pub avg_loss_per_trade: Decimal,
    /// 최대 수익 (수익 거래가 없으면 0)
    pub max_profit: Decimal,
    /// 최대 손실 (손실 거래가 없으면 0)
    pub max_loss: Decimal,
}

impl PerformanceSummary {
    /// 종료 거래 목록으로부터 성과 요약을 계산합니다.
    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let mut winners = Vec::new();
        let mut losers = Vec::new();
        let mut profit_loss = Decimal::ZERO;

        for trade in trades {
            if !trade.is_closed() {
                continue;
            }
            let pnl = match trade.profit_loss() {
                Some(pnl) => pnl,
                None => {
                    if trade.entry_price.is_some() {
                        warn!(position_id = ?trade.position_id, "Trade profit out of range, counted as zero");
                    }
                    Decimal::ZERO
                }
            };
            let pnl = match profit_loss.checked_add(pnl) {
                Some(total) => {
                    profit_loss = total;
                    pnl
                }
                None => {
                    warn!(position_id = ?trade.position_id, "Total profit out of range, trade counted as zero");
                    Decimal::ZERO
                }
            };

            if is_winning_trade(trade) {
                winners.push(pnl);
            } else {
                losers.push(pnl);
            }
        }

        Self {
            total_trades: trades.len(),
            win_rate: win_rate(winners.len(), trades.len()),
            profit_loss,
            avg_profit_per_trade: mean(&winners),
            avg_loss_per_trade: mean(&losers),
            max_profit: winners.iter().copied().max().unwrap_or_default(),
            max_loss: losers.iter().copied().min().unwrap_or_default(),
        }
    }
}

/// 종료 거래 목록의 성과 요약.
pub fn summarize(trades: &[ClosedTrade]) -> PerformanceSummary {
    PerformanceSummary::from_trades(trades)
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values
        .iter()
        .try_fold(Decimal::ZERO, |sum, value| sum.checked_add(*value))
        .and_then(|sum| sum.checked_div(Decimal::from(values.len())))
        .unwrap_or_else(|| {
            warn!(count = values.len(), "Average out of range, reported as zero");
            Decimal::ZERO
        })
}

/// 거래 이력에서 진입/청산 쌍을 만듭니다.
///
/// 같은 `position_id`의 BUY 다음에 오는 각 SELL이 하나의 종료 거래가 됩니다.
/// 부분 청산이 여러 번이면 청산마다 하나씩 생깁니다. 진입 기록이 없는 SELL과
/// 아직 청산되지 않은 BUY는 포함하지 않습니다.
pub fn pair_round_trips(history: &[TradeRecord]) -> Vec<ClosedTrade> {
    let mut entries: HashMap<&str, &TradeRecord> = HashMap::new();
    let mut closed = Vec::new();

    for record in history {
        let Some(position_id) = record.position_id.as_deref() else {
            continue;
        };

        match record.side {
            Some(Side::Buy) => {
                entries.insert(position_id, record);
            }
            Some(Side::Sell) => {
                if let Some(entry) = entries.get(position_id) {
                    closed.push(ClosedTrade {
                        position_id: Some(position_id.to_string()),
                        side: Some(Side::Buy),
                        entry_price: entry.price,
                        exit_price: record.price,
                        size: record.size.or(entry.size),
                    });
                }
            }
            None => {}
        }
    }

    closed
}
