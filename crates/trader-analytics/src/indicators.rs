//! 기술적 지표.
//!
//! 모의 엔진이 캔들에 붙이는 기본 지표만 제공합니다. 모든 함수는 입력과 같은
//! 길이의 벡터를 반환하며, 계산 구간이 부족한 앞부분은 `None`입니다.
//!
//! - **SMA**: 단순 이동평균
//! - **RSI**: 상대강도지수 (Wilder 평활)
//! - **ATR**: 평균 실제 범위 (Wilder 평활)

use rust_decimal::Decimal;

/// 단순 이동평균.
pub fn sma(prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    if period == 0 {
        return vec![None; prices.len()];
    }

    let divisor = Decimal::from(period);
    (0..prices.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                Some(prices[i + 1 - period..=i].iter().sum::<Decimal>() / divisor)
            }
        })
        .collect()
}

/// 상대강도지수.
///
/// 첫 값은 `period`번째 가격 변화 이후에 나옵니다. 하락이 전혀 없으면 100.
pub fn rsi(prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut result = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return result;
    }

    let hundred = Decimal::ONE_HUNDRED;
    let n = Decimal::from(period);
    let mut avg_gain = Decimal::ZERO;
    let mut avg_loss = Decimal::ZERO;

    for i in 1..prices.len() {
        let delta = prices[i] - prices[i - 1];
        let gain = delta.max(Decimal::ZERO);
        let loss = (-delta).max(Decimal::ZERO);

        if i <= period {
            avg_gain += gain / n;
            avg_loss += loss / n;
            if i < period {
                continue;
            }
        } else {
            avg_gain = (avg_gain * (n - Decimal::ONE) + gain) / n;
            avg_loss = (avg_loss * (n - Decimal::ONE) + loss) / n;
        }

        result[i] = Some(if avg_loss.is_zero() {
            hundred
        } else {
            hundred - hundred / (Decimal::ONE + avg_gain / avg_loss)
        });
    }

    result
}

/// 평균 실제 범위.
pub fn atr(high: &[Decimal], low: &[Decimal], close: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let len = high.len().min(low.len()).min(close.len());
    let mut result = vec![None; len];
    if period == 0 || len < period {
        return result;
    }

    let true_range = |i: usize| {
        let hl = high[i] - low[i];
        if i == 0 {
            hl
        } else {
            hl.max((high[i] - close[i - 1]).abs())
                .max((low[i] - close[i - 1]).abs())
        }
    };

    let n = Decimal::from(period);
    let mut current = (0..period).map(true_range).sum::<Decimal>() / n;
    result[period - 1] = Some(current);

    for (i, slot) in result.iter_mut().enumerate().skip(period) {
        current = (current * (n - Decimal::ONE) + true_range(i)) / n;
        *slot = Some(current);
    }

    result
}
