//! 난수 기반 캔들 생성.

use chrono::{Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trader_core::{Candle, Granularity};

/// 무작위 보행(random walk) 캔들을 생성합니다.
///
/// 마지막 캔들의 종료 시각이 현재 시각이 되도록 배치하며, 가격은
/// `start_price`에서 시작해 캔들마다 최대 `volatility` 비율만큼 움직입니다.
pub fn generate_candles<R: Rng + ?Sized>(
    rng: &mut R,
    granularity: Granularity,
    count: usize,
    start_price: Decimal,
    volatility: Decimal,
) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(count);
    let step = Duration::from_std(granularity.duration()).unwrap_or_else(|_| Duration::hours(1));
    let mut open_time = Utc::now() - step * count as i32;
    let mut price = start_price.max(dec!(0.01));

    let volatility_f64 = volatility.to_string().parse::<f64>().unwrap_or(0.01);

    for _ in 0..count {
        let change_pct = rng.gen_range(-1.0..=1.0) * volatility_f64;
        let change = price * to_decimal(change_pct);

        let open = price;
        let close = (price + change).max(dec!(0.01)).round_dp(2);

        let high_extra = open * to_decimal(rng.gen::<f64>() * volatility_f64 / 2.0);
        let low_extra = open * to_decimal(rng.gen::<f64>() * volatility_f64 / 2.0);

        let high = (open.max(close) + high_extra).round_dp(2);
        let low = (open.min(close) - low_extra).max(dec!(0.01)).round_dp(2);
        let volume = to_decimal(rng.gen_range(1.0..500.0)).round_dp(4);

        candles.push(Candle {
            timestamp: open_time,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        open_time += step;
    }

    candles
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp(8)
}
