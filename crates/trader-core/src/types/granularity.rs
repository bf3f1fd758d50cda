//! 캔들 데이터 조회 간격 정의.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 시장 데이터 캔들 간격.
///
/// 거래소 API가 사용하는 `ONE_HOUR` 형태의 문자열로 직렬화됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    /// 1분봉
    OneMinute,
    /// 5분봉
    FiveMinute,
    /// 15분봉
    FifteenMinute,
    /// 30분봉
    ThirtyMinute,
    /// 1시간봉
    #[default]
    OneHour,
    /// 2시간봉
    TwoHour,
    /// 6시간봉
    SixHour,
    /// 일봉
    OneDay,
}

impl Granularity {
    /// 한 캔들이 차지하는 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Granularity::OneMinute => Duration::from_secs(60),
            Granularity::FiveMinute => Duration::from_secs(5 * 60),
            Granularity::FifteenMinute => Duration::from_secs(15 * 60),
            Granularity::ThirtyMinute => Duration::from_secs(30 * 60),
            Granularity::OneHour => Duration::from_secs(60 * 60),
            Granularity::TwoHour => Duration::from_secs(2 * 60 * 60),
            Granularity::SixHour => Duration::from_secs(6 * 60 * 60),
            Granularity::OneDay => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> u64 {
        self.duration().as_secs()
    }

    /// API 문자열 표현.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "ONE_MINUTE",
            Granularity::FiveMinute => "FIVE_MINUTE",
            Granularity::FifteenMinute => "FIFTEEN_MINUTE",
            Granularity::ThirtyMinute => "THIRTY_MINUTE",
            Granularity::OneHour => "ONE_HOUR",
            Granularity::TwoHour => "TWO_HOUR",
            Granularity::SixHour => "SIX_HOUR",
            Granularity::OneDay => "ONE_DAY",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ONE_MINUTE" | "1M" => Ok(Granularity::OneMinute),
            "FIVE_MINUTE" | "5M" => Ok(Granularity::FiveMinute),
            "FIFTEEN_MINUTE" | "15M" => Ok(Granularity::FifteenMinute),
            "THIRTY_MINUTE" | "30M" => Ok(Granularity::ThirtyMinute),
            "ONE_HOUR" | "1H" => Ok(Granularity::OneHour),
            "TWO_HOUR" | "2H" => Ok(Granularity::TwoHour),
            "SIX_HOUR" | "6H" => Ok(Granularity::SixHour),
            "ONE_DAY" | "1D" => Ok(Granularity::OneDay),
            _ => Err(format!("Unknown granularity: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_parse() {
        assert_eq!("ONE_HOUR".parse::<Granularity>().unwrap(), Granularity::OneHour);
        assert_eq!("one_day".parse::<Granularity>().unwrap(), Granularity::OneDay);
        assert_eq!("15m".parse::<Granularity>().unwrap(), Granularity::FifteenMinute);
        assert!("weekly".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_granularity_serde_matches_display() {
        let json = serde_json::to_string(&Granularity::SixHour).unwrap();
        assert_eq!(json, "\"SIX_HOUR\"");
        assert_eq!(Granularity::SixHour.to_string(), "SIX_HOUR");
        assert_eq!(Granularity::default(), Granularity::OneHour);
        assert_eq!(Granularity::FiveMinute.as_secs(), 300);
    }
}
