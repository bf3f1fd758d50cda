//! 서버 전반에서 사용되는 공통 타입.

mod decimal;
mod granularity;

pub use decimal::*;
pub use granularity::*;
