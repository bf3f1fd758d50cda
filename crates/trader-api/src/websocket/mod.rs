//! 실시간 이벤트 스트리밍을 위한 WebSocket 서버.
//!
//! 연결된 클라이언트에게 포지션 변경, 거래 기록, 전략 실행 결과를 푸시합니다.
//!
//! # 메시지 형식
//!
//! ## 클라이언트 → 서버
//!
//! ```json
//! {"type": "ping"}
//! ```
//!
//! ## 서버 → 클라이언트
//!
//! ```json
//! {"type": "welcome", "data": {"version": "0.1.0", "timestamp": 1738300800000}}
//! {"type": "position", "data": {"event": "opened", "position": {...}, "timestamp": "..."}}
//! {"type": "trade", "data": {"position_id": "...", "side": "SELL", ...}}
//! {"type": "strategy", "data": {"symbol": "BTC-USD", "success": true, ...}}
//! {"type": "pong", "data": {"timestamp": 1738300800000}}
//! ```

pub mod handler;
pub mod messages;

pub use handler::{websocket_handler, websocket_router};
pub use messages::{ClientMessage, ServerMessage, WsError};
