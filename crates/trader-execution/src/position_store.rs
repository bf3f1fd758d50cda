//! 파일 기반 포지션 저장소.
//!
//! 제공 기능:
//! - 포지션 생성, 부분 업데이트, 삭제
//! - 포지션 ID를 키로 하는 JSON 파일에 전체 집합을 원자적으로 저장
//! - 변경 이벤트 브로드캐스트
//!
//! 모든 변경은 하나의 뮤텍스 안에서 "파일 읽기 → 수정 → 저장" 순서로
//! 수행됩니다. 엔진이 같은 파일을 갱신할 수 있으므로 매 작업마다 파일을 다시
//! 읽으며, 저장이 실패하면 파일은 이전 상태 그대로 남습니다.
//!
//! 조회는 읽을 수 없는 파일을 빈 집합으로 보지만, 변경 작업은 파일을 읽지
//! 못하면 `Persistence` 에러로 중단합니다. 빈 집합을 덮어써 기존 포지션을
//! 지우지 않기 위해서입니다.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};
use trader_core::persistence::{load_json_or_default, read_json, save_json_atomic};
use trader_core::{
    require_positive, NewPosition, Position, PositionUpdate, Price, Quantity, TraderError,
    TraderResult,
};
use uuid::Uuid;

/// 포지션 이벤트 채널 용량.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 포지션 ID → 포지션.
pub type PositionMap = BTreeMap<String, Position>;

/// 포지션 이벤트 타입.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PositionEvent {
    /// 포지션 오픈
    Opened {
        position: Position,
        timestamp: DateTime<Utc>,
    },
    /// 손절/익절/수량 변경
    Updated {
        position: Position,
        timestamp: DateTime<Utc>,
    },
    /// 포지션 종료 (저장소에서 삭제)
    Closed {
        position_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl PositionEvent {
    /// 이벤트에서 포지션 ID를 가져온다.
    pub fn position_id(&self) -> &str {
        match self {
            PositionEvent::Opened { position, .. } => &position.id,
            PositionEvent::Updated { position, .. } => &position.id,
            PositionEvent::Closed { position_id, .. } => position_id,
        }
    }
}

/// 오픈 포지션 저장소.
///
/// 포지션 집합의 유일한 기록자입니다. 여러 요청 핸들러가 `Arc`로 공유합니다.
#[derive(Debug)]
pub struct PositionStore {
    /// 포지션 파일 경로
    path: PathBuf,
    /// read-modify-persist 직렬화
    write_lock: Mutex<()>,
    /// 청산 진행 중인 포지션 ID
    closing: Mutex<HashSet<String>>,
    /// 변경 이벤트
    events: broadcast::Sender<PositionEvent>,
}

impl PositionStore {
    /// 지정된 파일을 사용하는 저장소를 연다. 파일은 첫 저장 시 생성된다.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            closing: Mutex::new(HashSet::new()),
            events,
        }
    }

    /// 저장소 파일 경로.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 포지션 이벤트를 구독한다.
    pub fn subscribe(&self) -> broadcast::Receiver<PositionEvent> {
        self.events.subscribe()
    }

    // ==================== 조회 ====================

    /// 현재 포지션 전체를 읽는다.
    ///
    /// 파일이 없거나 손상되었으면 경고를 남기고 빈 집합을 반환한다.
    pub fn load_all(&self) -> PositionMap {
        with_ids_from_keys(load_json_or_default(&self.path))
    }

    /// 오픈 시각 순으로 정렬된 포지션 목록.
    pub fn snapshot(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.load_all().into_values().collect();
        positions.sort_by_key(|p| p.opened_at);
        positions
    }

    /// ID로 포지션을 조회한다.
    pub fn get(&self, id: &str) -> Option<Position> {
        self.load_all().remove(id)
    }

    // ==================== 포지션 생성 ====================

    /// 새 포지션을 추가하고 ID를 반환한다.
    ///
    /// 저장에 실패하면 `Persistence` 에러를 반환하며 포지션은 존재하지 않는다.
    pub fn add(&self, request: NewPosition) -> TraderResult<String> {
        request.validate()?;

        let position = {
            let _guard = self.lock();
            let mut positions = self.read_for_update()?;

            let mut id = Uuid::new_v4().to_string();
            while positions.contains_key(&id) {
                id = Uuid::new_v4().to_string();
            }

            let position = Position::from_request(id.clone(), request);
            positions.insert(id, position.clone());
            self.persist(&positions)?;
            position
        };

        info!(
            position_id = %position.id,
            entry_price = %position.entry_price,
            size = %position.size,
            "Position opened"
        );
        self.emit(PositionEvent::Opened {
            position: position.clone(),
            timestamp: Utc::now(),
        });

        Ok(position.id)
    }

    // ==================== 포지션 업데이트 ====================

    /// 손절가를 변경한다.
    pub fn update_stop_loss(&self, id: &str, stop_loss: Price) -> TraderResult<Position> {
        self.update(
            id,
            PositionUpdate {
                stop_loss: Some(stop_loss),
                ..Default::default()
            },
        )
    }

    /// 익절가를 변경한다.
    pub fn update_take_profit(&self, id: &str, take_profit: Price) -> TraderResult<Position> {
        self.update(
            id,
            PositionUpdate {
                take_profit: Some(take_profit),
                ..Default::default()
            },
        )
    }

    /// 수량을 변경한다.
    pub fn update_size(&self, id: &str, size: Quantity) -> TraderResult<Position> {
        require_positive("size", size)?;
        self.update(
            id,
            PositionUpdate {
                size: Some(size),
                ..Default::default()
            },
        )
    }

    /// 여러 필드를 한 번의 잠금과 저장으로 변경한다.
    ///
    /// 변경할 필드가 없으면 저장 없이 현재 포지션을 반환한다.
    pub fn update(&self, id: &str, update: PositionUpdate) -> TraderResult<Position> {
        update.validate()?;

        let position = {
            let _guard = self.lock();
            let mut positions = self.read_for_update()?;

            let position = positions
                .get_mut(id)
                .ok_or_else(|| TraderError::NotFound(format!("position {}", id)))?;
            if update.is_empty() {
                return Ok(position.clone());
            }

            position.apply(&update);
            let updated = position.clone();
            self.persist(&positions)?;
            updated
        };

        debug!(
            position_id = %id,
            stop_loss = ?position.stop_loss,
            take_profit = ?position.take_profit,
            size = %position.size,
            "Position updated"
        );
        self.emit(PositionEvent::Updated {
            position: position.clone(),
            timestamp: Utc::now(),
        });

        Ok(position)
    }

    // ==================== 포지션 종료 ====================

    /// 포지션을 삭제하고 삭제된 포지션을 반환한다.
    pub fn remove(&self, id: &str) -> TraderResult<Position> {
        let removed = {
            let _guard = self.lock();
            let mut positions = self.read_for_update()?;

            let removed = positions
                .remove(id)
                .ok_or_else(|| TraderError::NotFound(format!("position {}", id)))?;
            self.persist(&positions)?;
            removed
        };

        info!(position_id = %id, "Position closed");
        self.emit(PositionEvent::Closed {
            position_id: id.to_string(),
            timestamp: Utc::now(),
        });

        Ok(removed)
    }

    /// 포지션 청산을 시작한다.
    ///
    /// 같은 ID의 청산이 이미 진행 중이면 `Conflict`. 반환된 [`CloseClaim`]이
    /// drop될 때까지 같은 포지션에 대한 다른 청산은 시작할 수 없다.
    pub fn begin_close(&self, id: &str) -> TraderResult<CloseClaim<'_>> {
        let mut closing = self.closing.lock().unwrap_or_else(PoisonError::into_inner);
        if !closing.insert(id.to_string()) {
            return Err(TraderError::Conflict(format!("position {} is already closing", id)));
        }
        Ok(CloseClaim {
            store: self,
            id: id.to_string(),
        })
    }

    // ==================== 집계 ====================

    /// 오픈 포지션 수.
    pub fn len(&self) -> usize {
        self.load_all().len()
    }

    /// 오픈 포지션이 없는지 확인한다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ==================== 내부 ====================

    fn lock(&self) -> MutexGuard<'_, ()> {
        // 보호 대상 데이터가 없으므로 poison 상태도 그대로 사용한다.
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 변경 작업용 읽기. 파일이 없을 때만 빈 집합이다.
    fn read_for_update(&self) -> TraderResult<PositionMap> {
        let positions: Option<PositionMap> = read_json(&self.path)?;
        Ok(with_ids_from_keys(positions.unwrap_or_default()))
    }

    fn persist(&self, positions: &PositionMap) -> TraderResult<()> {
        save_json_atomic(&self.path, positions)
    }

    fn emit(&self, event: PositionEvent) {
        // 구독자가 없으면 전송 실패는 무시한다.
        let _ = self.events.send(event);
    }
}

/// 진행 중인 청산 표시. drop되면 해제된다.
#[derive(Debug)]
pub struct CloseClaim<'a> {
    store: &'a PositionStore,
    id: String,
}

impl CloseClaim<'_> {
    /// 청산 중인 포지션 ID.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for CloseClaim<'_> {
    fn drop(&mut self) {
        self.store
            .closing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// 키에만 ID가 있는 예전 형식의 항목을 채운다.
fn with_ids_from_keys(mut positions: PositionMap) -> PositionMap {
    for (id, position) in positions.iter_mut() {
        if position.id.is_empty() {
            position.id = id.clone();
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn temp_store() -> (tempfile::TempDir, PositionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::open(dir.path().join("positions.json"));
        (dir, store)
    }

    fn request() -> NewPosition {
        NewPosition::new(dec!(50000), dec!(0.1))
            .with_stop_loss(dec!(47500))
            .with_take_profit(dec!(55000))
            .with_dynamic_stop_loss(true, dec!(3))
    }

    #[test]
    fn test_add_then_load_all() {
        let (_dir, store) = temp_store();
        assert!(store.is_empty());

        let id = store.add(request()).unwrap();
        let positions = store.load_all();

        let position = positions.get(&id).unwrap();
        assert_eq!(position.id, id);
        assert_eq!(position.entry_price, dec!(50000));
        assert_eq!(position.size, dec!(0.1));
        assert_eq!(position.stop_loss, Some(dec!(47500)));
        assert_eq!(position.take_profit, Some(dec!(55000)));
        assert!(position.dynamic_stop_loss);
        assert_eq!(position.atr_multiplier, dec!(3));
    }

    #[test]
    fn test_add_rejects_invalid_input() {
        let (_dir, store) = temp_store();
        let err = store.add(NewPosition::new(dec!(0), dec!(1))).unwrap_err();
        assert!(matches!(err, TraderError::InvalidInput(_)));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_remove() {
        let (_dir, store) = temp_store();
        let id = store.add(request()).unwrap();

        let removed = store.remove(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(!store.load_all().contains_key(&id));

        assert!(matches!(store.remove(&id), Err(TraderError::NotFound(_))));
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.update_size("missing", dec!(1)),
            Err(TraderError::NotFound(_))
        ));
        assert!(matches!(
            store.update_stop_loss("missing", dec!(1)),
            Err(TraderError::NotFound(_))
        ));
        assert!(matches!(
            store.update_take_profit("missing", dec!(1)),
            Err(TraderError::NotFound(_))
        ));
    }

    #[test]
    fn test_single_field_updates_persist() {
        let (_dir, store) = temp_store();
        let id = store.add(request()).unwrap();

        store.update_stop_loss(&id, dec!(48000)).unwrap();
        store.update_take_profit(&id, dec!(60000)).unwrap();
        store.update_size(&id, dec!(0.05)).unwrap();

        // 새 인스턴스로 다시 읽어도 동일해야 한다
        let reopened = PositionStore::open(store.path());
        let position = reopened.get(&id).unwrap();
        assert_eq!(position.stop_loss, Some(dec!(48000)));
        assert_eq!(position.take_profit, Some(dec!(60000)));
        assert_eq!(position.size, dec!(0.05));
    }

    #[test]
    fn test_update_rejects_non_positive_values() {
        let (_dir, store) = temp_store();
        let id = store.add(request()).unwrap();

        assert!(matches!(
            store.update_size(&id, dec!(0)),
            Err(TraderError::InvalidInput(_))
        ));
        assert!(matches!(
            store.update_stop_loss(&id, dec!(-1)),
            Err(TraderError::InvalidInput(_))
        ));
        assert_eq!(store.get(&id).unwrap().size, dec!(0.1));
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "{{{").unwrap();
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn test_mutations_refuse_unreadable_file() {
        let (_dir, store) = temp_store();
        let id = store.add(request()).unwrap();
        let original = std::fs::read_to_string(store.path()).unwrap();

        // 쓰기 도중 깨진 파일을 흉내 낸다
        std::fs::write(store.path(), &original[..original.len() / 2]).unwrap();
        let truncated = std::fs::read_to_string(store.path()).unwrap();

        assert!(matches!(store.add(request()), Err(TraderError::Persistence(_))));
        assert!(matches!(
            store.update_size(&id, dec!(1)),
            Err(TraderError::Persistence(_))
        ));
        assert!(matches!(store.remove(&id), Err(TraderError::Persistence(_))));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), truncated);

        // 파일이 복구되면 기존 포지션이 그대로 남아 있다
        std::fs::write(store.path(), &original).unwrap();
        assert!(store.get(&id).is_some());
    }

    #[test]
    fn test_close_claim_is_exclusive() {
        let (_dir, store) = temp_store();
        let id = store.add(request()).unwrap();

        let claim = store.begin_close(&id).unwrap();
        assert_eq!(claim.id(), id);
        assert!(matches!(store.begin_close(&id), Err(TraderError::Conflict(_))));
        assert!(store.begin_close("other").is_ok());

        drop(claim);
        assert!(store.begin_close(&id).is_ok());
    }

    #[test]
    fn test_missing_id_field_is_filled_from_key() {
        let (_dir, store) = temp_store();
        std::fs::write(
            store.path(),
            r#"{"legacy-1": {"entry_price": "100", "size": "1", "stop_loss": "95"}}"#,
        )
        .unwrap();

        let position = store.get("legacy-1").unwrap();
        assert_eq!(position.id, "legacy-1");
        assert_eq!(position.stop_loss, Some(dec!(95)));
        assert_eq!(position.take_profit, None);
    }

    #[test]
    fn test_failed_write_reports_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        // 디렉터리를 파일 경로로 사용하면 rename이 실패한다
        let blocked = dir.path().join("positions.json");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), "x").unwrap();

        let store = PositionStore::open(&blocked);
        let err = store.add(request()).unwrap_err();
        assert!(matches!(err, TraderError::Persistence(_)));
    }

    #[test]
    fn test_events_are_broadcast() {
        let (_dir, store) = temp_store();
        let mut rx = store.subscribe();

        let id = store.add(request()).unwrap();
        store.update_size(&id, dec!(0.2)).unwrap();
        store.remove(&id).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), PositionEvent::Opened { .. }));
        assert!(matches!(rx.try_recv().unwrap(), PositionEvent::Updated { .. }));
        let closed = rx.try_recv().unwrap();
        assert_eq!(closed.position_id(), id);
    }

    #[test]
    fn test_concurrent_updates_keep_file_consistent() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let ids: Vec<String> = (0..4).map(|_| store.add(request()).unwrap()).collect();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                let id = ids[n % ids.len()].clone();
                std::thread::spawn(move || {
                    for i in 1..=10 {
                        store.update_size(&id, Decimal::from(n * 100 + i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let positions = store.load_all();
        assert_eq!(positions.len(), 4);
        for id in &ids {
            assert!(positions[id].size > Decimal::ZERO);
        }
    }
}
