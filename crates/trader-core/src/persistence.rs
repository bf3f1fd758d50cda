//! JSON 파일 저장소 헬퍼.
//!
//! 포지션과 자격증명은 단일 JSON 파일에 통째로 저장합니다. 읽기는 전부
//! 아니면 전무(all-or-nothing)이며, 쓰기는 같은 디렉터리의 임시 파일에 쓴 뒤
//! `rename`으로 교체하여 부분적으로 기록된 파일이 남지 않게 합니다.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{TraderError, TraderResult};

/// JSON 파일을 읽습니다.
///
/// 파일이 없으면 기본값을 반환합니다. 파일이 손상되었으면 경고를 남기고
/// 기본값을 반환합니다.
pub fn load_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!(path = %path.display(), "Store file not found, starting empty");
            T::default()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Store file unreadable, starting empty");
            T::default()
        }
    }
}

/// JSON 파일을 읽습니다. 파일이 없으면 `Ok(None)`.
pub fn read_json<T>(path: &Path) -> TraderResult<Option<T>>
where
    T: DeserializeOwned,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(TraderError::Persistence(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    serde_json::from_slice(&bytes).map(Some).map_err(|e| {
        TraderError::Persistence(format!("corrupt store file {}: {}", path.display(), e))
    })
}

/// 값을 JSON으로 직렬화하여 원자적으로 저장합니다.
///
/// 임시 파일 이름은 호출마다 고유하므로 같은 경로에 동시에 저장해도 서로의
/// 임시 파일을 덮어쓰지 않습니다. 마지막으로 교체한 쪽의 내용이 남습니다.
pub fn save_json_atomic<T>(path: &Path, value: &T) -> TraderResult<()>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value)?;

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)
                .map_err(|e| persistence_error("create directory", parent, e))?;
            parent
        }
        None => Path::new("."),
    };

    // 실패 시 NamedTempFile이 drop되면서 임시 파일을 지웁니다.
    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| persistence_error("create temp file in", dir, e))?;
    tmp.write_all(&bytes)
        .map_err(|e| persistence_error("write", tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| persistence_error("sync", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| persistence_error("replace", path, e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Store file saved");
    Ok(())
}

fn persistence_error(action: &str, path: &Path, err: std::io::Error) -> TraderError {
    TraderError::Persistence(format!("failed to {} {}: {}", action, path.display(), err))
}
