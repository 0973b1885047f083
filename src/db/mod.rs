//! Database Module
//!
//! 클라이언트 로컬 상태를 SQLite 파일에 보관합니다.

mod schema;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::error::DocgenError;
use crate::models::ActiveProject;

/// 공유 가능한 데이터베이스 상태
pub struct DbState(pub Mutex<Database>);

/// 데이터베이스 래퍼
pub struct Database {
    conn: Connection,
}

impl Database {
    /// 새 데이터베이스 연결 생성
    pub fn new(path: &Path) -> Result<Self, DocgenError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// 메모리 DB (테스트, 직접 모드용)
    pub fn in_memory() -> Result<Self, DocgenError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// 데이터베이스 스키마 초기화
    pub fn initialize(&self) -> Result<(), DocgenError> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    pub fn get_state(&self, key: &str) -> Result<Option<String>, DocgenError> {
        let value = self
            .conn
            .query_row("SELECT value FROM app_state WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_state(&self, key: &str, value: &str) -> Result<(), DocgenError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT OR REPLACE INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
            (key, value, now),
        )?;
        Ok(())
    }

    /// 저장된 활성 프로젝트 로드
    ///
    /// ID와 이름이 모두 있어야 유효합니다. ID가 정수가 아니면 손상된 값으로 보고 삭제합니다.
    pub fn load_active_project(&self) -> Result<Option<ActiveProject>, DocgenError> {
        let id = self.get_state(schema::KEY_SELECTED_PROJECT_ID)?;
        let name = self.get_state(schema::KEY_SELECTED_PROJECT_NAME)?;

        let (Some(id), Some(name)) = (id, name) else {
            return Ok(None);
        };

        match id.trim().parse() {
            Ok(id) => Ok(Some(ActiveProject { id, name })),
            Err(_) => {
                log::warn!("[Scope] Discarding corrupt stored project id: {:?}", id);
                self.clear_active_project()?;
                Ok(None)
            }
        }
    }

    /// 활성 프로젝트 저장 (ID와 이름을 한 트랜잭션으로)
    pub fn save_active_project(&self, project: &ActiveProject) -> Result<(), DocgenError> {
        let tx = self.conn.unchecked_transaction()?;
        let now = chrono::Utc::now().timestamp_millis();

        tx.execute(
            "INSERT OR REPLACE INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
            (schema::KEY_SELECTED_PROJECT_ID, project.id.to_string(), now),
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
            (schema::KEY_SELECTED_PROJECT_NAME, &project.name, now),
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn clear_active_project(&self) -> Result<(), DocgenError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM app_state WHERE key IN (?1, ?2)",
            (schema::KEY_SELECTED_PROJECT_ID, schema::KEY_SELECTED_PROJECT_NAME),
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_active_project_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("state.db");

        {
            let db = Database::new(&db_path).unwrap();
            db.initialize().unwrap();
            db.save_active_project(&ActiveProject { id: 7, name: "Multas".into() })
                .unwrap();
        }

        let db = Database::new(&db_path).unwrap();
        db.initialize().unwrap();
        let loaded = db.load_active_project().unwrap();
        assert_eq!(loaded, Some(ActiveProject { id: 7, name: "Multas".into() }));
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db.save_active_project(&ActiveProject { id: 1, name: "P".into() })
            .unwrap();
        db.clear_active_project().unwrap();

        assert_eq!(db.load_active_project().unwrap(), None);
        assert_eq!(db.get_state(schema::KEY_SELECTED_PROJECT_NAME).unwrap(), None);
    }

    #[test]
    fn test_corrupt_id_is_discarded() {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db.set_state(schema::KEY_SELECTED_PROJECT_ID, "not-a-number").unwrap();
        db.set_state(schema::KEY_SELECTED_PROJECT_NAME, "Broken").unwrap();

        assert_eq!(db.load_active_project().unwrap(), None);
        assert_eq!(db.get_state(schema::KEY_SELECTED_PROJECT_ID).unwrap(), None);
    }

    #[test]
    fn test_name_without_id_is_not_a_project() {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db.set_state(schema::KEY_SELECTED_PROJECT_NAME, "Orphan").unwrap();
        assert_eq!(db.load_active_project().unwrap(), None);
    }
}
