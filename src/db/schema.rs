//! Database Schema
//!
//! SQLite 테이블 스키마 정의

/// 데이터베이스 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 클라이언트 로컬 상태 (key/value)
CREATE TABLE IF NOT EXISTS app_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// 선택된 프로젝트 ID 키
pub const KEY_SELECTED_PROJECT_ID: &str = "selected_project_id";
/// 선택된 프로젝트 이름 키
pub const KEY_SELECTED_PROJECT_NAME: &str = "selected_project_name";
