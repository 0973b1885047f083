//! Project Scope Store
//!
//! 현재 선택된 프로젝트(id, name)를 보관합니다. 시작 시 로컬 DB에서 복원하고,
//! 변경될 때마다 다시 기록하여 프로세스 재시작 후에도 유지됩니다.
//!
//! 전역 싱글톤 대신 복제 가능한 핸들로 만들어 각 컴포넌트 생성자에 명시적으로 전달합니다.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use crate::db::{Database, DbState};
use crate::error::DocgenError;
use crate::models::{ActiveProject, ProjectId};

/// 활성 프로젝트 스코프 핸들
#[derive(Clone)]
pub struct ProjectScope {
    db: Arc<DbState>,
    active: Arc<RwLock<Option<ActiveProject>>>,
}

impl ProjectScope {
    /// 로컬 DB 파일을 열고 저장된 선택 상태를 복원
    pub fn open(path: &Path) -> Result<Self, DocgenError> {
        let db = Database::new(path)?;
        Self::from_database(db)
    }

    /// 영속화 없이 메모리에서만 동작하는 스코프
    pub fn in_memory() -> Result<Self, DocgenError> {
        Self::from_database(Database::in_memory()?)
    }

    fn from_database(db: Database) -> Result<Self, DocgenError> {
        db.initialize()?;
        let restored = db.load_active_project()?;
        if let Some(project) = &restored {
            log::info!("[Scope] Restored project {} ({})", project.id, project.name);
        }

        Ok(Self {
            db: Arc::new(DbState(Mutex::new(db))),
            active: Arc::new(RwLock::new(restored)),
        })
    }

    /// 현재 선택된 프로젝트
    pub fn current(&self) -> Option<ActiveProject> {
        self.active
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.current().map(|project| project.id)
    }

    /// 프로젝트가 선택되어 있지 않으면 즉시 실패
    pub fn require(&self) -> Result<ActiveProject, DocgenError> {
        self.current()
            .ok_or_else(|| DocgenError::validation("No project selected. Select a project first."))
    }

    pub fn select_project(&self, id: ProjectId, name: impl Into<String>) -> Result<(), DocgenError> {
        let project = ActiveProject { id, name: name.into() };
        self.with_db(|db| db.save_active_project(&project))?;

        log::info!("[Scope] Selected project {} ({})", project.id, project.name);
        *self.write_active() = Some(project);
        Ok(())
    }

    pub fn clear_project(&self) -> Result<(), DocgenError> {
        self.with_db(|db| db.clear_active_project())?;
        *self.write_active() = None;
        log::info!("[Scope] Project cleared");
        Ok(())
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, DocgenError>,
    ) -> Result<T, DocgenError> {
        let db = self.db.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&db)
    }

    fn write_active(&self) -> std::sync::RwLockWriteGuard<'_, Option<ActiveProject>> {
        self.active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_require_fails_without_project() {
        let scope = ProjectScope::in_memory().unwrap();
        let err = scope.require().unwrap_err();
        assert!(matches!(err, DocgenError::Validation(_)));
    }

    #[test]
    fn test_selection_is_shared_between_clones() {
        let scope = ProjectScope::in_memory().unwrap();
        let other = scope.clone();

        scope.select_project(3, "Predial").unwrap();
        assert_eq!(other.project_id(), Some(3));

        other.clear_project().unwrap();
        assert!(scope.current().is_none());
    }

    #[test]
    fn test_selection_survives_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");

        {
            let scope = ProjectScope::open(&path).unwrap();
            scope.select_project(12, "Multas 2024").unwrap();
        }

        let scope = ProjectScope::open(&path).unwrap();
        assert_eq!(
            scope.require().unwrap(),
            ActiveProject { id: 12, name: "Multas 2024".into() }
        );

        scope.clear_project().unwrap();
        drop(scope);

        let scope = ProjectScope::open(&path).unwrap();
        assert!(scope.current().is_none());
    }
}
