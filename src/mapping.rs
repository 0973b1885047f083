//! Mapping Builder
//!
//! 활성 (템플릿, 데이터 소스) 쌍에 대한 작업 매핑(플레이스홀더 → 컬럼)과,
//! 활성 프로젝트에 속한 저장된 매핑 목록을 관리합니다.
//!
//! - 자동 채움: 대소문자만 무시한 정확 일치
//! - 쓰기 시에는 검증하지 않고, 완성 여부는 제출 시점에 확인
//! - 저장된 매핑 목록은 항상 활성 프로젝트로 필터링

use serde::Serialize;

use crate::datasource::DataSource;
use crate::error::DocgenError;
use crate::models::{FieldMapping, MappingId, ProjectId};
use crate::registry::{MappingRecord, RegistryClient, SaveMappingRequest};
use crate::scope::ProjectScope;
use crate::suggest::{MappingSuggester, Suggestion};
use crate::templates::TemplateRef;

/// 헤더 중 소문자 형태가 같은 첫 번째 컬럼으로 채우고, 없으면 빈 값
pub fn auto_seed(placeholders: &[String], headers: &[String]) -> FieldMapping {
    placeholders
        .iter()
        .map(|placeholder| {
            let wanted = placeholder.to_lowercase();
            let column = headers
                .iter()
                .find(|header| header.to_lowercase() == wanted)
                .cloned()
                .unwrap_or_default();
            (placeholder.clone(), column)
        })
        .collect()
}

/// 저장된 매핑을 불러온 결과
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub mapping_id: MappingId,
    /// 현재 템플릿에 없는 키 (작업 매핑에서 제외됨)
    pub stale_keys: Vec<String>,
    /// 저장된 매핑에 없어 비어 있는 플레이스홀더
    pub unmapped: Vec<String>,
}

impl LoadReport {
    pub fn is_exact(&self) -> bool {
        self.stale_keys.is_empty() && self.unmapped.is_empty()
    }
}

/// 매핑 빌더
pub struct MappingBuilder {
    client: RegistryClient,
    scope: ProjectScope,
    template: Option<TemplateRef>,
    /// 템플릿을 고른 시점의 활성 프로젝트
    bound_project: Option<ProjectId>,
    headers: Vec<String>,
    working: FieldMapping,
    saved: Vec<MappingRecord>,
}

impl MappingBuilder {
    pub fn new(client: RegistryClient, scope: ProjectScope) -> Self {
        Self {
            client,
            scope,
            template: None,
            bound_project: None,
            headers: Vec::new(),
            working: FieldMapping::new(),
            saved: Vec::new(),
        }
    }

    /// 템플릿 변경: 데이터 소스, 작업 매핑, 저장된 매핑 목록을 모두 초기화
    pub fn set_template(&mut self, template: TemplateRef) -> &TemplateRef {
        self.headers.clear();
        self.working = FieldMapping::new();
        self.saved.clear();
        self.bound_project = self.scope.project_id();
        self.template.insert(template)
    }

    /// 템플릿을 고른 뒤 활성 프로젝트가 바뀌었는지
    pub fn is_stale(&self) -> bool {
        self.template.is_some() && self.bound_project != self.scope.project_id()
    }

    /// 프로젝트가 바뀌었으면 템플릿부터 모든 상태를 버림. 버렸으면 true.
    pub fn sync_scope(&mut self) -> bool {
        if !self.is_stale() {
            return false;
        }
        log::info!(
            "[Mapping] Active project changed ({:?} -> {:?}), template selection reset",
            self.bound_project,
            self.scope.project_id()
        );
        self.template = None;
        self.bound_project = None;
        self.headers.clear();
        self.working = FieldMapping::new();
        self.saved.clear();
        true
    }

    /// 현재 프로젝트에서 유효한 템플릿
    pub fn template(&self) -> Option<&TemplateRef> {
        if self.is_stale() {
            return None;
        }
        self.template.as_ref()
    }

    pub fn placeholders(&self) -> &[String] {
        self.template()
            .map(|t| t.placeholders.as_slice())
            .unwrap_or(&[])
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 새 데이터 소스의 헤더로 작업 매핑을 다시 만듦 (이전 매핑은 버림)
    pub fn attach_headers(&mut self, headers: Vec<String>) -> Result<&FieldMapping, DocgenError> {
        self.sync_scope();
        if self.template.is_none() {
            return Err(DocgenError::validation(
                "Select or upload a template before loading a data source",
            ));
        }

        self.headers = headers;
        self.working = auto_seed(self.placeholders(), &self.headers);
        log::info!(
            "[Mapping] Seeded {}/{} placeholders from {} columns",
            self.working.len() - self.working.empty_keys().len(),
            self.working.len(),
            self.headers.len()
        );
        Ok(&self.working)
    }

    pub fn attach_data_source(&mut self, source: &DataSource) -> Result<&FieldMapping, DocgenError> {
        self.attach_headers(source.headers().to_vec())
    }

    /// 한 쌍만 덮어쓰기. 현재 템플릿에 없는 플레이스홀더면 무시하고 false 반환.
    pub fn set_mapping(&mut self, placeholder: &str, column: impl Into<String>) -> bool {
        if !self.placeholders().iter().any(|p| p == placeholder) {
            log::warn!("[Mapping] Unknown placeholder ignored: {}", placeholder);
            return false;
        }
        self.working.set(placeholder, column);
        true
    }

    pub fn working(&self) -> &FieldMapping {
        &self.working
    }

    /// 모든 플레이스홀더에 비어 있지 않은 컬럼이 지정되었는지
    pub fn is_complete(&self) -> bool {
        self.placeholders()
            .iter()
            .all(|p| self.working.get(p).is_some_and(|column| !column.is_empty()))
    }

    /// 아직 매핑되지 않은 플레이스홀더
    pub fn unmapped(&self) -> Vec<&str> {
        self.placeholders()
            .iter()
            .filter(|p| self.working.get(p).map_or(true, str::is_empty))
            .map(String::as_str)
            .collect()
    }

    /// 활성 프로젝트의 저장된 매핑 (필터 적용됨)
    pub fn saved(&self) -> &[MappingRecord] {
        if self.is_stale() {
            return &[];
        }
        &self.saved
    }

    fn retain_in_scope(&self, records: Vec<MappingRecord>) -> Vec<MappingRecord> {
        let Some(project_id) = self.scope.project_id() else {
            return Vec::new();
        };
        records
            .into_iter()
            .filter(|record| record.project_id == Some(project_id))
            .collect()
    }

    /// 현재 템플릿의 저장된 매핑 목록 갱신
    pub async fn refresh_saved(&mut self) -> Result<&[MappingRecord], DocgenError> {
        self.sync_scope();
        let template_id = self
            .template
            .as_ref()
            .and_then(TemplateRef::template_id)
            .ok_or_else(|| DocgenError::validation("Saved mappings require a registered template"))?;

        let records = self.client.list_template_mappings(template_id).await?;
        self.saved = self.retain_in_scope(records);
        Ok(&self.saved)
    }

    /// 작업 매핑을 이름을 붙여 저장
    pub async fn save_mapping(&mut self, name: &str) -> Result<&MappingRecord, DocgenError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DocgenError::validation("Mapping name must not be empty"));
        }
        self.sync_scope();
        let template_id = self
            .template
            .as_ref()
            .and_then(TemplateRef::template_id)
            .ok_or_else(|| DocgenError::validation("Select a template before saving a mapping"))?;
        let project = self.scope.require()?;

        let request = SaveMappingRequest {
            name,
            template_id,
            mapping_data: &self.working,
            project_id: project.id,
        };
        let record = self.client.save_mapping(&request).await?;
        log::info!("[Mapping] Saved mapping {} ('{}')", record.id, record.name);

        let mut kept = self.retain_in_scope(vec![record]);
        let record = kept
            .pop()
            .ok_or_else(|| DocgenError::validation("Saved mapping belongs to another project"))?;
        let index = self.saved.len();
        self.saved.push(record);
        Ok(&self.saved[index])
    }

    /// 저장된 매핑으로 작업 매핑을 통째로 교체
    ///
    /// 현재 플레이스홀더가 아닌 키는 제외하고, 빠진 플레이스홀더는 빈 값으로 둡니다.
    pub fn load_mapping(&mut self, mapping_id: MappingId) -> Result<LoadReport, DocgenError> {
        let record = self
            .saved()
            .iter()
            .find(|record| record.id == mapping_id)
            .ok_or_else(|| {
                DocgenError::validation(format!("Mapping {} is not available in this project", mapping_id))
            })?;

        let placeholders = self.placeholders();
        let stale_keys: Vec<String> = record
            .mapping_data
            .keys()
            .filter(|key| !placeholders.iter().any(|p| p == *key))
            .map(str::to_string)
            .collect();

        let working: FieldMapping = placeholders
            .iter()
            .map(|p| (p.clone(), record.mapping_data.get(p).unwrap_or_default().to_string()))
            .collect();

        let unmapped: Vec<String> = placeholders
            .iter()
            .filter(|p| !record.mapping_data.contains_key(p))
            .cloned()
            .collect();

        if !stale_keys.is_empty() {
            log::warn!(
                "[Mapping] Mapping {} has keys not in the template: {:?}",
                mapping_id,
                stale_keys
            );
        }

        self.working = working;
        Ok(LoadReport {
            mapping_id,
            stale_keys,
            unmapped,
        })
    }

    /// 추천 서비스 호출 (실패해도 빈 목록)
    pub async fn suggest(&self, suggester: &dyn MappingSuggester) -> Vec<Suggestion> {
        let placeholders = self.placeholders();
        if placeholders.is_empty() || self.headers.is_empty() {
            return Vec::new();
        }

        match suggester.suggest(placeholders, &self.headers).await {
            Ok(suggestions) => suggestions
                .into_iter()
                .filter(|s| placeholders.contains(&s.placeholder) && self.headers.contains(&s.column))
                .collect(),
            Err(e) => {
                log::warn!("[Mapping] Suggestion service failed: {}", e);
                Vec::new()
            }
        }
    }

    pub fn accept_suggestion(&mut self, suggestion: &Suggestion) -> bool {
        self.set_mapping(&suggestion.placeholder, suggestion.column.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_base_url;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn builder_with(placeholders: &[&str]) -> MappingBuilder {
        let client = RegistryClient::new(
            parse_base_url("http://127.0.0.1:9").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        let scope = ProjectScope::in_memory().unwrap();
        let mut builder = MappingBuilder::new(client, scope);
        builder.set_template(TemplateRef::registered(1, None, strings(placeholders)));
        builder
    }

    #[test]
    fn test_auto_seed_is_case_insensitive_exact() {
        let seeded = auto_seed(&strings(&["Name", "Email"]), &strings(&["name", "EMAIL", "phone"]));
        let expected: FieldMapping = [("Name", "name"), ("Email", "EMAIL")].into_iter().collect();
        assert_eq!(seeded, expected);
    }

    #[test]
    fn test_auto_seed_leaves_unmatched_empty_and_takes_first_duplicate() {
        let seeded = auto_seed(
            &strings(&["FIRST_NAME", "Total"]),
            &strings(&["first name", "total", "TOTAL"]),
        );
        assert_eq!(seeded.get("FIRST_NAME"), Some(""));
        assert_eq!(seeded.get("Total"), Some("total"));
    }

    #[test]
    fn test_completeness_gates_on_every_placeholder() {
        let mut builder = builder_with(&["FIRSTNAME", "LASTNAME"]);
        builder
            .attach_headers(strings(&["firstname", "apellido"]))
            .unwrap();
        assert!(!builder.is_complete());
        assert_eq!(builder.unmapped(), vec!["LASTNAME"]);

        assert!(builder.set_mapping("LASTNAME", "apellido"));
        assert!(builder.is_complete());

        builder.set_mapping("LASTNAME", "");
        assert!(!builder.is_complete());
    }

    #[test]
    fn test_set_mapping_ignores_unknown_placeholder() {
        let mut builder = builder_with(&["A"]);
        builder.attach_headers(strings(&["a"])).unwrap();
        assert!(!builder.set_mapping("B", "a"));
        assert_eq!(builder.working().len(), 1);
    }

    #[test]
    fn test_new_data_source_discards_previous_mapping() {
        let mut builder = builder_with(&["A", "B"]);
        builder.attach_headers(strings(&["x", "y"])).unwrap();
        builder.set_mapping("A", "x");
        builder.set_mapping("B", "y");
        assert!(builder.is_complete());

        builder.attach_headers(strings(&["a", "z"])).unwrap();
        assert_eq!(builder.working().get("A"), Some("a"));
        assert_eq!(builder.working().get("B"), Some(""));
    }

    #[test]
    fn test_headers_require_template() {
        let client = RegistryClient::new(
            parse_base_url("http://127.0.0.1:9").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        let mut builder = MappingBuilder::new(client, ProjectScope::in_memory().unwrap());
        assert!(matches!(
            builder.attach_headers(strings(&["a"])),
            Err(DocgenError::Validation(_))
        ));
    }

    #[test]
    fn test_project_switch_drops_template_state() {
        let mut builder = builder_with(&["A"]);
        builder.attach_headers(strings(&["a"])).unwrap();
        assert!(builder.is_complete());

        builder.scope.select_project(3, "Predial").unwrap();
        assert!(builder.is_stale());
        assert!(builder.template().is_none());
        assert!(builder.placeholders().is_empty());

        assert!(builder.sync_scope());
        assert!(!builder.is_stale());
        assert!(builder.working().is_empty());
        assert!(builder.headers().is_empty());
        assert!(matches!(
            builder.attach_headers(strings(&["a"])),
            Err(DocgenError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_save_validates_locally_before_network() {
        let mut builder = builder_with(&["A"]);
        builder.attach_headers(strings(&["a"])).unwrap();

        // 이름이 비어 있음
        assert!(matches!(builder.save_mapping("  ").await, Err(DocgenError::Validation(_))));
        // 프로젝트 미선택 (네트워크에 닿으면 포트 9에서 Network 에러가 났을 것)
        assert!(matches!(builder.save_mapping("base").await, Err(DocgenError::Validation(_))));
    }

    #[test]
    fn test_load_unknown_mapping_fails() {
        let mut builder = builder_with(&["A"]);
        assert!(matches!(builder.load_mapping(99), Err(DocgenError::Validation(_))));
    }

    #[test]
    fn test_load_drops_stale_keys_and_reports_them() {
        let mut builder = builder_with(&["A", "C"]);
        builder.attach_headers(strings(&["x", "y"])).unwrap();
        builder.saved.push(MappingRecord {
            id: 5,
            name: "old".into(),
            template_id: 1,
            project_id: Some(1),
            mapping_data: [("A", "x"), ("B", "y")].into_iter().collect(),
            created_at: None,
        });

        let report = builder.load_mapping(5).unwrap();
        assert_eq!(report.stale_keys, vec!["B"]);
        assert_eq!(report.unmapped, vec!["C"]);
        assert!(!report.is_exact());

        let expected: FieldMapping = [("A", "x"), ("C", "")].into_iter().collect();
        assert_eq!(builder.working(), &expected);
    }

    struct FixedSuggester(Vec<Suggestion>);

    #[async_trait]
    impl MappingSuggester for FixedSuggester {
        async fn suggest(&self, _: &[String], _: &[String]) -> Result<Vec<Suggestion>, DocgenError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSuggester;

    #[async_trait]
    impl MappingSuggester for FailingSuggester {
        async fn suggest(&self, _: &[String], _: &[String]) -> Result<Vec<Suggestion>, DocgenError> {
            Err(DocgenError::Server { status: 503, detail: "model offline".into() })
        }
    }

    #[tokio::test]
    async fn test_suggestions_are_optional_hints() {
        let mut builder = builder_with(&["FirstName", "Role"]);
        builder
            .attach_headers(strings(&["employee_first_name", "role"]))
            .unwrap();

        let suggester = FixedSuggester(vec![
            Suggestion { placeholder: "FirstName".into(), column: "employee_first_name".into(), confidence: 0.8 },
            Suggestion { placeholder: "Ghost".into(), column: "role".into(), confidence: 0.9 },
            Suggestion { placeholder: "Role".into(), column: "missing_column".into(), confidence: 0.5 },
        ]);
        let suggestions = builder.suggest(&suggester).await;
        assert_eq!(suggestions.len(), 1);

        // 추천은 자동 적용되지 않음
        assert_eq!(builder.working().get("FirstName"), Some(""));
        assert!(builder.accept_suggestion(&suggestions[0]));
        assert!(builder.is_complete());

        assert!(builder.suggest(&FailingSuggester).await.is_empty());
    }
}
