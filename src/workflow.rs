//! Generation Workflow
//!
//! 프로젝트 → 템플릿 → 데이터 소스 → 매핑 → 생성 단계를 하나로 묶습니다.
//! 각 단계의 결과가 다음 단계의 입력이며, 미완성 단계를 건너뛸 수 없습니다.
//!
//! 직접 모드(`Direct`)는 프로젝트 없이 템플릿을 등록하지 않고 한 번에 생성합니다.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::datasource::DataSource;
use crate::error::DocgenError;
use crate::jobs::{JobOrchestrator, PollHandle};
use crate::mapping::{LoadReport, MappingBuilder};
use crate::models::{JobId, JobOutcome, MappingId, TemplateId};
use crate::registry::{MappingRecord, RegistryClient};
use crate::scope::ProjectScope;
use crate::templates::{TemplateRef, TemplateRegistry};

/// 워크플로 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    /// 프로젝트 범위 + 비동기 작업 큐
    #[default]
    ProjectScoped,
    /// 프로젝트 없이 동기식 일괄 생성
    Direct,
}

impl FromStr for WorkflowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" | "project_scoped" => Ok(WorkflowMode::ProjectScoped),
            "direct" => Ok(WorkflowMode::Direct),
            other => Err(format!("unknown mode '{}' (expected 'project' or 'direct')", other)),
        }
    }
}

/// 다음에 완료해야 할 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SelectProject,
    ChooseTemplate,
    LoadDataSource,
    CompleteMapping,
    Ready,
}

/// 생성 요청 결과
pub enum Generation {
    /// 프로젝트 모드: 제출된 작업과 폴링 핸들
    Submitted { job_id: JobId, poller: PollHandle },
    /// 직접 모드: 바로 완료됨
    Finished(JobOutcome),
}

impl Generation {
    pub async fn wait(self) -> (Option<JobId>, JobOutcome) {
        match self {
            Generation::Submitted { job_id, poller } => (Some(job_id), poller.wait().await),
            Generation::Finished(outcome) => (None, outcome),
        }
    }
}

pub struct Workflow {
    mode: WorkflowMode,
    client: RegistryClient,
    scope: ProjectScope,
    templates: TemplateRegistry,
    mapping: MappingBuilder,
    jobs: JobOrchestrator,
    data: Option<DataSource>,
}

impl Workflow {
    pub fn new(
        mode: WorkflowMode,
        client: RegistryClient,
        scope: ProjectScope,
        poll_interval: Duration,
    ) -> Self {
        Self {
            mode,
            templates: TemplateRegistry::new(client.clone(), scope.clone()),
            mapping: MappingBuilder::new(client.clone(), scope.clone()),
            jobs: JobOrchestrator::new(client.clone(), scope.clone(), poll_interval),
            client,
            scope,
            data: None,
        }
    }

    /// 설정에서 클라이언트와 스코프를 만들어 워크플로 구성
    pub fn from_settings(settings: &Settings) -> Result<Self, DocgenError> {
        let client = RegistryClient::new(settings.api_base.clone(), settings.http_timeout)?;
        let scope = match settings.mode {
            WorkflowMode::ProjectScoped => ProjectScope::open(&settings.state_db)?,
            WorkflowMode::Direct => ProjectScope::in_memory()?,
        };
        Ok(Self::new(settings.mode, client, scope, settings.poll_interval))
    }

    pub fn mode(&self) -> WorkflowMode {
        self.mode
    }

    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    pub fn scope(&self) -> &ProjectScope {
        &self.scope
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn jobs(&self) -> &JobOrchestrator {
        &self.jobs
    }

    pub fn mapping(&self) -> &MappingBuilder {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut MappingBuilder {
        &mut self.mapping
    }

    pub fn data_source(&self) -> Option<&DataSource> {
        self.data.as_ref()
    }

    pub fn stage(&self) -> Stage {
        if self.mode == WorkflowMode::ProjectScoped && self.scope.current().is_none() {
            Stage::SelectProject
        } else if self.mapping.template().is_none() {
            Stage::ChooseTemplate
        } else if self.data.is_none() {
            Stage::LoadDataSource
        } else if !self.mapping.is_complete() {
            Stage::CompleteMapping
        } else {
            Stage::Ready
        }
    }

    pub fn can_generate(&self) -> bool {
        self.stage() == Stage::Ready
    }

    fn require_project_mode(&self, action: &str) -> Result<(), DocgenError> {
        match self.mode {
            WorkflowMode::ProjectScoped => Ok(()),
            WorkflowMode::Direct => Err(DocgenError::validation(format!(
                "{} is not available in direct mode",
                action
            ))),
        }
    }

    /// 템플릿 파일 사용: 프로젝트 모드는 등록, 직접 모드는 플레이스홀더 감지만
    pub async fn use_template_file(&mut self, path: &Path) -> Result<&TemplateRef, DocgenError> {
        let template = match self.mode {
            WorkflowMode::ProjectScoped => self.templates.register_template(path).await?,
            WorkflowMode::Direct => self.templates.detect_placeholders(path).await?,
        };
        Ok(self.set_template(template))
    }

    /// 이미 등록된 템플릿 사용
    pub async fn use_existing_template(&mut self, template_id: TemplateId) -> Result<&TemplateRef, DocgenError> {
        self.require_project_mode("Reusing a registered template")?;
        self.scope.require()?;
        let template = self.templates.select_existing_template(template_id).await?;
        Ok(self.set_template(template))
    }

    /// 활성 프로젝트가 바뀌었으면 템플릿과 데이터 소스 선택을 초기화
    fn sync_scope(&mut self) {
        if self.mapping.sync_scope() {
            self.data = None;
        }
    }

    fn set_template(&mut self, template: TemplateRef) -> &TemplateRef {
        self.data = None;
        self.mapping.set_template(template)
    }

    /// 데이터 소스 로드 (이전 매핑 상태는 버림)
    pub async fn load_data_source(&mut self, path: &Path) -> Result<&DataSource, DocgenError> {
        self.sync_scope();
        if self.mapping.template().is_none() {
            return Err(DocgenError::validation(
                "Select or upload a template before loading a data source",
            ));
        }
        let source = DataSource::load(path).await?;
        self.mapping.attach_data_source(&source)?;
        Ok(self.data.insert(source))
    }

    pub fn set_mapping(&mut self, placeholder: &str, column: &str) -> Result<(), DocgenError> {
        self.sync_scope();
        if self.data.is_none() {
            return Err(DocgenError::validation("Load a data source before editing the mapping"));
        }
        if !self.mapping.set_mapping(placeholder, column) {
            return Err(DocgenError::validation(format!(
                "'{}' is not a placeholder of the current template",
                placeholder
            )));
        }
        Ok(())
    }

    pub async fn refresh_saved(&mut self) -> Result<&[MappingRecord], DocgenError> {
        self.require_project_mode("Saved mappings")?;
        self.sync_scope();
        self.mapping.refresh_saved().await
    }

    pub async fn save_mapping(&mut self, name: &str) -> Result<&MappingRecord, DocgenError> {
        self.require_project_mode("Saving mappings")?;
        self.sync_scope();
        self.mapping.save_mapping(name).await
    }

    /// 저장된 매핑 적용 (목록이 비어 있으면 먼저 갱신)
    pub async fn load_mapping(&mut self, mapping_id: MappingId) -> Result<LoadReport, DocgenError> {
        self.require_project_mode("Saved mappings")?;
        self.sync_scope();
        if self.data.is_none() {
            return Err(DocgenError::validation("Load a data source before applying a saved mapping"));
        }
        if !self.mapping.saved().iter().any(|record| record.id == mapping_id) {
            self.mapping.refresh_saved().await?;
        }
        self.mapping.load_mapping(mapping_id)
    }

    /// 생성 시작
    pub async fn generate(&self, row_limit: Option<i64>) -> Result<Generation, DocgenError> {
        if self.mapping.is_stale() {
            return Err(DocgenError::validation(
                "The active project changed; choose a template for the new project",
            ));
        }
        let template = self
            .mapping
            .template()
            .ok_or_else(|| DocgenError::validation("No template selected"))?;
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| DocgenError::validation("No data source loaded"))?;
        let mapping = self.mapping.working();

        match self.mode {
            WorkflowMode::ProjectScoped => {
                let job_id = self.jobs.submit(template, data, mapping, row_limit).await?;
                let poller = self.jobs.poll(job_id.clone());
                Ok(Generation::Submitted { job_id, poller })
            }
            WorkflowMode::Direct => {
                if row_limit.is_some() {
                    return Err(DocgenError::validation(
                        "Row limits are only supported for project jobs",
                    ));
                }
                let outcome = self.jobs.run_direct(template, data, mapping).await?;
                Ok(Generation::Finished(outcome))
            }
        }
    }
}
