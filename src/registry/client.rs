//! 원격 생성 서비스 REST 클라이언트
//!
//! 템플릿 등록, 매핑 저장, 작업 제출/조회/다운로드를 위한 HTTP 호출을 담당합니다.
//! 자동 재시도는 하지 않습니다.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::DocgenError;
use crate::models::{FieldMapping, JobId, Project, ProjectId, TemplateId};
use crate::registry::types::*;
use crate::utils::mime_for;

/// 원격 생성 서비스 클라이언트
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base: Url,
}

impl RegistryClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, DocgenError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DocgenError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| DocgenError::validation(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// 결과 참조(`/jobs/{id}/download` 등)를 절대 URL로 변환
    pub fn resolve(&self, reference: &str) -> Result<Url, DocgenError> {
        match Url::parse(reference) {
            Ok(url) => Ok(url),
            Err(_) => self.endpoint(reference),
        }
    }

    /// 비정상 응답을 ServerError로 변환
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DocgenError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|error| error.message())
            .unwrap_or_else(|| format!("Server error (HTTP {})", status.as_u16()));

        log::warn!("[Registry] Request failed with status {}: {}", status, detail);
        Err(DocgenError::Server {
            status: status.as_u16(),
            detail,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, DocgenError> {
        let response = Self::check_status(request.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn file_part(file: &UploadFile) -> Result<Part, DocgenError> {
        Ok(Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(mime_for(&file.file_name))?)
    }

    // ---- 프로젝트 ----

    pub async fn create_project(&self, name: &str) -> Result<Project, DocgenError> {
        let url = self.endpoint("projects")?;
        log::info!("[Registry] Creating project: {}", name);
        Self::send_json(self.http.post(url).json(&CreateProjectRequest { name })).await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, DocgenError> {
        let url = self.endpoint("projects")?;
        Self::send_json(self.http.get(url)).await
    }

    pub async fn list_project_jobs(&self, project_id: ProjectId) -> Result<Vec<JobSummary>, DocgenError> {
        let url = self.endpoint(&format!("projects/{}/jobs", project_id))?;
        Self::send_json(self.http.get(url)).await
    }

    pub async fn list_project_templates(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<TemplateSummary>, DocgenError> {
        let url = self.endpoint(&format!("projects/{}/templates", project_id))?;
        Self::send_json(self.http.get(url)).await
    }

    // ---- 템플릿 ----

    pub async fn register_template(
        &self,
        file: &UploadFile,
        project_id: ProjectId,
    ) -> Result<TemplateRegistration, DocgenError> {
        let url = self.endpoint("templates")?;
        let form = Form::new()
            .part("file", Self::file_part(file)?)
            .text("project_id", project_id.to_string());

        log::info!("[Registry] Registering template {} in project {}", file.file_name, project_id);
        Self::send_json(self.http.post(url).multipart(form)).await
    }

    pub async fn detect_placeholders(&self, file: &UploadFile) -> Result<DetectedPlaceholders, DocgenError> {
        let url = self.endpoint("templates/placeholders")?;
        let form = Form::new().part("file", Self::file_part(file)?);

        log::info!("[Registry] Detecting placeholders in {}", file.file_name);
        Self::send_json(self.http.post(url).multipart(form)).await
    }

    pub async fn get_template(&self, template_id: TemplateId) -> Result<TemplateDetails, DocgenError> {
        let url = self.endpoint(&format!("templates/{}", template_id))?;
        Self::send_json(self.http.get(url)).await
    }

    pub async fn get_placeholders(&self, template_id: TemplateId) -> Result<PlaceholderList, DocgenError> {
        let url = self.endpoint(&format!("templates/{}/placeholders", template_id))?;
        Self::send_json(self.http.get(url)).await
    }

    // ---- 매핑 ----

    pub async fn list_template_mappings(
        &self,
        template_id: TemplateId,
    ) -> Result<Vec<MappingRecord>, DocgenError> {
        let url = self.endpoint(&format!("templates/{}/mappings", template_id))?;
        Self::send_json(self.http.get(url)).await
    }

    pub async fn save_mapping(&self, request: &SaveMappingRequest<'_>) -> Result<MappingRecord, DocgenError> {
        let url = self.endpoint("mappings")?;
        log::info!(
            "[Registry] Saving mapping '{}' for template {}",
            request.name,
            request.template_id
        );
        Self::send_json(self.http.post(url).json(request)).await
    }

    // ---- 작업 ----

    pub async fn submit_job(
        &self,
        template_id: TemplateId,
        data_file: &UploadFile,
        mapping: &FieldMapping,
        project_id: ProjectId,
        row_limit: Option<u32>,
    ) -> Result<JobSubmitted, DocgenError> {
        let url = self.endpoint("jobs")?;
        let mut form = Form::new()
            .text("template_id", template_id.to_string())
            .part("data_file", Self::file_part(data_file)?)
            .text("mappings_json", mapping.to_json_string()?)
            .text("project_id", project_id.to_string());
        if let Some(rows) = row_limit {
            form = form.text("num_rows_to_generate", rows.to_string());
        }

        log::info!(
            "[Registry] Submitting job for template {} (rows: {:?})",
            template_id,
            row_limit
        );
        Self::send_json(self.http.post(url).multipart(form)).await
    }

    pub async fn poll_job(&self, job_id: &str) -> Result<JobPoll, DocgenError> {
        let url = self.endpoint(&format!("jobs/{}", job_id))?;
        Self::send_json(self.http.get(url)).await
    }

    /// 결과 파일 바이트 스트림 (버퍼링/검증 없이 그대로 전달)
    pub async fn download(
        &self,
        job_id: &JobId,
    ) -> Result<BoxStream<'static, Result<Bytes, DocgenError>>, DocgenError> {
        let url = self.endpoint(&format!("jobs/{}/download", job_id))?;
        log::info!("[Registry] Downloading result of job {}", job_id);

        let response = Self::check_status(self.http.get(url).send().await?).await?;
        Ok(response.bytes_stream().map_err(DocgenError::from).boxed())
    }

    /// 동기식 일괄 생성 (직접 모드): 결과 파일을 바로 받음
    pub async fn generate_bulk(
        &self,
        template_file: &UploadFile,
        data_file: &UploadFile,
        mapping: &FieldMapping,
    ) -> Result<Bytes, DocgenError> {
        let url = self.endpoint("generate/bulk")?;
        let form = Form::new()
            .part("template_file", Self::file_part(template_file)?)
            .part("data_file", Self::file_part(data_file)?)
            .text("mappings_json", mapping.to_json_string()?);

        log::info!("[Registry] Bulk generation for {}", template_file.file_name);
        let response = Self::check_status(self.http.post(url).multipart(form).send().await?).await?;
        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_base_url;

    #[test]
    fn test_resolve_joins_relative_references() {
        let client = RegistryClient::new(
            parse_base_url("http://gen.local/api").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            client.resolve("/jobs/abc/download").unwrap().as_str(),
            "http://gen.local/api/jobs/abc/download"
        );
        assert_eq!(
            client.resolve("https://files.local/out.zip").unwrap().as_str(),
            "https://files.local/out.zip"
        );
    }
}
