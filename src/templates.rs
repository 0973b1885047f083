//! Template Registry Adapter
//!
//! 템플릿을 업로드(또는 기존 템플릿을 선택)하고 원격 서비스가 감지한
//! 플레이스홀더 목록을 가져옵니다. 네트워크 실패는 재시도하지 않습니다.

use std::collections::HashSet;
use std::path::Path;

use crate::error::DocgenError;
use crate::models::TemplateId;
use crate::registry::{RegistryClient, TemplateDetails, TemplateSummary, UploadFile};
use crate::scope::ProjectScope;
use crate::utils::{extension_of, file_name_of, validate_input_file};

/// 템플릿 출처
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    /// 원격 서비스에 등록된 템플릿
    Registered(TemplateId),
    /// 등록 없이 요청마다 함께 전송하는 템플릿 파일 (직접 모드)
    Inline(UploadFile),
}

/// 매핑 빌더와 작업 오케스트레이터에 전달되는 템플릿 참조
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRef {
    pub source: TemplateSource,
    pub name: Option<String>,
    /// 순서 유지, 중복 제거된 플레이스홀더
    pub placeholders: Vec<String>,
}

impl TemplateRef {
    pub fn registered(id: TemplateId, name: Option<String>, placeholders: Vec<String>) -> Self {
        Self {
            source: TemplateSource::Registered(id),
            name,
            placeholders: normalize_placeholders(placeholders),
        }
    }

    pub fn inline(file: UploadFile, placeholders: Vec<String>) -> Self {
        let name = Some(file.file_name.clone());
        Self {
            source: TemplateSource::Inline(file),
            name,
            placeholders: normalize_placeholders(placeholders),
        }
    }

    pub fn template_id(&self) -> Option<TemplateId> {
        match &self.source {
            TemplateSource::Registered(id) => Some(*id),
            TemplateSource::Inline(_) => None,
        }
    }
}

/// 순서를 유지한 채 중복과 빈 이름을 제거
pub fn normalize_placeholders(placeholders: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    placeholders
        .into_iter()
        .filter(|p| {
            if p.trim().is_empty() {
                log::warn!("[Templates] Ignoring empty placeholder");
                return false;
            }
            true
        })
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

fn ensure_docx(file_name: &str) -> Result<(), DocgenError> {
    if extension_of(file_name) != "docx" {
        return Err(DocgenError::validation(format!(
            "Template must be a .docx file: {}",
            file_name
        )));
    }
    Ok(())
}

async fn read_template(path: &Path) -> Result<UploadFile, DocgenError> {
    let path = validate_input_file(path)?;
    let file_name = file_name_of(&path);
    ensure_docx(&file_name)?;
    let bytes = tokio::fs::read(&path).await?;
    Ok(UploadFile::new(file_name, bytes))
}

/// 템플릿 레지스트리 어댑터
#[derive(Clone)]
pub struct TemplateRegistry {
    client: RegistryClient,
    scope: ProjectScope,
}

impl TemplateRegistry {
    pub fn new(client: RegistryClient, scope: ProjectScope) -> Self {
        Self { client, scope }
    }

    /// 템플릿 파일 업로드 및 등록
    pub async fn register_template(&self, path: &Path) -> Result<TemplateRef, DocgenError> {
        // 프로젝트 확인을 파일 읽기보다 먼저 수행
        self.scope.require()?;
        let file = read_template(path).await?;
        self.register_upload(file).await
    }

    /// 이미 메모리에 있는 템플릿 파일 등록
    pub async fn register_upload(&self, file: UploadFile) -> Result<TemplateRef, DocgenError> {
        let project = self.scope.require()?;
        ensure_docx(&file.file_name)?;

        let registration = self.client.register_template(&file, project.id).await?;
        log::info!(
            "[Templates] Registered template {} with {} placeholders",
            registration.id,
            registration.placeholders.len()
        );

        Ok(TemplateRef::registered(
            registration.id,
            Some(file.file_name),
            registration.placeholders,
        ))
    }

    /// 기존 템플릿 선택 (재업로드 없이 플레이스홀더만 조회)
    pub async fn select_existing_template(&self, template_id: TemplateId) -> Result<TemplateRef, DocgenError> {
        let list = self.client.get_placeholders(template_id).await?;
        Ok(TemplateRef::registered(template_id, None, list.placeholders))
    }

    /// 등록 없이 플레이스홀더만 감지 (직접 모드)
    pub async fn detect_placeholders(&self, path: &Path) -> Result<TemplateRef, DocgenError> {
        let file = read_template(path).await?;
        self.detect_upload(file).await
    }

    pub async fn detect_upload(&self, file: UploadFile) -> Result<TemplateRef, DocgenError> {
        ensure_docx(&file.file_name)?;
        let detected = self.client.detect_placeholders(&file).await?;
        Ok(TemplateRef::inline(file, detected.placeholders))
    }

    /// 활성 프로젝트의 템플릿 목록
    pub async fn list_templates(&self) -> Result<Vec<TemplateSummary>, DocgenError> {
        let project = self.scope.require()?;
        self.client.list_project_templates(project.id).await
    }

    pub async fn template_details(&self, template_id: TemplateId) -> Result<TemplateDetails, DocgenError> {
        self.client.get_template(template_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_placeholders_are_deduplicated_in_order() {
        let normalized = normalize_placeholders(vec![
            "NOMBRE".into(),
            "FECHA".into(),
            "NOMBRE".into(),
            "".into(),
            "monto".into(),
            "FECHA".into(),
        ]);
        assert_eq!(normalized, vec!["NOMBRE", "FECHA", "monto"]);
    }

    #[test]
    fn test_template_extension_check() {
        assert!(ensure_docx("multa.docx").is_ok());
        assert!(ensure_docx("MULTA.DOCX").is_ok());
        assert!(matches!(ensure_docx("multa.pdf"), Err(DocgenError::Validation(_))));
    }

    #[test]
    fn test_inline_ref_has_no_id() {
        let file = UploadFile::new("carta.docx", &b"PK"[..]);
        let template = TemplateRef::inline(file, vec!["A".into()]);
        assert_eq!(template.template_id(), None);
        assert_eq!(template.name.as_deref(), Some("carta.docx"));
    }
}
