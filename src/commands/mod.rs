//! CLI Commands
//!
//! `docgen` 바이너리에서 호출하는 명령어 정의. 각 명령은 `CommandResult<T>`를 반환하고
//! 결과는 JSON으로 출력됩니다.

pub mod data;
pub mod job;
pub mod mapping;
pub mod project;
pub mod template;

use std::path::{Path, PathBuf};

use clap::Args;

use crate::error::DocgenError;
use crate::mapping::LoadReport;
use crate::models::{MappingId, TemplateId};
use crate::workflow::Workflow;

/// 템플릿 지정: 파일 또는 등록된 ID 중 하나
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct TemplateInput {
    /// .docx 템플릿 파일 (프로젝트 모드에서는 등록됨)
    #[arg(long = "template")]
    pub file: Option<PathBuf>,
    /// 이미 등록된 템플릿 ID
    #[arg(long = "template-id")]
    pub id: Option<TemplateId>,
}

/// `PLACEHOLDER=column` 형식 해석 (빈 컬럼은 매핑 해제)
pub fn parse_assignment(raw: &str) -> Result<(String, String), DocgenError> {
    let (placeholder, column) = raw.split_once('=').ok_or_else(|| {
        DocgenError::validation(format!("Expected PLACEHOLDER=column, got '{}'", raw))
    })?;
    let placeholder = placeholder.trim();
    if placeholder.is_empty() {
        return Err(DocgenError::validation(format!("Missing placeholder in '{}'", raw)));
    }
    Ok((placeholder.to_string(), column.trim().to_string()))
}

/// 템플릿 → 데이터 소스 → (저장된 매핑) → 수동 지정 순서로 워크플로 준비
pub(crate) async fn prepare_mapping(
    workflow: &mut Workflow,
    template: &TemplateInput,
    data: &Path,
    mapping_id: Option<MappingId>,
    assignments: &[String],
) -> Result<Option<LoadReport>, DocgenError> {
    match (&template.file, template.id) {
        (Some(file), _) => {
            workflow.use_template_file(file).await?;
        }
        (None, Some(id)) => {
            workflow.use_existing_template(id).await?;
        }
        (None, None) => return Err(DocgenError::validation("A template file or id is required")),
    }

    workflow.load_data_source(data).await?;

    let report = match mapping_id {
        Some(id) => Some(workflow.load_mapping(id).await?),
        None => None,
    };

    for raw in assignments {
        let (placeholder, column) = parse_assignment(raw)?;
        workflow.set_mapping(&placeholder, &column)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("FIRSTNAME = nombre").unwrap(),
            ("FIRSTNAME".to_string(), "nombre".to_string())
        );
        assert_eq!(parse_assignment("EMAIL=").unwrap().1, "");
        assert!(parse_assignment("EMAIL").is_err());
        assert!(parse_assignment("=col").is_err());
    }
}
