//! Mapping Commands
//!
//! 매핑 미리보기(자동 채움 + 추천), 저장, 저장된 매핑 목록

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::template::TemplateView;
use super::{prepare_mapping, TemplateInput};
use crate::error::{CommandResult, DocgenError};
use crate::mapping::LoadReport;
use crate::models::{FieldMapping, MappingId, TemplateId};
use crate::registry::MappingRecord;
use crate::suggest::{NameSimilaritySuggester, Suggestion};
use crate::workflow::Workflow;

#[derive(Debug, Args)]
pub struct ListMappingsArgs {
    pub template_id: TemplateId,
}

/// 템플릿, 데이터 파일, 매핑 조정 옵션 (preview/save/generate 공통)
#[derive(Debug, Args)]
pub struct MappingInputArgs {
    #[command(flatten)]
    pub template: TemplateInput,
    /// CSV 또는 스프레드시트 데이터 파일
    #[arg(long)]
    pub data: PathBuf,
    /// 적용할 저장된 매핑 ID
    #[arg(long = "mapping-id")]
    pub mapping_id: Option<MappingId>,
    /// 수동 지정 `PLACEHOLDER=column` (반복 가능)
    #[arg(long = "map", value_name = "PLACEHOLDER=COLUMN")]
    pub assignments: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PreviewMappingArgs {
    #[command(flatten)]
    pub input: MappingInputArgs,
    /// 이름 유사도 기반 추천 포함
    #[arg(long)]
    pub suggest: bool,
}

#[derive(Debug, Args)]
pub struct SaveMappingArgs {
    #[arg(long)]
    pub name: String,
    #[command(flatten)]
    pub input: MappingInputArgs,
}

#[derive(Debug, Serialize)]
pub struct MappingView {
    pub template: TemplateView,
    pub headers: Vec<String>,
    pub mapping: FieldMapping,
    pub unmapped: Vec<String>,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded: Option<LoadReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
}

/// 템플릿의 저장된 매핑 (활성 프로젝트 것만)
pub async fn list_mappings(args: ListMappingsArgs, workflow: &mut Workflow) -> CommandResult<Vec<MappingRecord>> {
    workflow.use_existing_template(args.template_id).await?;
    Ok(workflow.refresh_saved().await?.to_vec())
}

/// 자동 채움 결과와 미매핑 플레이스홀더 확인
pub async fn preview_mapping(args: PreviewMappingArgs, workflow: &mut Workflow) -> CommandResult<MappingView> {
    let input = &args.input;
    let loaded = prepare_mapping(
        workflow,
        &input.template,
        &input.data,
        input.mapping_id,
        &input.assignments,
    )
    .await?;

    let builder = workflow.mapping();
    let suggestions = if args.suggest {
        builder.suggest(&NameSimilaritySuggester).await
    } else {
        Vec::new()
    };

    let template = builder
        .template()
        .map(TemplateView::from)
        .ok_or_else(|| DocgenError::validation("No template selected"))?;

    Ok(MappingView {
        template,
        headers: builder.headers().to_vec(),
        mapping: builder.working().clone(),
        unmapped: builder.unmapped().into_iter().map(str::to_string).collect(),
        complete: builder.is_complete(),
        loaded,
        suggestions,
    })
}

/// 현재 매핑을 이름을 붙여 저장
pub async fn save_mapping(args: SaveMappingArgs, workflow: &mut Workflow) -> CommandResult<MappingRecord> {
    let input = &args.input;
    prepare_mapping(
        workflow,
        &input.template,
        &input.data,
        input.mapping_id,
        &input.assignments,
    )
    .await?;

    let unmapped = workflow.mapping().unmapped().len();
    if unmapped > 0 {
        log::warn!("[Mapping] Saving '{}' with {} unmapped placeholders", args.name, unmapped);
    }

    Ok(workflow.save_mapping(&args.name).await?.clone())
}
