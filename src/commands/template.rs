//! Template Commands

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::error::CommandResult;
use crate::models::TemplateId;
use crate::registry::{TemplateDetails, TemplateSummary};
use crate::templates::TemplateRef;
use crate::workflow::Workflow;

#[derive(Debug, Args)]
pub struct TemplateFileArgs {
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct TemplateIdArgs {
    pub template_id: TemplateId,
}

#[derive(Debug, Serialize)]
pub struct TemplateView {
    pub template_id: Option<TemplateId>,
    pub name: Option<String>,
    pub placeholders: Vec<String>,
}

impl From<&TemplateRef> for TemplateView {
    fn from(template: &TemplateRef) -> Self {
        Self {
            template_id: template.template_id(),
            name: template.name.clone(),
            placeholders: template.placeholders.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateDetailsView {
    #[serde(flatten)]
    pub details: TemplateDetails,
    pub placeholders: Vec<String>,
}

/// 템플릿 등록 (직접 모드에서는 플레이스홀더 감지만)
pub async fn register_template(args: TemplateFileArgs, workflow: &mut Workflow) -> CommandResult<TemplateView> {
    let template = workflow.use_template_file(&args.file).await?;
    Ok(TemplateView::from(template))
}

/// 등록하지 않고 플레이스홀더만 감지
pub async fn detect_placeholders(args: TemplateFileArgs, workflow: &Workflow) -> CommandResult<TemplateView> {
    let template = workflow.templates().detect_placeholders(&args.file).await?;
    Ok(TemplateView::from(&template))
}

pub async fn list_templates(workflow: &Workflow) -> CommandResult<Vec<TemplateSummary>> {
    Ok(workflow.templates().list_templates().await?)
}

pub async fn show_template(args: TemplateIdArgs, workflow: &Workflow) -> CommandResult<TemplateDetailsView> {
    let details = workflow.templates().template_details(args.template_id).await?;
    let placeholders = workflow
        .templates()
        .select_existing_template(args.template_id)
        .await?
        .placeholders;
    Ok(TemplateDetailsView { details, placeholders })
}
