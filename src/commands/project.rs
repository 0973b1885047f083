//! Project Commands
//!
//! 프로젝트 생성/조회 및 활성 프로젝트 선택

use clap::Args;
use serde::Serialize;

use crate::error::{CommandResult, DocgenError};
use crate::models::{ActiveProject, Project, ProjectId};
use crate::workflow::Workflow;

#[derive(Debug, Args)]
pub struct CreateProjectArgs {
    pub name: String,
    /// 생성 후 바로 활성 프로젝트로 선택
    #[arg(long)]
    pub select: bool,
}

#[derive(Debug, Args)]
pub struct SelectProjectArgs {
    pub project_id: ProjectId,
}

/// 목록 항목 (활성 여부 포함)
#[derive(Debug, Serialize)]
pub struct ProjectListing {
    #[serde(flatten)]
    pub project: Project,
    pub active: bool,
}

/// 새 프로젝트 생성
pub async fn create_project(args: CreateProjectArgs, workflow: &Workflow) -> CommandResult<Project> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(DocgenError::validation("Project name must not be empty").into());
    }

    let project = workflow.client().create_project(name).await?;
    if args.select {
        workflow.scope().select_project(project.id, project.name.clone())?;
    }
    Ok(project)
}

/// 프로젝트 목록
pub async fn list_projects(workflow: &Workflow) -> CommandResult<Vec<ProjectListing>> {
    let active = workflow.scope().project_id();
    let projects = workflow.client().list_projects().await?;

    Ok(projects
        .into_iter()
        .map(|project| ProjectListing {
            active: Some(project.id) == active,
            project,
        })
        .collect())
}

/// 활성 프로젝트 선택 (서버에 존재하는 프로젝트만)
pub async fn select_project(args: SelectProjectArgs, workflow: &Workflow) -> CommandResult<ActiveProject> {
    let projects = workflow.client().list_projects().await?;
    let project = projects
        .into_iter()
        .find(|p| p.id == args.project_id)
        .ok_or_else(|| DocgenError::validation(format!("Project {} not found", args.project_id)))?;

    workflow.scope().select_project(project.id, project.name.clone())?;
    Ok(ActiveProject {
        id: project.id,
        name: project.name,
    })
}

pub fn current_project(workflow: &Workflow) -> CommandResult<Option<ActiveProject>> {
    Ok(workflow.scope().current())
}

pub fn clear_project(workflow: &Workflow) -> CommandResult<()> {
    workflow.scope().clear_project()?;
    Ok(())
}
