//! Docgen - 템플릿 기반 문서 생성 클라이언트 라이브러리
//!
//! 원격 생성 서비스를 대상으로 프로젝트 선택, 템플릿 등록, 데이터 헤더 추출,
//! 플레이스홀더 매핑, 생성 작업 제출/폴링을 담당합니다.

pub mod commands;
pub mod config;
pub mod datasource;
pub mod db;
pub mod error;
pub mod jobs;
pub mod mapping;
pub mod models;
pub mod registry;
pub mod scope;
pub mod suggest;
pub mod templates;
pub mod utils;
pub mod workflow;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::commands::data::HeadersArgs;
use crate::commands::job::{DownloadJobArgs, GenerateArgs, JobIdArgs, WaitJobArgs};
use crate::commands::mapping::{ListMappingsArgs, PreviewMappingArgs, SaveMappingArgs};
use crate::commands::project::{CreateProjectArgs, SelectProjectArgs};
use crate::commands::template::{TemplateFileArgs, TemplateIdArgs};
use crate::config::Settings;
use crate::error::{CommandError, CommandResult, DocgenError};
use crate::workflow::{Workflow, WorkflowMode};

#[derive(Debug, Parser)]
#[command(name = "docgen", version, about = "Generate documents from templates and tabular data")]
pub struct Cli {
    /// 워크플로 모드 (project | direct), DOCGEN_MODE보다 우선
    #[arg(long, global = true)]
    pub mode: Option<WorkflowMode>,
    /// 원격 서비스 URL, DOCGEN_API_BASE보다 우선
    #[arg(long, global = true)]
    pub api_base: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 프로젝트 관리
    #[command(subcommand)]
    Project(ProjectCommand),
    /// 템플릿 등록/조회
    #[command(subcommand)]
    Template(TemplateCommand),
    /// 매핑 미리보기/저장
    #[command(subcommand)]
    Mapping(MappingCommand),
    /// 데이터 파일의 헤더 출력
    Headers(HeadersArgs),
    /// 문서 생성
    Generate(GenerateArgs),
    /// 작업 조회/다운로드
    #[command(subcommand)]
    Job(JobCommand),
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    Create(CreateProjectArgs),
    List,
    Select(SelectProjectArgs),
    Current,
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    Register(TemplateFileArgs),
    Placeholders(TemplateFileArgs),
    List,
    Show(TemplateIdArgs),
}

#[derive(Debug, Subcommand)]
pub enum MappingCommand {
    List(ListMappingsArgs),
    Preview(PreviewMappingArgs),
    Save(SaveMappingArgs),
}

#[derive(Debug, Subcommand)]
pub enum JobCommand {
    List,
    Status(JobIdArgs),
    Wait(WaitJobArgs),
    Download(DownloadJobArgs),
}

/// env_logger 초기화 (기본 필터: info, 출력: stderr)
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn settings_for(cli: &Cli) -> Result<Settings, DocgenError> {
    let mut settings = Settings::from_env()?;
    if let Some(mode) = cli.mode {
        settings.mode = mode;
    }
    if let Some(base) = &cli.api_base {
        settings.api_base = config::parse_base_url(base)
            .map_err(|e| DocgenError::validation(format!("--api-base: {}", e)))?;
    }
    Ok(settings)
}

/// 성공 결과는 stdout, 에러는 stderr에 JSON으로 출력
fn emit<T: Serialize>(result: CommandResult<T>) -> ExitCode {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to serialize result: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(error) => {
            let json = serde_json::to_string_pretty(&error)
                .unwrap_or_else(|_| format!("{}: {}", error.code, error.message));
            eprintln!("{}", json);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command, workflow: &mut Workflow) -> ExitCode {
    use crate::commands::{data, job, mapping, project, template};

    match command {
        Command::Project(cmd) => match cmd {
            ProjectCommand::Create(args) => emit(project::create_project(args, workflow).await),
            ProjectCommand::List => emit(project::list_projects(workflow).await),
            ProjectCommand::Select(args) => emit(project::select_project(args, workflow).await),
            ProjectCommand::Current => emit(project::current_project(workflow)),
            ProjectCommand::Clear => emit(project::clear_project(workflow)),
        },
        Command::Template(cmd) => match cmd {
            TemplateCommand::Register(args) => emit(template::register_template(args, workflow).await),
            TemplateCommand::Placeholders(args) => emit(template::detect_placeholders(args, workflow).await),
            TemplateCommand::List => emit(template::list_templates(workflow).await),
            TemplateCommand::Show(args) => emit(template::show_template(args, workflow).await),
        },
        Command::Mapping(cmd) => match cmd {
            MappingCommand::List(args) => emit(mapping::list_mappings(args, workflow).await),
            MappingCommand::Preview(args) => emit(mapping::preview_mapping(args, workflow).await),
            MappingCommand::Save(args) => emit(mapping::save_mapping(args, workflow).await),
        },
        Command::Headers(args) => emit(data::read_headers(args).await),
        Command::Generate(args) => emit(job::generate(args, workflow).await),
        Command::Job(cmd) => match cmd {
            JobCommand::List => emit(job::list_jobs(workflow).await),
            JobCommand::Status(args) => emit(job::job_status(args, workflow).await),
            JobCommand::Wait(args) => emit(job::wait_job(args, workflow).await),
            JobCommand::Download(args) => emit(job::download_job(args, workflow).await),
        },
    }
}

/// CLI 진입점
pub async fn run() -> ExitCode {
    config::load_env();
    init_logging();

    let cli = Cli::parse();
    if let Command::Headers(args) = cli.command {
        return emit(commands::data::read_headers(args).await);
    }

    let workflow = settings_for(&cli).and_then(|settings| {
        log::debug!(
            "[Docgen] mode={:?} api={} state={}",
            settings.mode,
            settings.api_base,
            settings.state_db.display()
        );
        Workflow::from_settings(&settings)
    });

    match workflow {
        Ok(mut workflow) => dispatch(cli.command, &mut workflow).await,
        Err(e) => emit::<()>(Err(CommandError::from(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_requires_one_template_source() {
        let parsed = Cli::try_parse_from([
            "docgen", "generate", "--template-id", "4", "--data", "d.csv", "--map", "A=a", "--rows", "3",
        ]);
        assert!(parsed.is_ok());

        let both = Cli::try_parse_from([
            "docgen", "generate", "--template", "t.docx", "--template-id", "4", "--data", "d.csv",
        ]);
        assert!(both.is_err());

        let neither = Cli::try_parse_from(["docgen", "generate", "--data", "d.csv"]);
        assert!(neither.is_err());
    }

    #[test]
    fn test_global_mode_flag() {
        let cli = Cli::try_parse_from(["docgen", "headers", "d.csv", "--mode", "direct"]).unwrap();
        assert_eq!(cli.mode, Some(WorkflowMode::Direct));
    }
}
