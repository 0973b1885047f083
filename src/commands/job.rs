//! Job Commands
//!
//! 문서 생성 실행, 작업 상태 조회, 결과 다운로드

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use super::mapping::MappingInputArgs;
use super::prepare_mapping;
use crate::error::{CommandResult, DocgenError};
use crate::jobs::{failure_detail, progress_message, PollHandle};
use crate::mapping::LoadReport;
use crate::models::{JobId, JobOutcome, JobStatus};
use crate::registry::JobSummary;
use crate::utils::validate_output_path;
use crate::workflow::{Generation, Workflow};

/// 직접 모드 결과의 기본 저장 경로
pub const DEFAULT_BUNDLE_NAME: &str = "generated_documents.zip";

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub input: MappingInputArgs,
    /// 생성할 최대 행 수
    #[arg(long)]
    pub rows: Option<i64>,
    /// 결과 파일 저장 경로
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// 제출만 하고 폴링하지 않음
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Args)]
pub struct JobIdArgs {
    pub job_id: JobId,
}

#[derive(Debug, Args)]
pub struct WaitJobArgs {
    pub job_id: JobId,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DownloadJobArgs {
    pub job_id: JobId,
    #[arg(long)]
    pub out: PathBuf,
}

/// 생성/대기 결과
#[derive(Debug, Default, Serialize)]
pub struct GenerateReport {
    pub job_id: Option<JobId>,
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded: Option<LoadReport>,
}

#[derive(Debug, Serialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub result_url: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadView {
    pub job_id: JobId,
    pub saved_to: PathBuf,
    pub bytes: u64,
}

/// 진행 메시지를 로그로 출력 (폴링 태스크가 끝나면 함께 종료)
fn report_progress(poller: &PollHandle) {
    let mut updates = poller.subscribe();
    let job_id = poller.job_id().to_string();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            match state.message {
                Some(message) => log::info!("[Generate] {} {}: {}", job_id, state.status, message),
                None => log::info!("[Generate] {} {}", job_id, state.status),
            }
        }
    });
}

/// 서버가 준 상대 경로를 절대 URL로 (해석할 수 없으면 그대로)
fn absolute_url(workflow: &Workflow, reference: String) -> String {
    match workflow.client().resolve(&reference) {
        Ok(url) => url.to_string(),
        Err(e) => {
            log::debug!("[Jobs] Keeping result reference as-is ({}): {}", e, reference);
            reference
        }
    }
}

async fn finish(
    workflow: &Workflow,
    job_id: Option<JobId>,
    outcome: JobOutcome,
    out: Option<&Path>,
) -> CommandResult<GenerateReport> {
    let mut report = GenerateReport {
        job_id: job_id.clone(),
        status: outcome.status(),
        ..Default::default()
    };

    match outcome {
        JobOutcome::Succeeded { result_url } => {
            if let (Some(path), Some(job_id)) = (out, job_id.as_ref()) {
                report.bytes = Some(workflow.jobs().download_to(job_id, path).await?);
                report.saved_to = Some(path.to_path_buf());
            }
            report.result_url = Some(absolute_url(workflow, result_url));
        }
        JobOutcome::Failed { detail } => report.detail = Some(detail),
        JobOutcome::Delivered { bytes } => {
            let path = out.unwrap_or_else(|| Path::new(DEFAULT_BUNDLE_NAME));
            validate_output_path(path)?;
            tokio::fs::write(path, &bytes).await.map_err(DocgenError::from)?;
            report.bytes = Some(bytes.len() as u64);
            report.saved_to = Some(path.to_path_buf());
        }
        JobOutcome::Abandoned => report.detail = Some("Polling stopped before the job finished".into()),
    }

    Ok(report)
}

/// 템플릿 + 데이터 + 매핑으로 문서 생성
pub async fn generate(args: GenerateArgs, workflow: &mut Workflow) -> CommandResult<GenerateReport> {
    let input = &args.input;
    let loaded = prepare_mapping(
        workflow,
        &input.template,
        &input.data,
        input.mapping_id,
        &input.assignments,
    )
    .await?;

    let generation = workflow.generate(args.rows).await?;
    let mut report = match generation {
        Generation::Submitted { job_id, poller } if args.no_wait => {
            poller.cancel();
            GenerateReport {
                job_id: Some(job_id),
                status: Some(JobStatus::Pending),
                ..Default::default()
            }
        }
        Generation::Submitted { job_id, poller } => {
            report_progress(&poller);
            let outcome = poller.wait().await;
            finish(workflow, Some(job_id), outcome, args.out.as_deref()).await?
        }
        Generation::Finished(outcome) => finish(workflow, None, outcome, args.out.as_deref()).await?,
    };

    report.loaded = loaded;
    Ok(report)
}

/// 활성 프로젝트의 작업 목록
pub async fn list_jobs(workflow: &Workflow) -> CommandResult<Vec<JobSummary>> {
    Ok(workflow.jobs().list_jobs().await?)
}

/// 상태 한 번 조회
pub async fn job_status(args: JobIdArgs, workflow: &Workflow) -> CommandResult<JobStatusView> {
    let poll = workflow.client().poll_job(&args.job_id).await?;
    let message = match poll.status {
        JobStatus::Failure => Some(failure_detail(poll.info.as_ref())),
        _ => progress_message(&poll),
    };

    Ok(JobStatusView {
        job_id: args.job_id,
        status: poll.status,
        result_url: poll.result_url.map(|url| absolute_url(workflow, url)),
        message,
    })
}

/// 기존 작업이 끝날 때까지 폴링
pub async fn wait_job(args: WaitJobArgs, workflow: &Workflow) -> CommandResult<GenerateReport> {
    let poller = workflow.jobs().poll(args.job_id.clone());
    report_progress(&poller);
    let outcome = poller.wait().await;
    finish(workflow, Some(args.job_id), outcome, args.out.as_deref()).await
}

pub async fn download_job(args: DownloadJobArgs, workflow: &Workflow) -> CommandResult<DownloadView> {
    let bytes = workflow.jobs().download_to(&args.job_id, &args.out).await?;
    Ok(DownloadView {
        job_id: args.job_id,
        saved_to: args.out,
        bytes,
    })
}
