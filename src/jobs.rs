//! Job Orchestrator
//!
//! 생성 작업을 제출하고, 종료 상태(SUCCESS/FAILURE)에 도달할 때까지 고정 간격으로
//! 상태를 폴링합니다. 폴링은 별도 tokio 태스크로 실행되며 [`PollHandle`]로 취소합니다.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::datasource::DataSource;
use crate::error::DocgenError;
use crate::models::{FieldMapping, JobId, JobOutcome, JobStatus};
use crate::registry::{JobPoll, JobSummary, RegistryClient};
use crate::scope::ProjectScope;
use crate::templates::{TemplateRef, TemplateSource};
use crate::utils::validate_output_path;

pub const DEFAULT_FAILURE_DETAIL: &str = "Unknown error during generation.";

/// 폴링 중 관찰된 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollState {
    pub status: JobStatus,
    /// 진행 중일 때 서버가 전달한 메시지 (`info.status`)
    pub message: Option<String>,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            status: JobStatus::Pending,
            message: None,
        }
    }
}

/// 템플릿의 모든 플레이스홀더가 매핑되었는지 확인 (네트워크 호출 전)
pub fn ensure_complete(template: &TemplateRef, mapping: &FieldMapping) -> Result<(), DocgenError> {
    let missing: Vec<&str> = template
        .placeholders
        .iter()
        .filter(|p| mapping.get(p).map_or(true, str::is_empty))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DocgenError::validation(format!(
            "Every placeholder must be mapped to a column. Unmapped: {}",
            missing.join(", ")
        )))
    }
}

fn validate_row_limit(row_limit: Option<i64>) -> Result<Option<u32>, DocgenError> {
    match row_limit {
        None => Ok(None),
        Some(rows) if rows > 0 => u32::try_from(rows)
            .map(Some)
            .map_err(|_| DocgenError::validation(format!("Row limit is too large: {}", rows))),
        Some(rows) => Err(DocgenError::validation(format!(
            "Row limit must be a positive integer, got {}",
            rows
        ))),
    }
}

fn info_str<'a>(info: &'a Value, key: &str) -> Option<&'a str> {
    info.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 실패 사유: info.error → info.status → 문자열 info → 기본 메시지
pub fn failure_detail(info: Option<&Value>) -> String {
    let detail = match info {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
        Some(info) => info_str(info, "error").or_else(|| info_str(info, "status")),
        None => None,
    };
    detail.unwrap_or(DEFAULT_FAILURE_DETAIL).to_string()
}

pub fn progress_message(poll: &JobPoll) -> Option<String> {
    if poll.status.is_terminal() {
        return None;
    }
    poll.info
        .as_ref()
        .and_then(|info| info_str(info, "status"))
        .map(str::to_string)
}

/// 실행 중인 폴링 태스크 핸들
///
/// 핸들을 drop하면 폴링도 중단됩니다.
pub struct PollHandle {
    job_id: JobId,
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    task: Option<JoinHandle<JobOutcome>>,
}

impl PollHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// 마지막으로 관찰된 상태
    pub fn status(&self) -> JobStatus {
        self.state.borrow().status
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// 상태 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 종료 상태(또는 취소)까지 대기
    pub async fn wait(mut self) -> JobOutcome {
        let Some(task) = self.task.take() else {
            return JobOutcome::Abandoned;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("[Jobs] Poller for job {} stopped unexpectedly: {}", self.job_id, e);
                JobOutcome::Abandoned
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    client: RegistryClient,
    job_id: JobId,
    interval: Duration,
    cancel: CancellationToken,
    state: watch::Sender<PollState>,
) -> JobOutcome {
    let mut status = JobStatus::Pending;

    loop {
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = client.poll_job(&job_id) => Some(result),
        };

        match polled {
            None => {
                log::info!("[Jobs] Polling of job {} cancelled", job_id);
                return JobOutcome::Abandoned;
            }
            Some(Ok(poll)) => {
                let next = status.advance(poll.status);
                if next != poll.status {
                    log::debug!(
                        "[Jobs] Ignoring status regression {} -> {} for job {}",
                        status,
                        poll.status,
                        job_id
                    );
                }
                status = next;
                state.send_replace(PollState {
                    status,
                    message: progress_message(&poll),
                });

                match status {
                    JobStatus::Success => {
                        let result_url = poll
                            .result_url
                            .filter(|url| !url.trim().is_empty())
                            .unwrap_or_else(|| format!("/jobs/{}/download", job_id));
                        log::info!("[Jobs] Job {} succeeded: {}", job_id, result_url);
                        return JobOutcome::Succeeded { result_url };
                    }
                    JobStatus::Failure => {
                        let detail = failure_detail(poll.info.as_ref());
                        log::warn!("[Jobs] Job {} failed: {}", job_id, detail);
                        return JobOutcome::Failed { detail };
                    }
                    _ => {}
                }
            }
            // 조회 실패는 기록만 하고 다음 주기에 다시 시도
            Some(Err(e)) => log::warn!("[Jobs] Status check for job {} failed: {}", job_id, e),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("[Jobs] Polling of job {} cancelled", job_id);
                return JobOutcome::Abandoned;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// 작업 오케스트레이터
#[derive(Clone)]
pub struct JobOrchestrator {
    client: RegistryClient,
    scope: ProjectScope,
    poll_interval: Duration,
}

impl JobOrchestrator {
    pub fn new(client: RegistryClient, scope: ProjectScope, poll_interval: Duration) -> Self {
        Self {
            client,
            scope,
            poll_interval,
        }
    }

    /// 생성 작업 제출
    ///
    /// 로컬 검증(매핑 완성, 행 수, 프로젝트, 등록된 템플릿)을 모두 통과해야 네트워크를 호출합니다.
    pub async fn submit(
        &self,
        template: &TemplateRef,
        data: &DataSource,
        mapping: &FieldMapping,
        row_limit: Option<i64>,
    ) -> Result<JobId, DocgenError> {
        ensure_complete(template, mapping)?;
        let row_limit = validate_row_limit(row_limit)?;
        let project = self.scope.require()?;
        let template_id = template.template_id().ok_or_else(|| {
            DocgenError::validation("Jobs require a registered template. Use direct generation for local templates.")
        })?;

        if let Some(rows) = row_limit {
            if rows as usize > data.row_count() {
                log::info!(
                    "[Jobs] Row limit {} exceeds the {} rows in {}",
                    rows,
                    data.row_count(),
                    data.file_name()
                );
            }
        }

        let submitted = self
            .client
            .submit_job(template_id, data.file(), mapping, project.id, row_limit)
            .await?;
        log::info!("[Jobs] Submitted job {} in project {}", submitted.job_id, project.id);
        Ok(submitted.job_id)
    }

    /// 백그라운드 폴링 시작
    pub fn poll(&self, job_id: JobId) -> PollHandle {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(PollState::default());

        let task = tokio::spawn(poll_loop(
            self.client.clone(),
            job_id.clone(),
            self.poll_interval,
            cancel.clone(),
            tx,
        ));

        PollHandle {
            job_id,
            cancel,
            state: rx,
            task: Some(task),
        }
    }

    /// 직접 모드: 등록 없이 한 번에 생성하고 결과 파일을 바로 받음 (폴링 없음)
    pub async fn run_direct(
        &self,
        template: &TemplateRef,
        data: &DataSource,
        mapping: &FieldMapping,
    ) -> Result<JobOutcome, DocgenError> {
        ensure_complete(template, mapping)?;
        let TemplateSource::Inline(template_file) = &template.source else {
            return Err(DocgenError::validation(
                "Direct generation needs the template file itself, not a registered template id",
            ));
        };

        let bytes = self
            .client
            .generate_bulk(template_file, data.file(), mapping)
            .await?;
        log::info!("[Jobs] Direct generation delivered {} bytes", bytes.len());
        Ok(JobOutcome::Delivered { bytes })
    }

    /// 활성 프로젝트의 작업 목록
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>, DocgenError> {
        let project = self.scope.require()?;
        self.client.list_project_jobs(project.id).await
    }

    /// 결과 파일 바이트 스트림
    pub async fn download(
        &self,
        job_id: &JobId,
    ) -> Result<BoxStream<'static, Result<Bytes, DocgenError>>, DocgenError> {
        self.client.download(job_id).await
    }

    /// 결과 파일을 디스크에 저장하고 기록한 바이트 수 반환
    pub async fn download_to(&self, job_id: &JobId, path: &Path) -> Result<u64, DocgenError> {
        validate_output_path(path)?;
        let mut stream = self.download(job_id).await?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut written: u64 = 0;
        let result: Result<(), DocgenError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(path).await {
                log::warn!("[Jobs] Failed to remove partial file {}: {}", path.display(), remove_err);
            }
            return Err(e);
        }

        log::info!("[Jobs] Saved {} bytes of job {} to {}", written, job_id, path.display());
        Ok(written)
    }
}
