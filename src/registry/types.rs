//! 원격 생성 서비스 REST 타입 정의

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{FieldMapping, JobId, JobStatus, MappingId, ProjectId, TemplateId};

/// null 값을 기본값으로 취급
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 작업 id는 큐 구현에 따라 문자열 또는 정수로 옴
#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobId {
    Text(String),
    Number(i64),
}

impl From<RawJobId> for JobId {
    fn from(raw: RawJobId) -> Self {
        match raw {
            RawJobId::Text(text) => text,
            RawJobId::Number(number) => number.to_string(),
        }
    }
}

fn job_id<'de, D>(deserializer: D) -> Result<JobId, D::Error>
where
    D: Deserializer<'de>,
{
    RawJobId::deserialize(deserializer).map(JobId::from)
}

fn optional_job_id<'de, D>(deserializer: D) -> Result<Option<JobId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawJobId>::deserialize(deserializer)?.map(JobId::from))
}

/// multipart 업로드용 파일
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// 프로젝트 생성 요청
#[derive(Debug, Serialize)]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
}

/// 프로젝트 템플릿 목록 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: TemplateId,
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// 템플릿 상세
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDetails {
    pub id: TemplateId,
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

/// 템플릿 등록 응답
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRegistration {
    pub id: TemplateId,
    #[serde(default, deserialize_with = "null_to_default")]
    pub placeholders: Vec<String>,
}

/// 플레이스홀더 조회 응답
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceholderList {
    #[serde(default, deserialize_with = "null_to_default")]
    pub placeholders: Vec<String>,
}

/// 등록 없이 플레이스홀더만 감지한 응답 (직접 모드)
#[derive(Debug, Clone, Deserialize)]
pub struct DetectedPlaceholders {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub placeholders: Vec<String>,
}

/// 저장된 매핑 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub id: MappingId,
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
    pub template_id: TemplateId,
    /// 프로젝트 도입 이전에 저장된 매핑은 null
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    pub mapping_data: FieldMapping,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// 매핑 저장 요청
#[derive(Debug, Clone, Serialize)]
pub struct SaveMappingRequest<'a> {
    pub name: &'a str,
    pub template_id: TemplateId,
    pub mapping_data: &'a FieldMapping,
    pub project_id: ProjectId,
}

/// 작업 제출 응답
#[derive(Debug, Clone, Deserialize)]
pub struct JobSubmitted {
    #[serde(deserialize_with = "job_id")]
    pub job_id: JobId,
}

/// 작업 상태 조회 응답
#[derive(Debug, Clone, Deserialize)]
pub struct JobPoll {
    #[serde(default, deserialize_with = "optional_job_id")]
    pub job_id: Option<JobId>,
    pub status: JobStatus,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub info: Option<Value>,
}

/// 프로젝트 작업 목록 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(deserialize_with = "job_id")]
    pub id: JobId,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub template_id: Option<TemplateId>,
    #[serde(default)]
    pub result_file_path: Option<String>,
}

/// 에러 응답 본문 (`{detail}`)
///
/// detail은 문자열이거나, 422 검증 에러의 경우 `{msg}` 객체 배열입니다.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Array(items) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if msgs.is_empty() {
                    None
                } else {
                    Some(msgs.join("; "))
                }
            }
            _ => None,
        }
    }
}
