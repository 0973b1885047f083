//! Docgen Data Models
//!
//! 원격 생성 서비스의 엔티티와 매핑되는 Rust 데이터 모델

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type ProjectId = i64;
pub type TemplateId = i64;
pub type MappingId = i64;
/// 원격 큐가 발급하는 작업 ID (UUID 형태의 문자열)
pub type JobId = String;

/// 프로젝트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// 현재 선택된 프로젝트 (Project Scope Store가 소유)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveProject {
    pub id: ProjectId,
    pub name: String,
}

/// 플레이스홀더 → 컬럼 매핑 (삽입 순서 유지)
///
/// JSON 객체로 직렬화되며, 키 순서는 플레이스홀더 순서를 따릅니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct FieldMapping {
    entries: Vec<(String, String)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 플레이스홀더를 빈 값으로 채운 매핑
    pub fn unmapped<S: AsRef<str>>(placeholders: &[S]) -> Self {
        placeholders
            .iter()
            .map(|p| (p.as_ref().to_string(), String::new()))
            .collect()
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == placeholder)
            .map(|(_, column)| column.as_str())
    }

    /// 한 쌍만 덮어쓰기 (없으면 끝에 추가)
    pub fn set(&mut self, placeholder: impl Into<String>, column: impl Into<String>) {
        let placeholder = placeholder.into();
        let column = column.into();
        match self.entries.iter_mut().find(|(key, _)| *key == placeholder) {
            Some(entry) => entry.1 = column,
            None => self.entries.push((placeholder, column)),
        }
    }

    pub fn contains_key(&self, placeholder: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == placeholder)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 모든 값이 비어 있지 않으면 true
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|(_, column)| !column.is_empty())
    }

    /// 값이 비어 있는 플레이스홀더 목록
    pub fn empty_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, column)| column.is_empty())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// `mappings_json` 폼 필드용 JSON 문자열
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = FieldMapping::new();
        for (key, value) in iter {
            mapping.set(key, value);
        }
        mapping
    }
}

impl TryFrom<Map<String, Value>> for FieldMapping {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut mapping = FieldMapping::new();
        for (key, value) in map {
            let column = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => {
                    return Err(format!(
                        "mapping value for '{}' must be a string, got {}",
                        key, other
                    ))
                }
            };
            mapping.set(key, column);
        }
        Ok(mapping)
    }
}

impl From<FieldMapping> for Map<String, Value> {
    fn from(mapping: FieldMapping) -> Self {
        mapping
            .entries
            .into_iter()
            .map(|(key, column)| (key, Value::String(column)))
            .collect()
    }
}

/// 작업 상태
///
/// PENDING → PROGRESS → SUCCESS | FAILURE 순서로만 진행합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum JobStatus {
    Pending,
    Progress,
    Success,
    Failure,
}

impl JobStatus {
    /// 원격 큐 상태 문자열 해석
    pub fn from_wire(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "PENDING" => JobStatus::Pending,
            "SUCCESS" => JobStatus::Success,
            "FAILURE" | "REVOKED" => JobStatus::Failure,
            // STARTED, RETRY, RECEIVED, PROGRESS 및 알 수 없는 비종료 상태
            _ => JobStatus::Progress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Progress => "PROGRESS",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Progress => 1,
            JobStatus::Success | JobStatus::Failure => 2,
        }
    }

    /// 단조 전이: 후퇴하는 상태는 무시하고, 종료 상태는 그대로 유지
    pub fn advance(self, next: JobStatus) -> JobStatus {
        if self.is_terminal() || next.rank() < self.rank() {
            self
        } else {
            next
        }
    }
}

impl From<String> for JobStatus {
    fn from(status: String) -> Self {
        JobStatus::from_wire(&status)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 작업의 최종 결과
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// SUCCESS: 결과 다운로드 경로
    Succeeded { result_url: String },
    /// FAILURE: 서버가 전달한 실패 사유
    Failed { detail: String },
    /// 직접 모드: 폴링 없이 결과 바이트가 바로 전달됨
    Delivered { bytes: bytes::Bytes },
    /// 종료 상태 전에 폴링이 취소됨
    Abandoned,
}

impl JobOutcome {
    pub fn status(&self) -> Option<JobStatus> {
        match self {
            JobOutcome::Succeeded { .. } | JobOutcome::Delivered { .. } => Some(JobStatus::Success),
            JobOutcome::Failed { .. } => Some(JobStatus::Failure),
            JobOutcome::Abandoned => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn field_mapping_keeps_insertion_order_in_json() {
        let mapping: FieldMapping = [("Zeta", "z"), ("Alpha", "a"), ("Mid", "")]
            .into_iter()
            .collect();
        let json = mapping.to_json_string().unwrap();
        assert_eq!(json, r#"{"Zeta":"z","Alpha":"a","Mid":""}"#);

        let back: FieldMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(back, mapping);
    }

    #[test]
    fn field_mapping_set_overwrites_single_pair() {
        let mut mapping = FieldMapping::unmapped(&["A", "B"]);
        mapping.set("B", "col_b");
        mapping.set("B", "col_b2");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("A"), Some(""));
        assert_eq!(mapping.get("B"), Some("col_b2"));
        assert!(!mapping.is_complete());
        assert_eq!(mapping.empty_keys(), vec!["A"]);
    }

    #[test]
    fn field_mapping_rejects_non_string_values() {
        let result = serde_json::from_str::<FieldMapping>(r#"{"A": 3}"#);
        assert!(result.is_err());

        let nulls: FieldMapping = serde_json::from_str(r#"{"A": null}"#).unwrap();
        assert_eq!(nulls.get("A"), Some(""));
    }

    #[test]
    fn job_status_parses_queue_states() {
        assert_eq!(JobStatus::from_wire("PENDING"), JobStatus::Pending);
        assert_eq!(JobStatus::from_wire("STARTED"), JobStatus::Progress);
        assert_eq!(JobStatus::from_wire("progress"), JobStatus::Progress);
        assert_eq!(JobStatus::from_wire("SUCCESS"), JobStatus::Success);
        assert_eq!(JobStatus::from_wire("REVOKED"), JobStatus::Failure);

        let parsed: JobStatus = serde_json::from_str("\"RETRY\"").unwrap();
        assert_eq!(parsed, JobStatus::Progress);
        assert_eq!(serde_json::to_string(&JobStatus::Success).unwrap(), "\"SUCCESS\"");
    }

    #[test]
    fn job_status_never_regresses() {
        assert_eq!(JobStatus::Progress.advance(JobStatus::Pending), JobStatus::Progress);
        assert_eq!(JobStatus::Pending.advance(JobStatus::Success), JobStatus::Success);
        assert_eq!(JobStatus::Success.advance(JobStatus::Failure), JobStatus::Success);
        assert_eq!(JobStatus::Failure.advance(JobStatus::Progress), JobStatus::Failure);
    }
}
