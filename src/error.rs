//! Docgen Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// Docgen 워크플로 에러
#[derive(Error, Debug)]
pub enum DocgenError {
    /// 로컬 입력 누락 (빈 이름, 활성 프로젝트 없음, 미완성 매핑 등)
    #[error("Validation error: {0}")]
    Validation(String),

    /// 데이터 파일을 읽을 수 없거나 헤더 행이 비어 있음
    #[error("Parse error: {0}")]
    Parse(String),

    /// 원격 서비스의 비정상 응답 (detail 메시지를 그대로 전달)
    #[error("{detail}")]
    Server { status: u16, detail: String },

    /// 응답을 받기 전 전송 계층 실패
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocgenError {
    pub fn validation(message: impl Into<String>) -> Self {
        DocgenError::Validation(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        DocgenError::Parse(message.into())
    }

    /// 로컬에서 발생한 에러인지 (네트워크에 도달하지 않은 에러)
    pub fn is_local(&self) -> bool {
        matches!(self, DocgenError::Validation(_) | DocgenError::Parse(_))
    }
}

impl From<calamine::Error> for DocgenError {
    fn from(error: calamine::Error) -> Self {
        DocgenError::Parse(error.to_string())
    }
}

impl From<csv::Error> for DocgenError {
    fn from(error: csv::Error) -> Self {
        DocgenError::Parse(error.to_string())
    }
}

/// 커맨드 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<DocgenError> for CommandError {
    fn from(error: DocgenError) -> Self {
        let code = match &error {
            DocgenError::Validation(_) => "VALIDATION_ERROR",
            DocgenError::Parse(_) => "PARSE_ERROR",
            DocgenError::Server { .. } => "SERVER_ERROR",
            DocgenError::Network(_) => "NETWORK_ERROR",
            DocgenError::Database(_) => "DB_ERROR",
            DocgenError::Io(_) => "IO_ERROR",
            DocgenError::Serialization(_) => "SERIALIZATION_ERROR",
        };

        let details = match &error {
            DocgenError::Server { status, .. } => Some(format!("HTTP {}", status)),
            _ => None,
        };

        CommandError {
            code: code.to_string(),
            message: error.to_string(),
            details,
        }
    }
}

/// 커맨드 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

/// 라이브러리 결과 타입
pub type Result<T, E = DocgenError> = std::result::Result<T, E>;
