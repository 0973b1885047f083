use std::path::{Path, PathBuf};

use crate::error::DocgenError;

pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_OCTET: &str = "application/octet-stream";

/// 업로드할 입력 파일 경로 검증
/// - 존재하는 일반 파일이어야 하며 canonicalize된 경로를 반환합니다.
pub fn validate_input_file(path: &Path) -> Result<PathBuf, DocgenError> {
    if !path.exists() {
        return Err(DocgenError::validation(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(DocgenError::validation(format!(
            "Not a regular file: {}",
            path.display()
        )));
    }
    Ok(path.canonicalize()?)
}

/// 다운로드 대상 경로 검증
/// - 파일은 없어도 되지만 부모 디렉토리는 존재해야 합니다.
pub fn validate_output_path(path: &Path) -> Result<PathBuf, DocgenError> {
    if path.is_dir() {
        return Err(DocgenError::validation(format!(
            "Output path is a directory: {}",
            path.display()
        )));
    }

    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(path.to_path_buf()),
        Some(parent) if parent.exists() => {
            let canonical_parent = parent.canonicalize()?;
            Ok(canonical_parent.join(path.file_name().unwrap_or_default()))
        }
        Some(_) => Err(DocgenError::validation("Parent directory does not exist")),
        None => Ok(path.to_path_buf()),
    }
}

/// 경로의 파일 이름 (없으면 "upload")
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload")
        .to_string()
}

/// 소문자 확장자
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

/// 업로드 파일의 MIME 타입
pub fn mime_for(file_name: &str) -> &'static str {
    match extension_of(file_name).as_str() {
        "docx" => MIME_DOCX,
        "xlsx" => MIME_XLSX,
        "csv" => MIME_CSV,
        _ => MIME_OCTET,
    }
}
