//! Data Source Reader
//!
//! 업로드된 스프레드시트/CSV에서 첫 번째 행(헤더)을 순서대로 추출합니다.
//! 파일은 비동기로 읽고 메모리에서 파싱합니다. 헤더 외의 내용은 검증하지 않습니다.

use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::DocgenError;
use crate::registry::UploadFile;
use crate::utils::{extension_of, file_name_of, validate_input_file};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 한 워크플로 세션 동안만 유지되는 데이터 소스
#[derive(Debug, Clone)]
pub struct DataSource {
    file: UploadFile,
    headers: Vec<String>,
    row_count: usize,
}

impl DataSource {
    /// 파일을 읽어 헤더 추출
    pub async fn load(path: &Path) -> Result<Self, DocgenError> {
        let path = validate_input_file(path)?;
        let bytes = tokio::fs::read(&path).await?;
        Self::from_bytes(file_name_of(&path), bytes)
    }

    /// 메모리에 있는 파일 내용에서 헤더 추출
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self, DocgenError> {
        let file = UploadFile::new(file_name, bytes);
        if file.bytes.is_empty() {
            return Err(DocgenError::parse(format!("{} is empty", file.file_name)));
        }

        let (headers, row_count) = match extension_of(&file.file_name).as_str() {
            "csv" => read_csv(&file.bytes)?,
            _ => read_workbook(&file.bytes)?,
        };

        log::info!(
            "[DataSource] {}: {} columns, {} data rows",
            file.file_name,
            headers.len(),
            row_count
        );

        Ok(Self {
            file,
            headers,
            row_count,
        })
    }

    /// 헤더 (중복 허용, 위치 순서 유지)
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 헤더 다음에 오는 비어 있지 않은 데이터 행 수
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn file_name(&self) -> &str {
        &self.file.file_name
    }

    /// 작업 제출 시 재사용할 원본 파일
    pub fn file(&self) -> &UploadFile {
        &self.file
    }
}

fn ensure_header_row(headers: Vec<String>) -> Result<Vec<String>, DocgenError> {
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DocgenError::parse("The first row of the data file is empty"));
    }
    Ok(headers)
}

fn read_csv(bytes: &[u8]) -> Result<(Vec<String>, usize), DocgenError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    let first = records
        .next()
        .ok_or_else(|| DocgenError::parse("The data file has no rows"))??;

    let headers = ensure_header_row(first.iter().map(str::to_string).collect())?;
    let row_count = records
        .filter_map(Result::ok)
        .filter(|record| record.iter().any(|field| !field.trim().is_empty()))
        .count();

    Ok((headers, row_count))
}

fn read_workbook(bytes: &Bytes) -> Result<(Vec<String>, usize), DocgenError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.clone()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DocgenError::parse("The workbook has no sheets"))??;

    let mut rows = range.rows();
    let first = rows
        .next()
        .ok_or_else(|| DocgenError::parse("The first sheet is empty"))?;

    let headers = ensure_header_row(first.iter().map(cell_to_string).collect())?;
    let row_count = rows
        .filter(|row| row.iter().any(|cell| !cell_to_string(cell).trim().is_empty()))
        .count();

    Ok((headers, row_count))
}

/// 셀 값을 문자열로 변환 (정수형 실수는 소수점 없이)
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
