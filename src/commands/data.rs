//! Data Source Commands

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::datasource::DataSource;
use crate::error::CommandResult;

#[derive(Debug, Args)]
pub struct HeadersArgs {
    /// CSV 또는 스프레드시트 파일
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct HeadersView {
    pub file_name: String,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// 첫 번째 행의 헤더 조회 (네트워크 호출 없음)
pub async fn read_headers(args: HeadersArgs) -> CommandResult<HeadersView> {
    let source = DataSource::load(&args.file).await?;
    Ok(HeadersView {
        file_name: source.file_name().to_string(),
        headers: source.headers().to_vec(),
        row_count: source.row_count(),
    })
}
