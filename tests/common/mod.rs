#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use docgen_lib::config::parse_base_url;
use docgen_lib::registry::RegistryClient;
use docgen_lib::scope::ProjectScope;
use docgen_lib::workflow::{Workflow, WorkflowMode};
use tempfile::TempDir;
use wiremock::MockServer;

pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn client_for(server: &MockServer) -> RegistryClient {
    let base = parse_base_url(&server.uri()).expect("mock server uri");
    RegistryClient::new(base, Duration::from_secs(5)).expect("http client")
}

/// 프로젝트가 선택된 메모리 스코프
pub fn scope_with_project(id: i64, name: &str) -> ProjectScope {
    let scope = ProjectScope::in_memory().expect("in-memory scope");
    scope.select_project(id, name).expect("select project");
    scope
}

pub fn workflow(server: &MockServer, mode: WorkflowMode, scope: ProjectScope) -> Workflow {
    Workflow::new(mode, client_for(server), scope, POLL_INTERVAL)
}

pub fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

/// 서버는 내용을 해석하지 않으므로 zip 시그니처만 있는 가짜 docx
pub fn template_file(dir: &TempDir) -> PathBuf {
    write_file(dir, "carta.docx", b"PK\x03\x04fake-docx")
}

pub async fn count_requests(server: &MockServer, verb: &str, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == verb && request.url.path() == path)
        .count()
}

pub async fn request_body(server: &MockServer, verb: &str, path: &str) -> String {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .find(|request| request.method.as_str() == verb && request.url.path() == path)
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .unwrap_or_default()
}
