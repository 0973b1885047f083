//! Configuration
//!
//! 환경 변수(.env.local / .env 포함)에서 클라이언트 설정을 읽습니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::DocgenError;
use crate::workflow::WorkflowMode;

pub const ENV_API_BASE: &str = "DOCGEN_API_BASE";
pub const ENV_POLL_INTERVAL_MS: &str = "DOCGEN_POLL_INTERVAL_MS";
pub const ENV_STATE_DB: &str = "DOCGEN_STATE_DB";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "DOCGEN_HTTP_TIMEOUT_SECS";
pub const ENV_MODE: &str = "DOCGEN_MODE";

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_STATE_DB: &str = "docgen_state.db";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// 클라이언트 설정
#[derive(Debug, Clone)]
pub struct Settings {
    /// 원격 생성 서비스 기본 URL
    pub api_base: Url,
    /// 작업 상태 폴링 간격 (고정, 백오프 없음)
    pub poll_interval: Duration,
    /// 선택된 프로젝트를 보관하는 로컬 DB 경로
    pub state_db: PathBuf,
    pub http_timeout: Duration,
    pub mode: WorkflowMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            state_db: PathBuf::from(DEFAULT_STATE_DB),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            mode: WorkflowMode::ProjectScoped,
        }
    }
}

impl Settings {
    /// 프로세스 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, DocgenError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 로드 (빈 값은 미설정으로 취급)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DocgenError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Settings::default();

        if let Some(base) = get(ENV_API_BASE) {
            settings.api_base = parse_base_url(&base)
                .map_err(|e| DocgenError::validation(format!("{}: {}", ENV_API_BASE, e)))?;
        }

        if let Some(ms) = get(ENV_POLL_INTERVAL_MS) {
            let ms = parse_positive(ENV_POLL_INTERVAL_MS, &ms)?;
            settings.poll_interval = Duration::from_millis(ms);
        }

        if let Some(path) = get(ENV_STATE_DB) {
            settings.state_db = PathBuf::from(path);
        }

        if let Some(secs) = get(ENV_HTTP_TIMEOUT_SECS) {
            let secs = parse_positive(ENV_HTTP_TIMEOUT_SECS, &secs)?;
            settings.http_timeout = Duration::from_secs(secs);
        }

        if let Some(mode) = get(ENV_MODE) {
            settings.mode = mode.parse().map_err(|e: String| {
                DocgenError::validation(format!("{}: {}", ENV_MODE, e))
            })?;
        }

        Ok(settings)
    }
}

/// 상대 경로 조인이 기대대로 동작하도록 끝에 '/'를 보장
pub fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{}/", trimmed))
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, DocgenError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(DocgenError::validation(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

fn find_upwards(start: PathBuf, filename: &str, max_hops: usize) -> Option<PathBuf> {
    let mut cur = start;
    for _ in 0..=max_hops {
        let candidate = cur.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        if !cur.pop() {
            break;
        }
    }
    None
}

/// .env.local → .env 순서로 로드 (이미 설정된 변수는 덮어쓰지 않음)
pub fn load_env() {
    if dotenvy::from_filename(".env.local").is_err() {
        if let Ok(cwd) = std::env::current_dir() {
            if let Some(p) = find_upwards(cwd, ".env.local", 4) {
                if let Err(e) = dotenvy::from_path(Path::new(&p)) {
                    log::warn!("[Config] Failed to load {}: {}", p.display(), e);
                }
            }
        }
    }
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.api_base.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.mode, WorkflowMode::ProjectScoped);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_API_BASE, "https://docs.example.com/api"),
            (ENV_POLL_INTERVAL_MS, "250"),
            (ENV_MODE, "direct"),
            (ENV_STATE_DB, "/tmp/docgen/state.db"),
        ]))
        .unwrap();

        assert_eq!(settings.api_base.as_str(), "https://docs.example.com/api/");
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.mode, WorkflowMode::Direct);
        assert_eq!(settings.state_db, PathBuf::from("/tmp/docgen/state.db"));
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = Settings::from_lookup(lookup(&[(ENV_POLL_INTERVAL_MS, "0")])).unwrap_err();
        assert!(err.to_string().contains(ENV_POLL_INTERVAL_MS));

        let err = Settings::from_lookup(lookup(&[(ENV_MODE, "sideways")])).unwrap_err();
        assert!(err.to_string().contains(ENV_MODE));

        let err = Settings::from_lookup(lookup(&[(ENV_API_BASE, "not a url")])).unwrap_err();
        assert!(err.to_string().contains(ENV_API_BASE));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let settings = Settings::from_lookup(lookup(&[(ENV_API_BASE, "  ")])).unwrap();
        assert_eq!(settings.api_base.as_str(), "http://127.0.0.1:8000/");
    }
}
