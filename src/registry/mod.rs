//! 원격 생성 서비스 연동 모듈
//!
//! 문서 생성 서비스의 REST API를 직접 호출합니다.

pub mod client;
pub mod types;

pub use client::RegistryClient;
pub use types::*;
