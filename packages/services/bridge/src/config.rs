//! Bridge 설정

use std::env;
use std::path::PathBuf;

/// Bridge 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 포트
    pub port: u16,

    /// 런타임 설정 파일 (엔티티별 권한)
    pub runtime_config_path: PathBuf,

    /// 스키마 메타데이터 파일
    pub schema_path: PathBuf,

    /// `/admin/reload` 허용 여부
    pub reload_enabled: bool,
}

impl Config {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: env::var("DGW_BRIDGE_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,

            runtime_config_path: env::var("DGW_RUNTIME_CONFIG")
                .unwrap_or_else(|_| "dgw-config.yaml".to_string())
                .into(),

            schema_path: env::var("DGW_SCHEMA")
                .unwrap_or_else(|_| "dgw-schema.yaml".to_string())
                .into(),

            reload_enabled: env::var("DGW_RELOAD_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        })
    }
}
