//! 공통 에러 타입
//!
//! 게이트웨이 전체에서 사용되는 에러 타입을 정의합니다.
//! 모든 에러는 HTTP 상태 코드와 클라이언트용 sub-status 코드를 함께 가집니다.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// 게이트웨이 공통 에러
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Configuration Errors (로드 시점에 치명적)
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("runtime config error: {message}")]
    ConfigParse { message: String },

    #[error("schema parse error: {message}")]
    SchemaParse { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Request Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("authorization check failed: {reason}")]
    AuthorizationCheckFailed { reason: String },

    #[error("invalid field '{column}' requested for entity '{entity}'")]
    ExposedColumnNameMappingError { entity: String, column: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("request cancelled")]
    RequestCancelled,

    // ─────────────────────────────────────────────────────────────────────────────
    // Invariant Violations
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("unexpected error: {message}")]
    UnexpectedError { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // IO/Serialization Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 권한 거부 에러 생성
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Error::AuthorizationCheckFailed {
            reason: reason.into(),
        }
    }

    /// 잘못된 요청 에러 생성
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    /// 설정 에러 여부 (핫 리로드 시 이전 인덱스를 유지해야 하는 경우)
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::ConfigParse { .. }
                | Error::SchemaParse { .. }
                | Error::Yaml(_)
                | Error::Json(_)
                | Error::Io(_)
        )
    }

    /// HTTP 상태 코드로 변환
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::ExposedColumnNameMappingError { .. } | Error::BadRequest { .. } => 400,

            // 403 Forbidden
            Error::AuthorizationCheckFailed { .. } => 403,

            // 408 Request Timeout
            Error::RequestCancelled => 408,

            // 500 Internal Server Error
            _ => 500,
        }
    }

    /// Sub-status 코드 (클라이언트용)
    pub fn sub_status(&self) -> &'static str {
        match self {
            Error::ConfigParse { .. } => "ConfigParseError",
            Error::SchemaParse { .. } => "SchemaParseError",
            Error::AuthorizationCheckFailed { .. } => "AuthorizationCheckFailed",
            Error::ExposedColumnNameMappingError { .. } => "ExposedColumnNameMappingError",
            Error::BadRequest { .. } => "BadRequest",
            Error::RequestCancelled => "RequestCancelled",
            Error::UnexpectedError { .. } => "UnexpectedError",
            Error::Yaml(_) | Error::Json(_) | Error::Io(_) => "ConfigParseError",
        }
    }
}
