//! Claim 모델
//!
//! 인증 계층이 검증한 신원(identity)의 claim 구조입니다.
//! 요청마다 새로 만들어지고 요청이 끝나면 버려집니다.

use std::fmt;

/// 역할 claim의 URI 형식 타입
pub const ROLE_CLAIM_TYPE_URI: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// 역할 claim의 short 타입 (`roles`, `role` 모두 허용)
pub const ROLE_CLAIM_TYPES: [&str; 2] = ["roles", "role"];

/// URI 형식 claim 타입 → short 이름
const SHORT_CLAIM_TYPES: &[(&str, &str)] = &[
    (ROLE_CLAIM_TYPE_URI, "roles"),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
        "sub",
    ),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
        "email",
    ),
    ("http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name", "name"),
    ("http://schemas.xmlsoap.org/ws/2005/05/identity/claims/upn", "upn"),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname",
        "given_name",
    ),
    (
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname",
        "family_name",
    ),
    (
        "http://schemas.microsoft.com/identity/claims/objectidentifier",
        "oid",
    ),
];

/// claim 타입의 short 이름 조회
pub fn short_claim_type(claim_type: &str) -> Option<&'static str> {
    SHORT_CLAIM_TYPES
        .iter()
        .find(|(long, _)| *long == claim_type)
        .map(|(_, short)| *short)
}

/// 역할 claim 타입 여부 (short/URI 형식 모두)
pub fn is_role_claim_type(claim_type: &str) -> bool {
    claim_type == ROLE_CLAIM_TYPE_URI || ROLE_CLAIM_TYPES.contains(&claim_type)
}

/// Claim 값 타입
///
/// 정책 치환 시 literal의 quoting을 결정합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimValueType {
    String,
    Boolean,
    Integer32,
    Integer64,
    Double,

    /// 지원하지 않는 타입 (원래 타입 이름 보존)
    Other(String),
}

impl ClaimValueType {
    /// 타입 이름에서 파싱
    ///
    /// short 이름과 XML Schema URI(`...#string` 등) 모두 받습니다.
    pub fn parse(s: &str) -> Self {
        let name = s.rsplit('#').next().unwrap_or(s).to_lowercase();
        match name.as_str() {
            "string" => ClaimValueType::String,
            "boolean" | "bool" => ClaimValueType::Boolean,
            "integer32" | "int32" => ClaimValueType::Integer32,
            "integer64" | "int64" => ClaimValueType::Integer64,
            "double" => ClaimValueType::Double,
            _ => ClaimValueType::Other(s.to_string()),
        }
    }

    /// 문자열로 변환
    pub fn as_str(&self) -> &str {
        match self {
            ClaimValueType::String => "string",
            ClaimValueType::Boolean => "boolean",
            ClaimValueType::Integer32 => "integer32",
            ClaimValueType::Integer64 => "integer64",
            ClaimValueType::Double => "double",
            ClaimValueType::Other(name) => name,
        }
    }
}

impl fmt::Display for ClaimValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// claim 타입 (URI 형식일 수 있음)
    pub claim_type: String,

    /// 인증 계층이 기록한 short 타입 이름
    pub short_type: Option<String>,

    /// 값 (문자열 표현)
    pub value: String,

    /// 값 타입
    pub value_type: ClaimValueType,
}

impl Claim {
    /// 문자열 claim 생성
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self::typed(claim_type, value, ClaimValueType::String)
    }

    /// 타입 지정 claim 생성
    pub fn typed(
        claim_type: impl Into<String>,
        value: impl Into<String>,
        value_type: ClaimValueType,
    ) -> Self {
        Self {
            claim_type: claim_type.into(),
            short_type: None,
            value: value.into(),
            value_type,
        }
    }

    /// short 타입 이름 설정
    pub fn with_short_type(mut self, short_type: impl Into<String>) -> Self {
        self.short_type = Some(short_type.into());
        self
    }

    /// 조회에 사용할 타입 이름
    ///
    /// short 타입이 있으면 우선하고, 알려진 URI 형식이면 short 이름으로 바꿉니다.
    pub fn effective_type(&self) -> &str {
        if let Some(short) = &self.short_type {
            return short;
        }
        short_claim_type(&self.claim_type).unwrap_or(&self.claim_type)
    }

    /// 역할 claim 여부
    pub fn is_role(&self) -> bool {
        is_role_claim_type(&self.claim_type) || is_role_claim_type(self.effective_type())
    }
}
