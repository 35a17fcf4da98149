//! 클라이언트 principal 디코딩
//!
//! 앞단 인증 계층(리버스 프록시, API 관리 게이트웨이 등)이 검증한 신원을
//! `X-DGW-CLIENT-PRINCIPAL` 헤더로 전달받아 ClaimsIdentity로 변환합니다.
//! 서명 검증은 인증 계층의 책임이며 여기서는 디코딩만 수행합니다.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::Value;

use super::claims::{Claim, ClaimValueType, ROLE_CLAIM_TYPES};
use super::identity::ClaimsIdentity;
use crate::error::{Error, Result};

/// principal 헤더 이름
pub const CLIENT_PRINCIPAL_HEADER: &str = "x-dgw-client-principal";

/// 디코딩된 클라이언트 principal
///
/// ```json
/// {
///   "auth_typ": "aad",
///   "claims": [{ "typ": "publisherId", "val": 42 }],
///   "userRoles": ["author_role"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ClientPrincipal {
    /// 인증 방식
    #[serde(rename = "auth_typ")]
    pub auth_type: String,

    /// claim 목록
    #[serde(default)]
    pub claims: Vec<PrincipalClaim>,

    /// 역할 목록 (역할 claim으로 변환)
    #[serde(default, rename = "userRoles")]
    pub user_roles: Vec<String>,
}

/// principal의 claim 항목
#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalClaim {
    /// claim 타입
    pub typ: String,

    /// 값 (JSON 타입에서 값 타입을 추론)
    pub val: Value,

    /// 명시적 값 타입
    #[serde(default)]
    pub value_type: Option<String>,

    /// short 타입 이름
    #[serde(default)]
    pub short_typ: Option<String>,
}

impl ClientPrincipal {
    /// 헤더 값 디코딩
    ///
    /// # 디코딩 순서
    /// 1. base64url (no padding) → JSON
    /// 2. base64 (standard) → JSON
    pub fn decode(header_value: &str) -> Result<Self> {
        let value = header_value.trim();

        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(value)
            .or_else(|_| general_purpose::STANDARD.decode(value))
            .map_err(|_| Error::bad_request("client principal is not valid base64"))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| Error::bad_request(format!("malformed client principal: {}", e)))
    }

    /// ClaimsIdentity로 변환
    pub fn into_identity(self) -> ClaimsIdentity {
        let mut claims: Vec<Claim> = self.claims.into_iter().map(PrincipalClaim::into_claim).collect();

        for role in self.user_roles {
            let exists = claims.iter().any(|c| c.is_role() && c.value == role);
            if !exists {
                claims.push(Claim::new(ROLE_CLAIM_TYPES[0], role));
            }
        }

        ClaimsIdentity::authenticated(self.auth_type, claims)
    }
}

impl PrincipalClaim {
    fn into_claim(self) -> Claim {
        let inferred = infer_value_type(&self.val);
        let value_type = self
            .value_type
            .as_deref()
            .map(ClaimValueType::parse)
            .unwrap_or(inferred);

        let value = match self.val {
            Value::String(s) => s,
            other => other.to_string(),
        };

        let claim = Claim::typed(self.typ, value, value_type);
        match self.short_typ {
            Some(short) => claim.with_short_type(short),
            None => claim,
        }
    }
}

/// JSON 값에서 claim 값 타입 추론
fn infer_value_type(value: &Value) -> ClaimValueType {
    match value {
        Value::String(_) => ClaimValueType::String,
        Value::Bool(_) => ClaimValueType::Boolean,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i32::try_from(i).is_ok() {
                    ClaimValueType::Integer32
                } else {
                    ClaimValueType::Integer64
                }
            } else {
                ClaimValueType::Double
            }
        }
        Value::Null => ClaimValueType::Other("null".to_string()),
        Value::Array(_) | Value::Object(_) => ClaimValueType::Other("json".to_string()),
    }
}
