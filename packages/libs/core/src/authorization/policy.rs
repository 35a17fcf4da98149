//! DB 정책 claim 치환
//!
//! 정책 템플릿의 `@claims.<name>` 토큰을 호출자 claim의 literal 값으로 바꾸고,
//! `@item.` 접두사를 제거해 하위 쿼리 빌더가 그대로 붙일 수 있는 조건식을 만듭니다.
//!
//! # 토큰 문법
//!
//! `@claims.` 바로 뒤에 오는 `[A-Za-z0-9_.]+`가 claim 이름입니다.
//! 다른 구현(직접 작성한 스캐너 등)도 이 문법을 그대로 따라야 호환됩니다.
//!
//! # 치환 규칙
//!
//! - string → `('value')` (작은따옴표는 `''`로 이스케이프)
//! - boolean/integer32/integer64/double → `(value)`
//! - 그 외 값 타입, 없는 claim → `AuthorizationCheckFailed`

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::auth::{Claim, ClaimValueType, ClaimsIdentity, ROLE_CLAIM_TYPES};
use crate::error::{Error, Result};

/// claim 토큰 접두사
pub const CLAIM_PREFIX: &str = "@claims.";

/// 행 필드 토큰 접두사
pub const FIELD_PREFIX: &str = "@item.";

static CLAIM_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@claims\.([A-Za-z0-9_.]+)").expect("claim token pattern is valid")
});

/// 요청 단위 claim 맵 (claim 타입 → claim)
///
/// 요청 사이에 공유하거나 캐시하지 않습니다.
pub type ClaimsMap = HashMap<String, Claim>;

/// 신원에서 claim 맵 추출
///
/// - short 타입 이름이 있으면 우선 사용
/// - 역할 claim은 맵에서 제외 (여러 개가 정상)
/// - 그 외 같은 타입의 claim이 두 번 나오면 신원 전체를 거부
/// - 마지막으로 요청 역할(`client_role`)을 관찰된 역할 claim 타입 이름으로 추가
pub fn extract_claims(identity: &ClaimsIdentity, client_role: &str) -> Result<ClaimsMap> {
    let mut claims = ClaimsMap::new();
    let mut role_claim_type: Option<String> = None;

    for claim in identity.claims() {
        let claim_type = claim.effective_type();

        if claim.is_role() {
            role_claim_type.get_or_insert_with(|| claim_type.to_string());
            continue;
        }

        if claims.contains_key(claim_type) {
            return Err(Error::forbidden("duplicate claims are not allowed within a request"));
        }
        claims.insert(claim_type.to_string(), claim.clone());
    }

    let role_claim_type = role_claim_type.unwrap_or_else(|| ROLE_CLAIM_TYPES[0].to_string());
    claims.insert(
        role_claim_type.clone(),
        Claim::new(role_claim_type, client_role),
    );

    Ok(claims)
}

/// 정책 템플릿 치환
///
/// 같은 입력에 대해 항상 같은 결과를 내며 부수 효과가 없습니다.
/// 작은따옴표 literal 안은 토큰으로 보지 않으므로, 삽입된 claim 값은 다시 치환되지 않고
/// 결과에 다시 적용해도 바뀌지 않습니다.
pub fn substitute(template: &str, claims: &ClaimsMap) -> Result<String> {
    let mut processed = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(quote) = rest.find('\'') {
        substitute_tokens(&rest[..quote], claims, &mut processed)?;

        let literal_end = quote + quoted_literal_len(&rest[quote..]);
        processed.push_str(&rest[quote..literal_end]);
        rest = &rest[literal_end..];
    }
    substitute_tokens(rest, claims, &mut processed)?;

    Ok(processed)
}

/// literal 밖 구간의 토큰 치환
///
/// `@item.` 접두사는 구간 텍스트에서만 제거하고, 삽입한 literal은 건드리지 않습니다.
fn substitute_tokens(segment: &str, claims: &ClaimsMap, out: &mut String) -> Result<()> {
    let mut last = 0;

    for caps in CLAIM_TOKEN_RE.captures_iter(segment) {
        let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let claim = claims.get(name.as_str()).ok_or_else(|| {
            Error::forbidden("user does not possess all the claims required to perform this action")
        })?;

        out.push_str(&segment[last..token.start()].replace(FIELD_PREFIX, ""));
        out.push('(');
        out.push_str(&claim_literal(claim)?);
        out.push(')');
        last = token.end();
    }
    out.push_str(&segment[last..].replace(FIELD_PREFIX, ""));

    Ok(())
}

/// `'`로 시작하는 literal의 바이트 길이 (`''`는 이스케이프, 닫히지 않으면 끝까지)
fn quoted_literal_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// 신원 + 요청 역할로 정책 템플릿 처리
pub fn process_policy(template: &str, identity: &ClaimsIdentity, client_role: &str) -> Result<String> {
    let claims = extract_claims(identity, client_role)?;
    substitute(template, &claims)
}

/// claim 값을 literal로 변환
fn claim_literal(claim: &Claim) -> Result<String> {
    let value = claim.value.as_str();
    let well_formed = match &claim.value_type {
        ClaimValueType::String => return Ok(format!("'{}'", value.replace('\'', "''"))),
        ClaimValueType::Boolean => value.parse::<bool>().is_ok(),
        ClaimValueType::Integer32 => value.parse::<i32>().is_ok(),
        ClaimValueType::Integer64 => value.parse::<i64>().is_ok(),
        ClaimValueType::Double => value.parse::<f64>().map(f64::is_finite).unwrap_or(false),
        ClaimValueType::Other(name) => {
            return Err(Error::forbidden(format!(
                "the value of claim '{}' has an unsupported data type '{}'",
                claim.effective_type(),
                name
            )))
        }
    };

    if !well_formed {
        return Err(Error::forbidden(format!(
            "the value of claim '{}' does not match its declared type '{}'",
            claim.effective_type(),
            claim.value_type
        )));
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ROLE_AUTHENTICATED, ROLE_CLAIM_TYPE_URI};

    fn identity(claims: Vec<Claim>) -> ClaimsIdentity {
        ClaimsIdentity::authenticated("jwt", claims)
    }

    #[test]
    fn test_substitute_typed_literals() {
        let identity = identity(vec![
            Claim::typed("publisherId", "42", ClaimValueType::Integer32),
            Claim::new("department", "Sales"),
            Claim::typed("active", "true", ClaimValueType::Boolean),
            Claim::typed("score", "1.5", ClaimValueType::Double),
        ]);

        let result = process_policy(
            "@item.publisher_id eq @claims.publisherId and @item.dept eq @claims.department and @claims.active and @item.score gt @claims.score",
            &identity,
            "author_role",
        )
        .unwrap();

        assert_eq!(
            result,
            "publisher_id eq (42) and dept eq ('Sales') and (true) and score gt (1.5)"
        );
    }

    #[test]
    fn test_missing_claim_fails_closed() {
        let identity = identity(vec![Claim::new("sub", "u1")]);
        let err = process_policy("@claims.department eq 'Sales'", &identity, "reader").unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.sub_status(), "AuthorizationCheckFailed");
    }

    #[test]
    fn test_duplicate_claims_rejected() {
        let identity = identity(vec![Claim::new("department", "Sales"), Claim::new("department", "HR")]);
        let err = extract_claims(&identity, "reader").unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_duplicate_via_short_type_rejected() {
        let identity = identity(vec![
            Claim::new("email", "a@b.c"),
            Claim::new("http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress", "x@y.z"),
        ]);
        assert!(extract_claims(&identity, "reader").is_err());
    }

    #[test]
    fn test_role_claims_exempt_and_client_role_injected() {
        let identity = identity(vec![
            Claim::new(ROLE_CLAIM_TYPE_URI, "reader"),
            Claim::new(ROLE_CLAIM_TYPE_URI, "writer"),
            Claim::new("sub", "u1"),
        ]);

        let claims = extract_claims(&identity, "writer").unwrap();
        assert_eq!(claims.get("roles").unwrap().value, "writer");
        assert_eq!(claims.get("sub").unwrap().value, "u1");
        assert_eq!(claims.len(), 2);

        let result = substitute("@item.owner_role eq @claims.roles", &claims).unwrap();
        assert_eq!(result, "owner_role eq ('writer')");
    }

    #[test]
    fn test_role_claim_type_follows_observed_name() {
        let identity = ClaimsIdentity::default().with_claim(Claim::new("role", ROLE_AUTHENTICATED));
        let claims = extract_claims(&identity, ROLE_AUTHENTICATED).unwrap();
        assert!(claims.contains_key("role"));
        assert!(!claims.contains_key("roles"));
    }

    #[test]
    fn test_unsupported_value_type() {
        let identity = identity(vec![Claim::typed(
            "issued",
            "2024-01-01",
            ClaimValueType::Other("dateTime".to_string()),
        )]);
        let err = process_policy("@item.created gt @claims.issued", &identity, "reader").unwrap_err();
        assert_eq!(err.sub_status(), "AuthorizationCheckFailed");
    }

    #[test]
    fn test_mistyped_numeric_value_rejected() {
        let identity = identity(vec![Claim::typed("publisherId", "1 or 1=1", ClaimValueType::Integer64)]);
        assert!(process_policy("@item.publisher_id eq @claims.publisherId", &identity, "r").is_err());
    }

    #[test]
    fn test_string_literal_escaping() {
        let identity = identity(vec![Claim::new("name", "O'Brien")]);
        let result = process_policy("@item.name eq @claims.name", &identity, "r").unwrap();
        assert_eq!(result, "name eq ('O''Brien')");
    }

    #[test]
    fn test_dotted_claim_names() {
        let identity = identity(vec![Claim::new("org.unit", "42")]);
        let result = process_policy("@item.unit eq @claims.org.unit", &identity, "r").unwrap();
        assert_eq!(result, "unit eq ('42')");
    }

    #[test]
    fn test_substitution_is_idempotent() {
        let identity = identity(vec![Claim::typed("publisherId", "42", ClaimValueType::Integer32)]);
        let claims = extract_claims(&identity, "author_role").unwrap();

        let once = substitute("@item.publisher_id eq @claims.publisherId", &claims).unwrap();
        assert!(!once.contains(CLAIM_PREFIX));
        assert!(!once.contains(FIELD_PREFIX));

        let twice = substitute(&once, &claims).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_claim_value_containing_field_prefix_is_preserved() {
        let identity = identity(vec![Claim::new("email", "bob@item.example")]);
        let result = process_policy("@item.owner eq @claims.email", &identity, "r").unwrap();
        assert_eq!(result, "owner eq ('bob@item.example')");
    }

    #[test]
    fn test_claim_value_containing_claim_token_is_not_rescanned() {
        let identity = identity(vec![Claim::new("dept", "@claims.sub"), Claim::new("sub", "u1")]);
        let claims = extract_claims(&identity, "r").unwrap();

        let once = substitute("@item.d eq @claims.dept", &claims).unwrap();
        assert_eq!(once, "d eq ('@claims.sub')");

        let twice = substitute(&once, &claims).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_template_literals_are_left_alone() {
        let identity = identity(vec![Claim::new("department", "Sales")]);
        let result = process_policy(
            "@item.note eq 'it''s @item.x' and @item.dept eq @claims.department",
            &identity,
            "r",
        )
        .unwrap();
        assert_eq!(result, "note eq 'it''s @item.x' and dept eq ('Sales')");
    }

    #[test]
    fn test_template_without_tokens_passes_through() {
        let claims = ClaimsMap::new();
        assert_eq!(substitute("1 eq 1", &claims).unwrap(), "1 eq 1");
    }
}
