//! 인증된 신원
//!
//! 인증 계층이 넘겨준 claim 집합과 시스템 역할을 다룹니다.

use super::claims::{Claim, ROLE_CLAIM_TYPES};

/// 익명 시스템 역할
pub const ROLE_ANONYMOUS: &str = "anonymous";

/// 인증 사용자 시스템 역할
pub const ROLE_AUTHENTICATED: &str = "authenticated";

/// 인증된 신원 (claims identity)
#[derive(Debug, Clone, Default)]
pub struct ClaimsIdentity {
    /// 인증 방식 (None = 익명)
    authentication_type: Option<String>,

    /// claim 목록 (같은 타입이 여러 번 나올 수 있음)
    claims: Vec<Claim>,
}

impl ClaimsIdentity {
    /// 인증된 신원 생성
    ///
    /// `authenticated` 역할 claim이 없으면 추가합니다.
    pub fn authenticated(authentication_type: impl Into<String>, claims: Vec<Claim>) -> Self {
        let mut identity = Self {
            authentication_type: Some(authentication_type.into()),
            claims,
        };
        if !identity.is_in_role(ROLE_AUTHENTICATED) {
            identity.add_claim(Claim::new(ROLE_CLAIM_TYPES[0], ROLE_AUTHENTICATED));
        }
        identity
    }

    /// 익명 신원 생성 (`anonymous` 역할만 보유)
    pub fn anonymous() -> Self {
        Self {
            authentication_type: None,
            claims: vec![Claim::new(ROLE_CLAIM_TYPES[0], ROLE_ANONYMOUS)],
        }
    }

    /// claim 추가
    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// 빌더 스타일 claim 추가
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.add_claim(claim);
        self
    }

    /// 인증 여부
    pub fn is_authenticated(&self) -> bool {
        self.authentication_type.is_some()
    }

    /// 인증 방식
    pub fn authentication_type(&self) -> Option<&str> {
        self.authentication_type.as_deref()
    }

    /// 전체 claim
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// 특정 역할 claim을 가지고 있는지 확인 (대소문자 구분)
    pub fn is_in_role(&self, role: &str) -> bool {
        self.claims.iter().any(|c| c.is_role() && c.value == role)
    }

    /// 보유 역할 목록
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.claims
            .iter()
            .filter(|c| c.is_role())
            .map(|c| c.value.as_str())
    }

    /// 기본 역할 (역할 헤더가 없을 때 사용)
    pub fn default_role(&self) -> &'static str {
        if self.is_authenticated() {
            ROLE_AUTHENTICATED
        } else {
            ROLE_ANONYMOUS
        }
    }
}
