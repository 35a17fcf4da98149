//! 신원(identity) 및 claim 모델
//!
//! # 개요
//!
//! 인증 자체(토큰 검증)는 이 크레이트의 범위가 아닙니다.
//! 여기서는 이미 인증된 신원을 권한 엔진이 다룰 수 있는 형태로 표현합니다.
//!
//! - **Claim**: 타입/값/값 타입 triple
//! - **ClaimsIdentity**: claim 집합 + 인증 여부
//! - **ClientPrincipal**: 앞단 인증 계층이 넘겨주는 principal 헤더

mod claims;
mod identity;
mod principal;

pub use claims::{
    is_role_claim_type, short_claim_type, Claim, ClaimValueType, ROLE_CLAIM_TYPES,
    ROLE_CLAIM_TYPE_URI,
};
pub use identity::{ClaimsIdentity, ROLE_ANONYMOUS, ROLE_AUTHENTICATED};
pub use principal::{ClientPrincipal, PrincipalClaim, CLIENT_PRINCIPAL_HEADER};
