//! 권한 엔진
//!
//! # 모듈 구조
//!
//! - `metadata`: 엔티티/역할/작업 권한 메타데이터와 역방향 인덱스
//! - `index`: 런타임 설정 + 스키마 → 권한 인덱스 빌더
//! - `policy`: DB 정책 템플릿의 claim 치환
//! - `resolver`: 인덱스 조회 API
//! - `request`: REST 요청 컨텍스트
//! - `pipeline`: 요청 권한 상태 기계
//! - `store`: 핫 리로드용 스냅샷 저장소
//! - `graphql`: GraphQL 필드 권한

mod graphql;
mod index;
mod metadata;
mod pipeline;
pub mod policy;
mod request;
mod resolver;
mod store;

pub use graphql::{field_read_roles, is_entity_field_authorized, is_field_authorized};
pub use index::{PermissionIndex, WILDCARD};
pub use metadata::{EntityMetadata, OperationMetadata, RoleMetadata};
pub use pipeline::{
    AuthorizationOutcome, AuthorizationPipeline, AuthorizationRequirement, PipelineState,
};
pub use policy::{extract_claims, process_policy, substitute, ClaimsMap};
pub use request::{filter_field_references, RestMethod, RestRequestContext};
pub use resolver::AuthorizationResolver;
pub use store::PermissionStore;

/// 요청 역할 헤더 이름
pub const CLIENT_ROLE_HEADER: &str = "X-MS-API-ROLE";
