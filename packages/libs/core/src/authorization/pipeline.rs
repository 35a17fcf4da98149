//! 요청 권한 파이프라인
//!
//! 세 단계의 요구사항을 순서대로 평가하는 상태 기계입니다.
//!
//! ```text
//! Start ─RoleContext─▶ RoleValid ─EntityRoleOperation─▶ OperationValid ─Columns─▶ ColumnsValid ─▶ Allowed
//!   └──────────────────────┴─────────────────────────────────┴──────────────────────────┴──────▶ Denied
//! ```
//!
//! 한 번의 평가에는 정확히 하나의 요구사항만 넘길 수 있습니다.
//! 여러 개를 동시에 넘기거나 순서를 건너뛰면 호출 계층의 버그로 보고 `UnexpectedError`를 반환합니다.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::auth::ClaimsIdentity;
use crate::config::Operation;
use crate::error::{Error, Result};

use super::request::RestRequestContext;
use super::resolver::AuthorizationResolver;

/// 권한 요구사항
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationRequirement {
    /// 역할 헤더 검증
    RoleContext,

    /// 엔티티에 대해 역할이 작업을 허용받았는지
    EntityRoleOperation,

    /// 요청 컬럼 허용 여부
    Columns,
}

impl fmt::Display for AuthorizationRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthorizationRequirement::RoleContext => "role_context",
            AuthorizationRequirement::EntityRoleOperation => "entity_role_operation",
            AuthorizationRequirement::Columns => "columns",
        };
        f.write_str(name)
    }
}

/// 파이프라인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    RoleValid,
    OperationValid,
    ColumnsValid,
    Allowed,
    Denied,
}

impl PipelineState {
    /// 이 상태에서 평가할 요구사항
    pub fn pending_requirement(self) -> Option<AuthorizationRequirement> {
        match self {
            PipelineState::Start => Some(AuthorizationRequirement::RoleContext),
            PipelineState::RoleValid => Some(AuthorizationRequirement::EntityRoleOperation),
            PipelineState::OperationValid => Some(AuthorizationRequirement::Columns),
            _ => None,
        }
    }

    /// 요구사항 통과 후 상태
    fn advance(self) -> Self {
        match self {
            PipelineState::Start => PipelineState::RoleValid,
            PipelineState::RoleValid => PipelineState::OperationValid,
            PipelineState::OperationValid => PipelineState::ColumnsValid,
            PipelineState::ColumnsValid => PipelineState::Allowed,
            terminal => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Allowed | PipelineState::Denied)
    }
}

/// 파이프라인 결과
#[derive(Debug)]
pub enum AuthorizationOutcome {
    /// 허용: 하위 쿼리 빌더에 넘길 projection과 행 조건 (조건이 없으면 빈 문자열)
    Allowed {
        projection: Vec<String>,
        predicate: String,
    },

    /// 거부: `requirement`가 None이면 DB 정책 처리 단계에서 거부됨
    Denied {
        error: Error,
        requirement: Option<AuthorizationRequirement>,
    },
}

impl AuthorizationOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationOutcome::Allowed { .. })
    }

    /// 종료 상태
    pub fn state(&self) -> PipelineState {
        match self {
            AuthorizationOutcome::Allowed { .. } => PipelineState::Allowed,
            AuthorizationOutcome::Denied { .. } => PipelineState::Denied,
        }
    }

    /// `Result`로 변환 (거부는 에러)
    pub fn into_result(self) -> Result<(Vec<String>, String)> {
        match self {
            AuthorizationOutcome::Allowed {
                projection,
                predicate,
            } => Ok((projection, predicate)),
            AuthorizationOutcome::Denied { error, .. } => Err(error),
        }
    }
}

/// 요청 권한 파이프라인
#[derive(Debug, Clone)]
pub struct AuthorizationPipeline {
    resolver: AuthorizationResolver,
}

impl AuthorizationPipeline {
    pub fn new(resolver: AuthorizationResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &AuthorizationResolver {
        &self.resolver
    }

    /// 요청 권한 평가
    ///
    /// 취소 신호는 진입 시 한 번만 확인합니다. 이후 단계는 메모리 조회뿐이라 중단하지 않습니다.
    /// 요청 단위 거부(403/400)는 `Denied`로, 호출 계층 버그(500)는 `Err`로 돌려줍니다.
    pub fn authorize(
        &self,
        context: &mut RestRequestContext,
        role_header: &[&str],
        identity: &ClaimsIdentity,
        cancel: &CancellationToken,
    ) -> Result<AuthorizationOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::RequestCancelled);
        }

        let handler = RequirementHandler {
            resolver: &self.resolver,
            role_header,
            identity,
        };

        let mut state = PipelineState::Start;
        while let Some(requirement) = state.pending_requirement() {
            let verdict = handler.handle(state, &[requirement], context);
            match verdict {
                Ok(true) => state = state.advance(),
                Ok(false) => {
                    let error = Error::forbidden(denial_reason(requirement));
                    return Ok(self.deny(context, Some(requirement), error));
                }
                Err(e) if e.status_code() >= 500 => return Err(e),
                Err(e) => return Ok(self.deny(context, Some(requirement), e)),
            }
        }

        let client_role = handler.client_role()?;
        let predicate = match self.resolver.try_process_db_policy(
            &context.entity,
            client_role,
            context.method.primary_operation(),
            identity,
        ) {
            Ok(predicate) => predicate,
            Err(e) if e.status_code() >= 500 => return Err(e),
            Err(e) => return Ok(self.deny(context, None, e)),
        };

        tracing::debug!(
            entity = %context.entity,
            method = %context.method,
            role = client_role,
            has_predicate = !predicate.is_empty(),
            "request authorized"
        );

        Ok(AuthorizationOutcome::Allowed {
            projection: context.projection(),
            predicate,
        })
    }

    fn deny(
        &self,
        context: &RestRequestContext,
        requirement: Option<AuthorizationRequirement>,
        error: Error,
    ) -> AuthorizationOutcome {
        let stage = requirement.map(|r| r.to_string()).unwrap_or_else(|| "database_policy".to_string());
        tracing::warn!(
            entity = %context.entity,
            method = %context.method,
            stage = %stage,
            error = %error,
            "request denied"
        );
        AuthorizationOutcome::Denied { error, requirement }
    }
}

fn denial_reason(requirement: AuthorizationRequirement) -> &'static str {
    match requirement {
        AuthorizationRequirement::RoleContext => {
            "the client role header must name exactly one role held by the caller"
        }
        AuthorizationRequirement::EntityRoleOperation => {
            "the client role is not permitted to perform this operation on the entity"
        }
        AuthorizationRequirement::Columns => {
            "the client role is not permitted to access one or more requested fields"
        }
    }
}

/// 요구사항 평가기 (요청 단위)
struct RequirementHandler<'a> {
    resolver: &'a AuthorizationResolver,
    role_header: &'a [&'a str],
    identity: &'a ClaimsIdentity,
}

impl RequirementHandler<'_> {
    /// 요구사항 하나 평가
    fn handle(
        &self,
        state: PipelineState,
        pending: &[AuthorizationRequirement],
        context: &mut RestRequestContext,
    ) -> Result<bool> {
        let [requirement] = pending else {
            return Err(Error::UnexpectedError {
                message: format!(
                    "exactly one authorization requirement may be pending, got {}",
                    pending.len()
                ),
            });
        };

        if state.pending_requirement() != Some(*requirement) {
            return Err(Error::UnexpectedError {
                message: format!(
                    "requirement '{}' evaluated out of order in state {:?}",
                    requirement, state
                ),
            });
        }

        match requirement {
            AuthorizationRequirement::RoleContext => Ok(self
                .resolver
                .is_valid_role_context(self.role_header, self.identity)),
            AuthorizationRequirement::EntityRoleOperation => {
                let role = self.client_role()?;
                Ok(context.method.operations().into_iter().all(|op| {
                    self.resolver
                        .are_role_and_operation_defined_for_entity(&context.entity, role, op)
                }))
            }
            AuthorizationRequirement::Columns => self.check_columns(context),
        }
    }

    fn check_columns(&self, context: &mut RestRequestContext) -> Result<bool> {
        let operations = context.method.operations();
        if operations == [Operation::Delete] {
            return Ok(true);
        }

        let role = self.client_role()?;
        let entity = context.entity.clone();
        let columns = context.cumulative_columns();

        if operations == [Operation::Read] {
            let allowed = self
                .resolver
                .get_allowed_exposed_columns(&entity, role, Operation::Read)?;

            if columns.is_empty() {
                if allowed.is_empty() {
                    return Ok(false);
                }
                context.update_return_fields(allowed.iter().cloned());
                return Ok(true);
            }

            if !self
                .resolver
                .are_columns_allowed_for_operation(&entity, role, Operation::Read, &columns)?
            {
                return Ok(false);
            }

            if !context.has_explicit_select() {
                context.update_return_fields(allowed.iter().cloned());
            }
            return Ok(true);
        }

        if !columns.is_empty() {
            for op in &operations {
                if !self
                    .resolver
                    .are_columns_allowed_for_operation(&entity, role, *op, &columns)?
                {
                    return Ok(false);
                }
            }
        }

        // 변경 결과로 돌려줄 컬럼은 같은 역할의 Read 권한을 따름
        if !context.has_explicit_select()
            && self
                .resolver
                .are_role_and_operation_defined_for_entity(&entity, role, Operation::Read)
        {
            let readable = self
                .resolver
                .get_allowed_exposed_columns(&entity, role, Operation::Read)?;
            context.update_return_fields(readable.iter().cloned());
        }

        Ok(true)
    }

    fn client_role(&self) -> Result<&str> {
        self.role_header
            .first()
            .copied()
            .ok_or_else(|| Error::UnexpectedError {
                message: "client role requested before the role context was validated".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::auth::{Claim, ClaimValueType};
    use crate::authorization::{PermissionIndex, RestMethod};
    use crate::config::RuntimeConfig;
    use crate::schema::{EntitySchema, ProjectSchema, SchemaMetadataProvider};

    const CONFIG: &str = r#"
entities:
  Book:
    permissions:
      - role: author_role
        actions:
          - action: update
            fields:
              include: ["title"]
              exclude: []
            policy:
              database: "@item.publisher_id eq @claims.publisherId"
          - action: create
            fields:
              include: ["title"]
          - action: read
            fields:
              include: ["*"]
              exclude: ["price"]
      - role: remover
        actions: ["delete"]
      - role: updater
        actions: ["update"]
      - role: creator
        actions: ["create"]
      - role: blind
        actions:
          - action: read
            fields:
              include: []
  Planet:
    permissions:
      - role: anonymous
        actions:
          - action: read
            fields:
              include: ["*"]
"#;

    fn pipeline() -> AuthorizationPipeline {
        let schema: Arc<dyn SchemaMetadataProvider> = Arc::new(
            ProjectSchema::new()
                .with_entity(EntitySchema::relational("Book", ["id", "title", "publisher_id", "price"]))
                .with_entity(EntitySchema::document("Planet")),
        );
        let config = RuntimeConfig::from_yaml(CONFIG).unwrap();
        let index = PermissionIndex::build(&config, schema).unwrap();
        AuthorizationPipeline::new(AuthorizationResolver::new(Arc::new(index)))
    }

    fn identity(roles: &[&str]) -> ClaimsIdentity {
        let mut claims: Vec<Claim> = roles.iter().map(|r| Claim::new("roles", *r)).collect();
        claims.push(Claim::typed("publisherId", "42", ClaimValueType::Integer32));
        ClaimsIdentity::authenticated("jwt", claims)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_patch_end_to_end() {
        let pipeline = pipeline();
        let identity = identity(&["author_role"]);
        let cancel = CancellationToken::new();

        let mut ctx = RestRequestContext::new("Book", RestMethod::Patch)
            .with_body(&json!({ "title": "Dune" }))
            .unwrap();
        let outcome = pipeline
            .authorize(&mut ctx, &["author_role"], &identity, &cancel)
            .unwrap();

        let (projection, predicate) = outcome.into_result().unwrap();
        assert_eq!(predicate, "publisher_id eq (42)");
        assert_eq!(projection, strings(&["id", "publisher_id", "title"]));

        let mut ctx = RestRequestContext::new("Book", RestMethod::Patch)
            .with_body(&json!({ "title": "Dune", "price": 10 }))
            .unwrap();
        let outcome = pipeline
            .authorize(&mut ctx, &["author_role"], &identity, &cancel)
            .unwrap();
        match outcome {
            AuthorizationOutcome::Denied { error, requirement } => {
                assert_eq!(requirement, Some(AuthorizationRequirement::Columns));
                assert_eq!(error.status_code(), 403);
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn test_role_context_denial_stops_pipeline() {
        let pipeline = pipeline();
        let identity = identity(&["author_role"]);
        let cancel = CancellationToken::new();

        for header in [&[][..], &["remover"][..], &["author_role", "remover"][..]] {
            let mut ctx = RestRequestContext::new("Book", RestMethod::Get);
            let outcome = pipeline.authorize(&mut ctx, header, &identity, &cancel).unwrap();
            match outcome {
                AuthorizationOutcome::Denied { requirement, .. } => {
                    assert_eq!(requirement, Some(AuthorizationRequirement::RoleContext))
                }
                other => panic!("expected denial, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_put_requires_create_and_update() {
        let pipeline = pipeline();
        let identity = identity(&["remover"]);
        let mut ctx = RestRequestContext::new("Book", RestMethod::Put);
        let outcome = pipeline
            .authorize(&mut ctx, &["remover"], &identity, &CancellationToken::new())
            .unwrap();
        match outcome {
            AuthorizationOutcome::Denied { requirement, .. } => {
                assert_eq!(requirement, Some(AuthorizationRequirement::EntityRoleOperation))
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn test_upsert_with_partial_grant_denied() {
        let pipeline = pipeline();
        let cancel = CancellationToken::new();

        for role in ["updater", "creator"] {
            let identity = identity(&[role]);
            for method in [RestMethod::Put, RestMethod::Patch] {
                let mut ctx = RestRequestContext::new("Book", method)
                    .with_body(&json!({ "title": "Dune" }))
                    .unwrap();
                let outcome = pipeline.authorize(&mut ctx, &[role], &identity, &cancel).unwrap();
                match outcome {
                    AuthorizationOutcome::Denied { error, requirement } => {
                        assert_eq!(requirement, Some(AuthorizationRequirement::EntityRoleOperation));
                        assert_eq!(error.status_code(), 403);
                    }
                    other => panic!("{} {} should be denied, got {:?}", role, method, other),
                }
            }
        }
    }

    #[test]
    fn test_delete_skips_column_check() {
        let pipeline = pipeline();
        let identity = identity(&["remover"]);
        let mut ctx = RestRequestContext::new("Book", RestMethod::Delete)
            .with_primary_key_route("id/7")
            .unwrap()
            .with_body(&json!({ "no_such_column": true }))
            .unwrap();

        let outcome = pipeline
            .authorize(&mut ctx, &["remover"], &identity, &CancellationToken::new())
            .unwrap();
        let (projection, predicate) = outcome.into_result().unwrap();
        assert!(projection.is_empty());
        assert!(predicate.is_empty());
    }

    #[test]
    fn test_read_without_columns_projects_allowed() {
        let pipeline = pipeline();
        let identity = identity(&["author_role"]);
        let mut ctx = RestRequestContext::new("Book", RestMethod::Get);

        let outcome = pipeline
            .authorize(&mut ctx, &["author_role"], &identity, &CancellationToken::new())
            .unwrap();
        let (projection, _) = outcome.into_result().unwrap();
        assert_eq!(projection, strings(&["id", "publisher_id", "title"]));
    }

    #[test]
    fn test_read_with_select_keeps_selection() {
        let pipeline = pipeline();
        let identity = identity(&["author_role"]);
        let mut ctx = RestRequestContext::new("Book", RestMethod::Get)
            .with_query([("$select", "title")])
            .unwrap();

        let outcome = pipeline
            .authorize(&mut ctx, &["author_role"], &identity, &CancellationToken::new())
            .unwrap();
        assert_eq!(outcome.into_result().unwrap().0, strings(&["title"]));

        let mut ctx = RestRequestContext::new("Book", RestMethod::Get)
            .with_query([("$filter", "price gt 10")])
            .unwrap();
        let outcome = pipeline
            .authorize(&mut ctx, &["author_role"], &identity, &CancellationToken::new())
            .unwrap();
        assert!(!outcome.is_allowed());
    }

    #[test]
    fn test_read_with_zero_allowed_columns_denied() {
        let pipeline = pipeline();
        let identity = identity(&["blind"]);
        let mut ctx = RestRequestContext::new("Book", RestMethod::Get);

        let outcome = pipeline
            .authorize(&mut ctx, &["blind"], &identity, &CancellationToken::new())
            .unwrap();
        assert_eq!(outcome.state(), PipelineState::Denied);
    }

    #[test]
    fn test_document_read_without_columns_denied() {
        let pipeline = pipeline();
        let identity = ClaimsIdentity::anonymous();
        let cancel = CancellationToken::new();

        let mut ctx = RestRequestContext::new("Planet", RestMethod::Get);
        let outcome = pipeline.authorize(&mut ctx, &["anonymous"], &identity, &cancel).unwrap();
        assert!(!outcome.is_allowed());

        let mut ctx = RestRequestContext::new("Planet", RestMethod::Get)
            .with_query([("$select", "name")])
            .unwrap();
        let outcome = pipeline.authorize(&mut ctx, &["anonymous"], &identity, &cancel).unwrap();
        assert_eq!(outcome.into_result().unwrap().0, strings(&["name"]));
    }

    #[test]
    fn test_unmapped_column_surfaces_bad_request() {
        let pipeline = pipeline();
        let identity = identity(&["author_role"]);
        let mut ctx = RestRequestContext::new("Book", RestMethod::Get)
            .with_query([("$select", "isbn")])
            .unwrap();

        let outcome = pipeline
            .authorize(&mut ctx, &["author_role"], &identity, &CancellationToken::new())
            .unwrap();
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.sub_status(), "ExposedColumnNameMappingError");
    }

    #[test]
    fn test_missing_policy_claim_denied() {
        let pipeline = pipeline();
        let identity = ClaimsIdentity::authenticated("jwt", vec![Claim::new("roles", "author_role")]);
        let mut ctx = RestRequestContext::new("Book", RestMethod::Patch)
            .with_body(&json!({ "title": "Dune" }))
            .unwrap();

        let outcome = pipeline
            .authorize(&mut ctx, &["author_role"], &identity, &CancellationToken::new())
            .unwrap();
        match outcome {
            AuthorizationOutcome::Denied { error, requirement } => {
                assert_eq!(requirement, None);
                assert_eq!(error.sub_status(), "AuthorizationCheckFailed");
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_pending_requirements_rejected() {
        let pipeline = pipeline();
        let identity = identity(&["author_role"]);
        let handler = RequirementHandler {
            resolver: pipeline.resolver(),
            role_header: &["author_role"],
            identity: &identity,
        };
        let mut ctx = RestRequestContext::new("Book", RestMethod::Get);

        let err = handler
            .handle(
                PipelineState::Start,
                &[
                    AuthorizationRequirement::RoleContext,
                    AuthorizationRequirement::EntityRoleOperation,
                ],
                &mut ctx,
            )
            .unwrap_err();
        assert_eq!(err.status_code(), 500);

        let err = handler
            .handle(PipelineState::Start, &[AuthorizationRequirement::Columns], &mut ctx)
            .unwrap_err();
        assert_eq!(err.sub_status(), "UnexpectedError");
    }

    #[test]
    fn test_cancelled_before_entry() {
        let pipeline = pipeline();
        let identity = identity(&["author_role"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut ctx = RestRequestContext::new("Book", RestMethod::Get);
        let err = pipeline
            .authorize(&mut ctx, &["author_role"], &identity, &cancel)
            .unwrap_err();
        assert_eq!(err.status_code(), 408);
    }

    #[test]
    fn test_state_machine_order() {
        let mut state = PipelineState::Start;
        let mut seen = Vec::new();
        while let Some(requirement) = state.pending_requirement() {
            seen.push(requirement);
            state = state.advance();
        }
        assert_eq!(
            seen,
            vec![
                AuthorizationRequirement::RoleContext,
                AuthorizationRequirement::EntityRoleOperation,
                AuthorizationRequirement::Columns,
            ]
        );
        assert_eq!(state, PipelineState::ColumnsValid);
        assert_eq!(state.advance(), PipelineState::Allowed);
        assert!(PipelineState::Denied.is_terminal());
    }
}
