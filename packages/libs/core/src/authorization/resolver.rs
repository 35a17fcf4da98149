//! 권한 조회기
//!
//! 빌드된 [`PermissionIndex`] 스냅샷에 대한 읽기 전용 질의 API입니다.
//! 파이프라인은 항상 존재 여부(`are_*`/`is_*`)를 먼저 확인한 뒤 getter를 호출합니다.
//! 순서를 어기고 getter를 호출하면 요청 실패가 아니라 `UnexpectedError`입니다.

use std::collections::HashSet;
use std::sync::Arc;

use crate::auth::ClaimsIdentity;
use crate::config::Operation;
use crate::error::{Error, Result};

use super::index::PermissionIndex;
use super::metadata::OperationMetadata;
use super::policy;

/// 권한 조회기
#[derive(Debug, Clone)]
pub struct AuthorizationResolver {
    index: Arc<PermissionIndex>,
}

impl AuthorizationResolver {
    /// 스냅샷으로 조회기 생성
    pub fn new(index: Arc<PermissionIndex>) -> Self {
        Self { index }
    }

    /// 사용 중인 스냅샷
    pub fn index(&self) -> &PermissionIndex {
        &self.index
    }

    /// 역할 헤더 검증
    ///
    /// 헤더 값이 정확히 하나이고, 비어 있지 않으며, 신원이 그 역할 claim을 가져야 합니다.
    pub fn is_valid_role_context(&self, role_header: &[&str], identity: &ClaimsIdentity) -> bool {
        let [role] = role_header else {
            return false;
        };
        !role.is_empty() && identity.is_in_role(role)
    }

    /// (엔티티, 역할, 작업) 권한 존재 여부
    pub fn are_role_and_operation_defined_for_entity(
        &self,
        entity: &str,
        role: &str,
        operation: Operation,
    ) -> bool {
        self.index.operation(entity, role, operation).is_some()
    }

    /// 요청 컬럼(exposed 이름) 허용 여부
    ///
    /// 하나라도 거부되면 `false`, backing 이름으로 바꿀 수 없는 컬럼은
    /// `ExposedColumnNameMappingError`입니다.
    pub fn are_columns_allowed_for_operation(
        &self,
        entity: &str,
        role: &str,
        operation: Operation,
        columns: &[String],
    ) -> Result<bool> {
        if columns.is_empty() {
            return Err(Error::UnexpectedError {
                message: "column check requires at least one column".to_string(),
            });
        }

        let meta = self.granted(entity, role, operation)?;
        let schema = self.index.schema();

        for column in columns {
            let backing = schema.backing_column(entity, column).ok_or_else(|| {
                Error::ExposedColumnNameMappingError {
                    entity: entity.to_string(),
                    column: column.clone(),
                }
            })?;

            if !meta.permits(&backing) {
                tracing::debug!(entity, role, %operation, column = %column, "column not permitted");
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// 허용 exposed 컬럼 집합
    pub fn get_allowed_exposed_columns(
        &self,
        entity: &str,
        role: &str,
        operation: Operation,
    ) -> Result<&HashSet<String>> {
        Ok(&self.granted(entity, role, operation)?.allowed_exposed_columns)
    }

    /// DB 정책 처리
    ///
    /// 정책이 없으면 빈 문자열을 반환합니다. `client_role`은 역할 헤더로 선택된 역할입니다.
    pub fn try_process_db_policy(
        &self,
        entity: &str,
        client_role: &str,
        operation: Operation,
        identity: &ClaimsIdentity,
    ) -> Result<String> {
        let meta = self.granted(entity, client_role, operation)?;

        let Some(template) = meta.database_policy.as_deref() else {
            return Ok(String::new());
        };

        let predicate = policy::process_policy(template, identity, client_role)?;
        tracing::debug!(entity, role = client_role, %operation, "processed database policy");
        Ok(predicate)
    }

    /// 엔티티에 권한이 설정된 역할 (작업 무관)
    pub fn roles_for_entity(&self, entity: &str) -> Vec<String> {
        let Some(meta) = self.index.entity(entity) else {
            return Vec::new();
        };

        let mut roles: Vec<String> = Vec::new();
        for op in Operation::concrete() {
            for role in meta.operation_to_roles.get(&op).into_iter().flatten() {
                if !roles.contains(role) {
                    roles.push(role.clone());
                }
            }
        }
        roles
    }

    /// 작업을 허용받은 역할
    pub fn roles_for_operation(&self, entity: &str, operation: Operation) -> Vec<String> {
        self.index
            .entity(entity)
            .and_then(|meta| meta.operation_to_roles.get(&operation))
            .cloned()
            .unwrap_or_default()
    }

    /// 필드(exposed 이름)에 대해 작업을 허용받은 역할
    ///
    /// 문서 DB 엔티티는 컬럼 목록이 없어 역인덱스가 비어 있으므로,
    /// 작업을 허용받은 역할마다 include/exclude 규칙을 직접 평가합니다.
    pub fn roles_for_field(&self, entity: &str, field: &str, operation: Operation) -> Vec<String> {
        let Some(meta) = self.index.entity(entity) else {
            return Vec::new();
        };

        let backing = self
            .index
            .schema()
            .backing_column(entity, field)
            .unwrap_or_else(|| field.to_string());

        if self.index.schema().database_kind(entity).is_schemaless() {
            return meta
                .operation_to_roles
                .get(&operation)
                .into_iter()
                .flatten()
                .filter(|role| {
                    self.index
                        .operation(entity, role, operation)
                        .is_some_and(|m| m.permits(&backing))
                })
                .cloned()
                .collect();
        }

        meta.field_to_roles
            .get(&backing)
            .and_then(|per_op| per_op.get(&operation))
            .cloned()
            .unwrap_or_default()
    }

    fn granted(&self, entity: &str, role: &str, operation: Operation) -> Result<&OperationMetadata> {
        self.index
            .operation(entity, role, operation)
            .ok_or_else(|| Error::UnexpectedError {
                message: format!(
                    "no {} grant for role '{}' on entity '{}' was checked before lookup",
                    operation, role, entity
                ),
            })
    }
}
