//! GraphQL 필드 권한
//!
//! 스키마 생성기는 `roles_for_field` 결과를 필드의 권한 directive로 붙입니다.
//! 실행 시에는 그 역할 목록과 요청 역할을 비교합니다.

use std::collections::HashMap;

use crate::config::Operation;

use super::resolver::AuthorizationResolver;

/// 필드 접근 허용 여부
///
/// 역할 헤더 값은 정확히 하나여야 합니다. 역할 목록이 비어 있으면(directive 없음) 허용하고,
/// 그렇지 않으면 요청 역할이 목록에 있어야 합니다 (대소문자 무시).
pub fn is_field_authorized(role_header: &[&str], field_roles: &[String]) -> bool {
    let [client_role] = role_header else {
        return false;
    };

    if field_roles.is_empty() {
        return true;
    }

    field_roles
        .iter()
        .any(|role| role.eq_ignore_ascii_case(client_role))
}

/// 엔티티 규칙으로 직접 판단하는 필드 접근 허용 여부
///
/// 어떤 역할도 읽을 수 없는 필드는 역할 목록이 비어 `is_field_authorized`가 허용하므로,
/// directive가 없는 필드와 구분해야 하는 호출자는 이 함수를 씁니다.
pub fn is_entity_field_authorized(
    resolver: &AuthorizationResolver,
    role_header: &[&str],
    entity: &str,
    field: &str,
) -> bool {
    let [client_role] = role_header else {
        return false;
    };

    let Some(role) = resolver
        .roles_for_operation(entity, Operation::Read)
        .into_iter()
        .find(|role| role.eq_ignore_ascii_case(client_role))
    else {
        return false;
    };

    let backing = resolver
        .index()
        .schema()
        .backing_column(entity, field)
        .unwrap_or_else(|| field.to_string());

    resolver
        .index()
        .operation(entity, &role, Operation::Read)
        .is_some_and(|meta| meta.permits(&backing))
}

/// 엔티티의 필드별 Read 역할 목록 (GraphQL 타입 생성용)
///
/// 키는 exposed 필드 이름입니다. 아무 역할도 읽을 수 없는 필드는 빈 목록이 됩니다.
pub fn field_read_roles(
    resolver: &AuthorizationResolver,
    entity: &str,
    fields: &[String],
) -> HashMap<String, Vec<String>> {
    fields
        .iter()
        .map(|field| {
            (
                field.clone(),
                resolver.roles_for_field(entity, field, Operation::Read),
            )
        })
        .collect()
}
