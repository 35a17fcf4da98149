//! 권한 인덱스 빌더
//!
//! 런타임 설정과 스키마 메타데이터로부터 요청 처리에 쓰일 메모리 인덱스를 만듭니다.
//!
//! # 빌드 규칙
//!
//! - shorthand action: 모든 컬럼 허용, 제외 없음, 정책 없음
//! - `*` action: Create/Read/Update/Delete 네 작업으로 펼침
//! - `fields.include`/`fields.exclude`의 `*`는 엔티티의 전체 컬럼
//! - 같은 역할의 같은 작업이 여러 번 나오면 나중 설정이 이전 설정을 대체
//! - `anonymous`만 있고 `authenticated`가 없으면 anonymous 권한을 그대로 복사

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::auth::{ROLE_ANONYMOUS, ROLE_AUTHENTICATED};
use crate::config::{EntityConfig, Operation, OperationSpec, RuntimeConfig};
use crate::error::{Error, Result};
use crate::schema::SchemaMetadataProvider;

use super::metadata::{EntityMetadata, OperationMetadata, RoleMetadata};

/// 컬럼 와일드카드
pub const WILDCARD: &str = "*";

/// 권한 인덱스 스냅샷
///
/// 빌드 후에는 읽기 전용이며, 설정이 바뀌면 통째로 다시 빌드됩니다.
pub struct PermissionIndex {
    entities: HashMap<String, EntityMetadata>,
    schema: Arc<dyn SchemaMetadataProvider>,
}

impl PermissionIndex {
    /// 설정 + 스키마로부터 인덱스 빌드
    pub fn build(config: &RuntimeConfig, schema: Arc<dyn SchemaMetadataProvider>) -> Result<Self> {
        let mut entities = HashMap::with_capacity(config.entities.len());

        for (name, entity_config) in &config.entities {
            if !schema.has_entity(name) {
                return Err(Error::ConfigParse {
                    message: format!("entity '{}' is not described by the schema", name),
                });
            }

            let metadata = build_entity(name, entity_config, schema.as_ref())?;
            tracing::debug!(
                entity = %name,
                roles = metadata.role_to_operation.len(),
                "built entity permissions"
            );
            entities.insert(name.clone(), metadata);
        }

        Ok(Self { entities, schema })
    }

    /// 엔티티 메타데이터 조회
    pub fn entity(&self, name: &str) -> Option<&EntityMetadata> {
        self.entities.get(name)
    }

    /// (엔티티, 역할, 작업) 메타데이터 조회
    pub fn operation(
        &self,
        entity: &str,
        role: &str,
        operation: Operation,
    ) -> Option<&OperationMetadata> {
        self.entities
            .get(entity)?
            .role_to_operation
            .get(role)?
            .operation_to_columns
            .get(&operation)
    }

    /// 인덱스에 포함된 엔티티 이름
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(|s| s.as_str())
    }

    /// 빌드에 사용된 스키마
    pub fn schema(&self) -> &dyn SchemaMetadataProvider {
        self.schema.as_ref()
    }
}

impl fmt::Debug for PermissionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionIndex")
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

/// 엔티티 하나의 권한 빌드
fn build_entity(
    entity: &str,
    config: &EntityConfig,
    schema: &dyn SchemaMetadataProvider,
) -> Result<EntityMetadata> {
    let universe = schema.column_universe(entity);
    let schemaless = schema.database_kind(entity).is_schemaless();

    let mut metadata = EntityMetadata::default();
    let mut role_order: Vec<String> = Vec::new();

    for setting in &config.permissions {
        if !role_order.contains(&setting.role) {
            role_order.push(setting.role.clone());
        }

        let role_meta = metadata
            .role_to_operation
            .entry(setting.role.clone())
            .or_insert_with(RoleMetadata::default);

        for spec in &setting.actions {
            let op_meta = build_operation(entity, spec, &universe, schemaless, schema)?;

            for op in spec.operation().expand() {
                role_meta.operation_to_columns.insert(op, op_meta.clone());
            }
        }
    }

    if metadata.role_to_operation.contains_key(ROLE_ANONYMOUS)
        && !metadata.role_to_operation.contains_key(ROLE_AUTHENTICATED)
    {
        if let Some(anonymous) = metadata.role_to_operation.get(ROLE_ANONYMOUS).cloned() {
            metadata
                .role_to_operation
                .insert(ROLE_AUTHENTICATED.to_string(), anonymous);
            role_order.push(ROLE_AUTHENTICATED.to_string());
        }
    }

    metadata.rebuild_inverted_maps(&role_order);
    Ok(metadata)
}

/// action 하나를 OperationMetadata로 변환
fn build_operation(
    entity: &str,
    spec: &OperationSpec,
    universe: &HashSet<String>,
    schemaless: bool,
    schema: &dyn SchemaMetadataProvider,
) -> Result<OperationMetadata> {
    let mut meta = match spec {
        OperationSpec::Shorthand(_) => OperationMetadata {
            included: universe.clone(),
            include_all: true,
            ..Default::default()
        },
        OperationSpec::Detailed(obj) => {
            let fields = obj.fields.clone().unwrap_or_default();
            let (included, include_all) =
                resolve_column_list(entity, fields.include.as_deref(), universe, schemaless, true)?;
            let (excluded, exclude_all) =
                resolve_column_list(entity, fields.exclude.as_deref(), universe, schemaless, false)?;

            let database_policy = obj
                .policy
                .as_ref()
                .and_then(|p| p.database.as_deref())
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string);

            OperationMetadata {
                included,
                excluded,
                include_all,
                exclude_all,
                database_policy,
                ..Default::default()
            }
        }
    };

    meta.allowed_exposed_columns = meta
        .allowed_columns()
        .filter_map(|backing| schema.exposed_column_name(entity, backing))
        .collect();

    Ok(meta)
}

/// include/exclude 목록 해석
///
/// `None`은 include일 때 전체 컬럼, exclude일 때 빈 목록입니다.
/// 반환값은 (컬럼 집합, 와일드카드 여부)입니다.
fn resolve_column_list(
    entity: &str,
    list: Option<&[String]>,
    universe: &HashSet<String>,
    schemaless: bool,
    absent_means_all: bool,
) -> Result<(HashSet<String>, bool)> {
    let Some(list) = list else {
        return Ok(if absent_means_all {
            (universe.clone(), true)
        } else {
            (HashSet::new(), false)
        });
    };

    if list.iter().any(|c| c == WILDCARD) {
        return Ok((universe.clone(), true));
    }

    let mut columns = HashSet::with_capacity(list.len());
    for column in list {
        if !schemaless && !universe.contains(column) {
            return Err(Error::ConfigParse {
                message: format!(
                    "field '{}' in permissions of entity '{}' is not a column of that entity",
                    column, entity
                ),
            });
        }
        columns.insert(column.clone());
    }

    Ok((columns, false))
}
