//! 스키마 메타데이터 조회
//!
//! 권한 엔진은 이 trait을 통해서만 스키마에 접근합니다.

use std::collections::{HashMap, HashSet};

use super::entity::EntitySchema;
use super::types::DatabaseKind;

/// 스키마 메타데이터 제공자
///
/// 실제 DB 메타데이터(인트로스펙션 결과 등)를 권한 엔진에 노출하는 경계입니다.
pub trait SchemaMetadataProvider: Send + Sync {
    /// 엔티티 존재 여부
    fn has_entity(&self, entity: &str) -> bool;

    /// exposed 이름 → backing 이름
    fn backing_column(&self, entity: &str, exposed: &str) -> Option<String>;

    /// backing 이름 → exposed 이름
    fn exposed_column_name(&self, entity: &str, backing: &str) -> Option<String>;

    /// 엔티티의 backing 컬럼 전체 집합 (문서 DB는 빈 집합)
    fn column_universe(&self, entity: &str) -> HashSet<String>;

    /// 데이터베이스 종류
    fn database_kind(&self, entity: &str) -> DatabaseKind;
}

/// 프로젝트 스키마
///
/// 엔티티 이름 → 엔티티 스키마의 메모리 맵입니다.
#[derive(Debug, Clone, Default)]
pub struct ProjectSchema {
    entities: HashMap<String, EntitySchema>,
}

impl ProjectSchema {
    /// 빈 프로젝트 스키마 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔티티 추가 (같은 이름이면 교체)
    pub fn add_entity(&mut self, entity: EntitySchema) {
        self.entities.insert(entity.name.clone(), entity);
    }

    /// 빌더 스타일 추가
    pub fn with_entity(mut self, entity: EntitySchema) -> Self {
        self.add_entity(entity);
        self
    }

    /// 엔티티 조회
    pub fn get_entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    /// 모든 엔티티 이름
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(|s| s.as_str())
    }
}

impl SchemaMetadataProvider for ProjectSchema {
    fn has_entity(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    fn backing_column(&self, entity: &str, exposed: &str) -> Option<String> {
        self.entities.get(entity)?.backing_column(exposed)
    }

    fn exposed_column_name(&self, entity: &str, backing: &str) -> Option<String> {
        self.entities.get(entity)?.exposed_column(backing)
    }

    fn column_universe(&self, entity: &str) -> HashSet<String> {
        self.entities
            .get(entity)
            .map(|e| e.columns().clone())
            .unwrap_or_default()
    }

    fn database_kind(&self, entity: &str) -> DatabaseKind {
        self.entities
            .get(entity)
            .map(|e| e.kind)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_lookups() {
        let schema = ProjectSchema::new()
            .with_entity(
                EntitySchema::relational("Book", ["id", "title", "publisher_id"])
                    .with_mapping("publisher_id", "publisher"),
            )
            .with_entity(EntitySchema::document("Planet"));

        assert!(schema.has_entity("Book"));
        assert!(!schema.has_entity("Author"));
        assert_eq!(schema.column_universe("Book").len(), 3);
        assert!(schema.column_universe("Planet").is_empty());
        assert_eq!(schema.database_kind("Planet"), DatabaseKind::Document);
        assert_eq!(
            schema.backing_column("Book", "publisher"),
            Some("publisher_id".to_string())
        );
        assert_eq!(schema.exposed_column_name("Author", "id"), None);
    }
}
