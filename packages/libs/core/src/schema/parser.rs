//! 스키마 YAML 파서
//!
//! `dgw-schema.yaml` 파일을 파싱하여 ProjectSchema로 변환합니다.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::entity::EntitySchema;
use super::provider::ProjectSchema;
use super::types::DatabaseKind;
use crate::error::{Error, Result};

/// 스키마 파서
pub struct SchemaParser;

impl SchemaParser {
    /// YAML 문자열 파싱
    pub fn parse_yaml(yaml: &str) -> Result<ProjectSchema> {
        let raw: RawSchema = serde_yaml::from_str(yaml)?;
        Self::convert_raw_schema(raw)
    }

    /// 파일에서 로드
    pub fn load(path: impl AsRef<Path>) -> Result<ProjectSchema> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::parse_yaml(&raw)
    }

    /// Raw 스키마를 ProjectSchema로 변환
    fn convert_raw_schema(raw: RawSchema) -> Result<ProjectSchema> {
        let mut schema = ProjectSchema::new();

        for (name, raw_entity) in raw.entities {
            let entity = Self::convert_raw_entity(name, raw_entity)?;
            schema.add_entity(entity);
        }

        Ok(schema)
    }

    /// Raw 엔티티 변환
    fn convert_raw_entity(name: String, raw: RawEntity) -> Result<EntitySchema> {
        let kind = raw.kind.unwrap_or_default();
        let columns = raw.columns.unwrap_or_default();
        let mappings = raw.mappings.unwrap_or_default();

        if kind.is_schemaless() {
            if !columns.is_empty() || !mappings.is_empty() {
                return Err(Error::SchemaParse {
                    message: format!(
                        "document entity '{}' must not declare columns or mappings",
                        name
                    ),
                });
            }
            return Ok(EntitySchema::document(name));
        }

        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(Error::SchemaParse {
                    message: format!("duplicate column '{}' in entity '{}'", column, name),
                });
            }
        }

        let mut entity = EntitySchema::relational(name, columns);

        // 정렬해서 적용 (에러 메시지 일관성)
        let mut mappings: Vec<_> = mappings.into_iter().collect();
        mappings.sort();

        for (backing, exposed) in mappings {
            if entity.exposed_in_use(&exposed) && entity.backing_column(&exposed).as_deref() != Some(backing.as_str()) {
                return Err(Error::SchemaParse {
                    message: format!(
                        "exposed name '{}' is already used in entity '{}'",
                        exposed, entity.name
                    ),
                });
            }
            if !entity.map_column(&backing, exposed) {
                return Err(Error::SchemaParse {
                    message: format!(
                        "mapping references unknown column '{}' in entity '{}'",
                        backing, entity.name
                    ),
                });
            }
        }

        Ok(entity)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw YAML 구조체 (serde 역직렬화용)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(default)]
    entities: HashMap<String, RawEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntity {
    kind: Option<DatabaseKind>,
    columns: Option<Vec<String>>,
    mappings: Option<HashMap<String, String>>,
}
