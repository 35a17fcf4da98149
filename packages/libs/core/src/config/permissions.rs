//! 권한 설정 정의
//!
//! `dgw-config.yaml`의 `entities.*.permissions` 구조를 정의합니다.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 런타임 설정
///
/// `dgw-config.yaml` 파일의 루트 구조입니다. JSON도 YAML의 부분집합이므로 그대로 읽힙니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// 엔티티별 설정
    #[serde(default)]
    pub entities: HashMap<String, EntityConfig>,
}

impl RuntimeConfig {
    /// YAML(또는 JSON) 문자열 파싱
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// 파일에서 로드
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&raw)
    }

    /// 역직렬화로 잡히지 않는 구조 검증
    fn validate(&self) -> Result<()> {
        for (entity, config) in &self.entities {
            for setting in &config.permissions {
                if setting.role.trim().is_empty() {
                    return Err(Error::ConfigParse {
                        message: format!("entity '{}' has a permission with an empty role", entity),
                    });
                }
            }
        }
        Ok(())
    }
}

/// 엔티티 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityConfig {
    /// 역할별 권한 목록
    #[serde(default)]
    pub permissions: Vec<PermissionSetting>,
}

/// 역할 하나에 대한 권한 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionSetting {
    /// 역할 이름 (대소문자 구분)
    pub role: String,

    /// 허용 작업 목록
    pub actions: Vec<OperationSpec>,
}

/// action 원소
///
/// 문자열 shorthand(`"read"`, `"*"`)와 object 형식을 모두 받습니다.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSpec {
    /// 작업 이름만 지정 (모든 컬럼, 정책 없음)
    Shorthand(Operation),

    /// 컬럼/정책을 포함한 상세 지정
    Detailed(OperationObject),
}

impl OperationSpec {
    /// 지정된 작업 (와일드카드 포함)
    pub fn operation(&self) -> Operation {
        match self {
            OperationSpec::Shorthand(op) => *op,
            OperationSpec::Detailed(obj) => obj.action,
        }
    }
}

/// action object 형식
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationObject {
    /// 작업 이름
    pub action: Operation,

    /// 컬럼 include/exclude 목록 (None = 모든 컬럼)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSpec>,

    /// 정책
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicySpec>,
}

/// 컬럼 include/exclude 목록
///
/// `["*"]`는 엔티티의 모든 컬럼을 의미합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    /// 허용 컬럼 (None = 모든 컬럼)
    #[serde(default)]
    pub include: Option<Vec<String>>,

    /// 제외 컬럼 (include보다 우선)
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
}

/// 정책 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySpec {
    /// DB 조건 템플릿 (`@claims.*`, `@item.*` 토큰 포함)
    #[serde(default)]
    pub database: Option<String>,
}

impl Serialize for OperationSpec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            OperationSpec::Shorthand(op) => op.serialize(serializer),
            OperationSpec::Detailed(obj) => obj.serialize(serializer),
        }
    }
}

/// OperationSpec의 custom deserializer (shorthand 호환)
impl<'de> Deserialize<'de> for OperationSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct OperationSpecVisitor;

        impl<'de> Visitor<'de> for OperationSpecVisitor {
            type Value = OperationSpec;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an operation name or an action object")
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Operation::from_str(value)
                    .map(OperationSpec::Shorthand)
                    .ok_or_else(|| E::custom(format!("unknown operation '{}'", value)))
            }

            fn visit_map<M>(self, map: M) -> std::result::Result<Self::Value, M::Error>
            where
                M: de::MapAccess<'de>,
            {
                let obj = OperationObject::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(OperationSpec::Detailed(obj))
            }
        }

        deserializer.deserialize_any(OperationSpecVisitor)
    }
}

/// CRUD 작업 타입
///
/// `All`은 설정 전용 와일드카드이며, 인덱스 빌드 시 네 개의 구체 작업으로 펼쳐집니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    All,
}

impl Operation {
    /// 문자열에서 파싱 (대소문자 무시)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "create" => Some(Operation::Create),
            "read" => Some(Operation::Read),
            "update" => Some(Operation::Update),
            "delete" => Some(Operation::Delete),
            "*" | "all" => Some(Operation::All),
            _ => None,
        }
    }

    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::All => "*",
        }
    }

    /// 네 개의 구체 CRUD 작업
    pub fn concrete() -> [Operation; 4] {
        [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ]
    }

    /// 와일드카드를 구체 작업 목록으로 펼침
    pub fn expand(self) -> Vec<Operation> {
        match self {
            Operation::All => Self::concrete().to_vec(),
            op => vec![op],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Operation::from_str(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown operation '{}'", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_action_shapes() {
        let yaml = r#"
entities:
  Book:
    permissions:
      - role: anonymous
        actions: ["read"]
      - role: author_role
        actions:
          - "*"
          - action: update
            fields:
              include: ["title"]
              exclude: []
            policy:
              database: "@item.publisher_id eq @claims.publisherId"
"#;

        let config = RuntimeConfig::from_yaml(yaml).unwrap();
        let book = config.entities.get("Book").unwrap();
        assert_eq!(book.permissions.len(), 2);

        let anon = &book.permissions[0];
        assert_eq!(anon.actions, vec![OperationSpec::Shorthand(Operation::Read)]);

        let author = &book.permissions[1];
        assert_eq!(author.actions[0].operation(), Operation::All);
        match &author.actions[1] {
            OperationSpec::Detailed(obj) => {
                assert_eq!(obj.action, Operation::Update);
                let fields = obj.fields.as_ref().unwrap();
                assert_eq!(fields.include.as_deref(), Some(&["title".to_string()][..]));
                assert_eq!(
                    obj.policy.as_ref().unwrap().database.as_deref(),
                    Some("@item.publisher_id eq @claims.publisherId")
                );
            }
            other => panic!("expected detailed action, got {:?}", other),
        }
    }

    #[test]
    fn test_json_config_is_accepted() {
        let json = r#"{"entities":{"Todo":{"permissions":[{"role":"authenticated","actions":["CREATE",{"action":"Read"}]}]}}}"#;
        let config = RuntimeConfig::from_yaml(json).unwrap();
        let todo = config.entities.get("Todo").unwrap();
        assert_eq!(todo.permissions[0].actions[0].operation(), Operation::Create);
        assert_eq!(todo.permissions[0].actions[1].operation(), Operation::Read);
    }

    #[test]
    fn test_unknown_operation_is_fatal() {
        let yaml = r#"
entities:
  Book:
    permissions:
      - role: anonymous
        actions: ["publish"]
"#;
        let err = RuntimeConfig::from_yaml(yaml).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("publish"));
    }

    #[test]
    fn test_malformed_action_shape_is_fatal() {
        let yaml = r#"
entities:
  Book:
    permissions:
      - role: anonymous
        actions: [42]
"#;
        assert!(RuntimeConfig::from_yaml(yaml).is_err());

        let yaml = r#"
entities:
  Book:
    permissions:
      - role: anonymous
        actions:
          - fields: { include: ["*"] }
"#;
        assert!(RuntimeConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_role_is_rejected() {
        let yaml = r#"
entities:
  Book:
    permissions:
      - role: "  "
        actions: ["read"]
"#;
        let err = RuntimeConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_operation_expand() {
        assert_eq!(Operation::All.expand().len(), 4);
        assert_eq!(Operation::Delete.expand(), vec![Operation::Delete]);
        assert_eq!(Operation::from_str("ALL"), Some(Operation::All));
        assert_eq!(Operation::from_str("execute"), None);
    }
}
