//! 엔티티 스키마
//!
//! 엔티티 하나의 컬럼 집합과 backing ↔ exposed 이름 매핑을 정의합니다.

use std::collections::{HashMap, HashSet};

use super::types::DatabaseKind;

/// 엔티티 스키마
#[derive(Debug, Clone)]
pub struct EntitySchema {
    /// 엔티티 이름 (설정의 `entities` 키)
    pub name: String,

    /// 데이터베이스 종류
    pub kind: DatabaseKind,

    /// backing 컬럼 집합 (문서 DB는 비어 있음)
    columns: HashSet<String>,

    /// backing → exposed
    backing_to_exposed: HashMap<String, String>,

    /// exposed → backing
    exposed_to_backing: HashMap<String, String>,
}

impl EntitySchema {
    /// 관계형 엔티티 생성 (매핑 없음: exposed = backing)
    pub fn relational<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: HashSet<String> = columns.into_iter().map(Into::into).collect();
        let backing_to_exposed = columns.iter().map(|c| (c.clone(), c.clone())).collect();
        let exposed_to_backing = columns.iter().map(|c| (c.clone(), c.clone())).collect();

        Self {
            name: name.into(),
            kind: DatabaseKind::Relational,
            columns,
            backing_to_exposed,
            exposed_to_backing,
        }
    }

    /// 문서 DB 엔티티 생성
    pub fn document(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DatabaseKind::Document,
            columns: HashSet::new(),
            backing_to_exposed: HashMap::new(),
            exposed_to_backing: HashMap::new(),
        }
    }

    /// backing 컬럼의 노출 이름 변경
    ///
    /// 존재하지 않는 컬럼이면 false를 반환합니다.
    pub fn map_column(&mut self, backing: &str, exposed: impl Into<String>) -> bool {
        if !self.columns.contains(backing) {
            return false;
        }

        let exposed = exposed.into();
        if let Some(previous) = self.backing_to_exposed.insert(backing.to_string(), exposed.clone()) {
            self.exposed_to_backing.remove(&previous);
        }
        self.exposed_to_backing.insert(exposed, backing.to_string());
        true
    }

    /// 빌더 스타일 매핑
    pub fn with_mapping(mut self, backing: &str, exposed: impl Into<String>) -> Self {
        self.map_column(backing, exposed);
        self
    }

    /// backing 컬럼 집합
    pub fn columns(&self) -> &HashSet<String> {
        &self.columns
    }

    /// exposed 이름 → backing 이름
    ///
    /// 문서 DB는 필드 이름을 그대로 사용합니다.
    pub fn backing_column(&self, exposed: &str) -> Option<String> {
        if self.kind.is_schemaless() {
            return Some(exposed.to_string());
        }
        self.exposed_to_backing.get(exposed).cloned()
    }

    /// backing 이름 → exposed 이름
    pub fn exposed_column(&self, backing: &str) -> Option<String> {
        if self.kind.is_schemaless() {
            return Some(backing.to_string());
        }
        self.backing_to_exposed.get(backing).cloned()
    }

    /// exposed 이름이 이미 다른 backing 컬럼에 쓰이고 있는지
    pub(crate) fn exposed_in_use(&self, exposed: &str) -> bool {
        self.exposed_to_backing.contains_key(exposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relational_mapping() {
        let book = EntitySchema::relational("Book", ["id", "title", "publisher_id"])
            .with_mapping("publisher_id", "publisher");

        assert_eq!(book.backing_column("publisher"), Some("publisher_id".to_string()));
        assert_eq!(book.exposed_column("publisher_id"), Some("publisher".to_string()));
        assert_eq!(book.backing_column("title"), Some("title".to_string()));

        // 매핑 후에는 원래 backing 이름으로 접근할 수 없음
        assert_eq!(book.backing_column("publisher_id"), None);
        assert_eq!(book.backing_column("unknown"), None);
    }

    #[test]
    fn test_map_unknown_column() {
        let mut book = EntitySchema::relational("Book", ["id"]);
        assert!(!book.map_column("missing", "x"));
        assert!(book.map_column("id", "book_id"));
        assert!(book.exposed_in_use("book_id"));
        assert!(!book.exposed_in_use("id"));
    }

    #[test]
    fn test_document_resolves_any_field() {
        let doc = EntitySchema::document("Planet");
        assert!(doc.columns().is_empty());
        assert_eq!(doc.backing_column("name"), Some("name".to_string()));
        assert_eq!(doc.exposed_column("name"), Some("name".to_string()));
    }
}
