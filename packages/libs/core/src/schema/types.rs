//! 데이터베이스 종류

use serde::{Deserialize, Serialize};

/// 엔티티가 저장된 데이터베이스 종류
///
/// 문서 DB는 고정된 컬럼 집합이 없으므로 컬럼 universe가 비어 있습니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseKind {
    /// 관계형 DB (테이블/뷰)
    #[default]
    Relational,

    /// 문서 DB (스키마리스 컬렉션)
    Document,
}

impl DatabaseKind {
    /// 스키마리스 여부
    pub fn is_schemaless(&self) -> bool {
        matches!(self, DatabaseKind::Document)
    }
}
