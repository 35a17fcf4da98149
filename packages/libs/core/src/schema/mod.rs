//! 스키마 메타데이터
//!
//! # 개요
//!
//! 권한 인덱스 빌드와 컬럼 검사에 필요한 엔티티 메타데이터를 제공합니다.
//! 엔티티의 backing 컬럼(실제 DB 필드 이름)과 exposed 컬럼(API에 노출되는 이름)
//! 사이의 매핑, 컬럼 전체 집합, 데이터베이스 종류를 다룹니다.
//!
//! # 모듈 구조
//!
//! - `types`: 데이터베이스 종류
//! - `entity`: 엔티티 스키마 (컬럼 + 이름 매핑)
//! - `provider`: 메타데이터 조회 trait과 프로젝트 스키마
//! - `parser`: `dgw-schema.yaml` 파싱

mod entity;
mod parser;
mod provider;
mod types;

pub use entity::EntitySchema;
pub use parser::SchemaParser;
pub use provider::{ProjectSchema, SchemaMetadataProvider};
pub use types::DatabaseKind;
