//! dgw-core: 데이터 게이트웨이 권한 핵심 라이브러리
//!
//! 이 크레이트는 Bridge가 사용하는 설정, 스키마, 신원, 권한 엔진을 제공합니다.
//!
//! # 모듈 구조
//!
//! - `config`: 런타임 설정(YAML) 파싱
//! - `schema`: 스키마 메타데이터와 backing ↔ exposed 컬럼 매핑
//! - `auth`: claim, 신원, 클라이언트 principal
//! - `authorization`: 권한 인덱스, claim 치환, 조회기, 요청 파이프라인
//! - `error`: 공통 에러 타입

pub mod auth;
pub mod authorization;
pub mod config;
pub mod error;
pub mod schema;

pub use authorization::CLIENT_ROLE_HEADER;
pub use error::{Error, Result};
