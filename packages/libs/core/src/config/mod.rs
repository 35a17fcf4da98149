//! 런타임 설정 파싱
//!
//! # 개요
//!
//! `dgw-config.yaml`을 파싱하여 엔티티별 권한 설정을 강타입 구조로 변환합니다.
//! action 원소(문자열 shorthand 또는 object)는 로드 시점에 한 번만 해석되며,
//! 요청 처리 경로에서는 JSON 형태를 다시 검사하지 않습니다.
//!
//! # 모듈 구조
//!
//! - `permissions`: 엔티티/역할/작업 권한 설정 정의

mod permissions;

pub use permissions::{
    EntityConfig, FieldSpec, Operation, OperationObject, OperationSpec, PermissionSetting,
    PolicySpec, RuntimeConfig,
};
