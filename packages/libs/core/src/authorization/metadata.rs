//! 권한 인덱스 메타데이터
//!
//! 엔티티 → 역할 → 작업 → 컬럼/정책의 중첩 구조와,
//! 스키마 생성기가 사용하는 역방향 인덱스(작업 → 역할, 필드 → 작업 → 역할)를 정의합니다.
//! 모든 값은 인덱스 빌드 시 한 번 만들어지고 이후 변경되지 않습니다.

use std::collections::{HashMap, HashSet};

use crate::config::Operation;

/// (엔티티, 역할, 작업) 단위 권한
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationMetadata {
    /// 허용 backing 컬럼
    pub included: HashSet<String>,

    /// 제외 backing 컬럼 (항상 included보다 우선)
    pub excluded: HashSet<String>,

    /// 와일드카드 include 여부 (문서 DB처럼 컬럼 universe가 없는 경우에도 의미 유지)
    pub include_all: bool,

    /// 와일드카드 exclude 여부
    pub exclude_all: bool,

    /// `included − excluded`의 exposed 이름 (빌드 시 미리 계산)
    pub allowed_exposed_columns: HashSet<String>,

    /// DB 정책 템플릿 (없으면 행 제한 없음)
    pub database_policy: Option<String>,
}

impl OperationMetadata {
    /// backing 컬럼 허용 여부
    pub fn permits(&self, backing: &str) -> bool {
        if self.exclude_all || self.excluded.contains(backing) {
            return false;
        }
        self.include_all || self.included.contains(backing)
    }

    /// `included − excluded` (backing 이름)
    pub fn allowed_columns(&self) -> impl Iterator<Item = &String> {
        self.included
            .iter()
            .filter(move |c| !self.exclude_all && !self.excluded.contains(*c))
    }
}

/// (엔티티, 역할) 단위 권한
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleMetadata {
    /// 작업 → 작업별 권한
    pub operation_to_columns: HashMap<Operation, OperationMetadata>,
}

/// 엔티티 단위 권한
#[derive(Debug, Clone, Default)]
pub struct EntityMetadata {
    /// 역할 → 역할별 권한
    pub role_to_operation: HashMap<String, RoleMetadata>,

    /// 작업 → 허용 역할 (설정 순서 유지, 중복 없음)
    pub operation_to_roles: HashMap<Operation, Vec<String>>,

    /// backing 컬럼 → 작업 → 허용 역할
    pub field_to_roles: HashMap<String, HashMap<Operation, Vec<String>>>,
}

impl EntityMetadata {
    /// 역할 메타데이터로부터 역방향 인덱스 재계산
    ///
    /// `roles`는 역방향 인덱스에 나타날 역할 순서입니다.
    pub(crate) fn rebuild_inverted_maps(&mut self, roles: &[String]) {
        self.operation_to_roles.clear();
        self.field_to_roles.clear();

        for role in roles {
            let Some(role_meta) = self.role_to_operation.get(role) else {
                continue;
            };

            for op in Operation::concrete() {
                let Some(op_meta) = role_meta.operation_to_columns.get(&op) else {
                    continue;
                };

                push_unique(self.operation_to_roles.entry(op).or_default(), role);

                for column in op_meta.allowed_columns() {
                    let per_op = self.field_to_roles.entry(column.clone()).or_default();
                    push_unique(per_op.entry(op).or_default(), role);
                }
            }
        }
    }
}

fn push_unique(list: &mut Vec<String>, role: &str) {
    if !list.iter().any(|r| r == role) {
        list.push(role.to_string());
    }
}
