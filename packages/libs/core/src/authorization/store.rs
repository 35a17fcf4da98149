//! 권한 인덱스 스냅샷 저장소
//!
//! 요청은 시작 시 `snapshot()`으로 받은 인덱스를 끝까지 사용합니다.
//! 리로드는 락 밖에서 새 인덱스를 빌드한 뒤 참조만 교체하므로
//! 읽는 쪽은 부분적으로 빌드된 인덱스를 볼 수 없습니다.

use std::sync::{Arc, PoisonError, RwLock};

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::schema::SchemaMetadataProvider;

use super::index::PermissionIndex;
use super::pipeline::AuthorizationPipeline;
use super::resolver::AuthorizationResolver;

/// 교체 가능한 권한 인덱스 저장소
#[derive(Debug)]
pub struct PermissionStore {
    current: RwLock<Arc<PermissionIndex>>,
}

impl PermissionStore {
    /// 초기 인덱스로 생성
    pub fn new(index: PermissionIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// 설정 + 스키마로 바로 생성
    pub fn build(config: &RuntimeConfig, schema: Arc<dyn SchemaMetadataProvider>) -> Result<Self> {
        Ok(Self::new(PermissionIndex::build(config, schema)?))
    }

    /// 현재 스냅샷
    pub fn snapshot(&self) -> Arc<PermissionIndex> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 현재 스냅샷에 대한 조회기
    pub fn resolver(&self) -> AuthorizationResolver {
        AuthorizationResolver::new(self.snapshot())
    }

    /// 현재 스냅샷에 대한 파이프라인
    pub fn pipeline(&self) -> AuthorizationPipeline {
        AuthorizationPipeline::new(self.resolver())
    }

    /// 새 설정으로 인덱스 재빌드 후 교체
    ///
    /// 빌드에 실패하면 기존 인덱스를 유지하고 에러를 반환합니다.
    pub fn reload(
        &self,
        config: &RuntimeConfig,
        schema: Arc<dyn SchemaMetadataProvider>,
    ) -> Result<Arc<PermissionIndex>> {
        let index = match PermissionIndex::build(config, schema) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "permission reload rejected, keeping previous index");
                return Err(e);
            }
        };

        Ok(self.swap(index))
    }

    /// 인덱스 교체 (이전 스냅샷 반환)
    pub fn swap(&self, index: PermissionIndex) -> Arc<PermissionIndex> {
        let next = Arc::new(index);
        let entities = next.entity_names().count();

        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next)
        };

        tracing::info!(entities, "permission index swapped");
        previous
    }
}
