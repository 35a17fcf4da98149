//! Bridge 앱 상태

use std::sync::Arc;

use dgw_core::authorization::PermissionStore;
use dgw_core::config::RuntimeConfig;
use dgw_core::schema::{SchemaMetadataProvider, SchemaParser};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// 앱 상태
///
/// 모든 핸들러에서 공유하는 상태입니다.
pub struct AppState {
    /// 설정
    pub config: Config,

    /// 권한 인덱스 (핫 리로드 시 통째로 교체)
    pub permissions: PermissionStore,

    /// 서버 종료 신호 (요청별 토큰의 부모)
    pub shutdown: CancellationToken,
}

impl AppState {
    /// 설정 파일을 읽어 새 상태 생성
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let (runtime, schema) = load_files(config)?;
        let permissions = PermissionStore::build(&runtime, schema)?;

        let snapshot = permissions.snapshot();
        tracing::info!(
            entities = snapshot.entity_names().count(),
            config = %config.runtime_config_path.display(),
            "permission index loaded"
        );

        Ok(Self::with_store(config.clone(), permissions))
    }

    /// 이미 빌드된 인덱스로 상태 생성
    pub fn with_store(config: Config, permissions: PermissionStore) -> Self {
        Self {
            config,
            permissions,
            shutdown: CancellationToken::new(),
        }
    }

    /// 설정 파일을 다시 읽어 인덱스 교체
    ///
    /// 실패하면 이전 인덱스가 그대로 유지됩니다. 반환값은 새 인덱스의 엔티티 수입니다.
    pub fn reload(&self) -> dgw_core::Result<usize> {
        let (runtime, schema) = load_files(&self.config)?;
        let index = self.permissions.reload(&runtime, schema)?;
        Ok(index.entity_names().count())
    }

    /// 요청 단위 취소 토큰
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

fn load_files(config: &Config) -> dgw_core::Result<(RuntimeConfig, Arc<dyn SchemaMetadataProvider>)> {
    let schema = SchemaParser::load(&config.schema_path)?;
    let runtime = RuntimeConfig::load(&config.runtime_config_path)?;
    Ok((runtime, Arc::new(schema)))
}
