//! REST 권한 핸들러
//!
//! `/api/{entity}` 및 `/api/{entity}/{key}/{value}/...` 요청에 대해 권한 파이프라인을 실행하고,
//! 허용된 경우 하위 쿼리 빌더가 사용할 쿼리 계획(projection + 행 조건)을 반환합니다.
//! SQL을 생성하거나 실행하지 않습니다.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use dgw_core::auth::{ClaimsIdentity, ClientPrincipal, CLIENT_PRINCIPAL_HEADER};
use dgw_core::authorization::{AuthorizationOutcome, RestMethod, RestRequestContext};
use dgw_core::config::Operation;
use dgw_core::CLIENT_ROLE_HEADER;

use crate::error::{BridgeError, Result};
use crate::state::AppState;

/// 허용된 요청의 쿼리 계획
#[derive(Debug, Serialize)]
pub struct QueryPlan {
    pub entity: String,
    pub method: String,
    pub role: String,
    pub operations: Vec<Operation>,

    #[serde(rename = "primaryKey", skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<KeyField>,

    pub projection: Vec<String>,

    /// 행 조건 (없으면 빈 문자열)
    pub predicate: String,
}

#[derive(Debug, Serialize)]
pub struct KeyField {
    pub field: String,
    pub value: String,
}

type QueryParams = Query<Vec<(String, String)>>;

/// `/api/:entity`
pub async fn handle_collection(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    method: Method,
    headers: HeaderMap,
    Query(params): QueryParams,
    body: Bytes,
) -> Result<Json<QueryPlan>> {
    authorize_request(&state, entity, None, &method, &headers, &params, &body)
}

/// `/api/:entity/*key`
pub async fn handle_item(
    State(state): State<Arc<AppState>>,
    Path((entity, key)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    Query(params): QueryParams,
    body: Bytes,
) -> Result<Json<QueryPlan>> {
    authorize_request(&state, entity, Some(key), &method, &headers, &params, &body)
}

fn authorize_request(
    state: &AppState,
    entity: String,
    key_route: Option<String>,
    method: &Method,
    headers: &HeaderMap,
    params: &[(String, String)],
    body: &Bytes,
) -> Result<Json<QueryPlan>> {
    let cancel = state.request_token();
    let pipeline = state.permissions.pipeline();

    if pipeline.resolver().index().entity(&entity).is_none() {
        return Err(BridgeError::NotFound {
            message: format!("entity '{}' is not configured", entity),
        });
    }

    let identity = resolve_identity(headers)?;
    let role_header = role_header_values(headers, &identity)?;

    let body = parse_body(body)?;
    let rest_method = RestMethod::parse(method.as_str())?;

    let mut context = RestRequestContext::new(entity, rest_method)
        .with_query(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))?
        .with_body(&body)?;
    if let Some(route) = key_route.as_deref() {
        context = context.with_primary_key_route(route)?;
    }

    let outcome = pipeline.authorize(&mut context, &role_header, &identity, &cancel)?;

    match outcome {
        AuthorizationOutcome::Allowed {
            projection,
            predicate,
        } => Ok(Json(QueryPlan {
            entity: context.entity.clone(),
            method: rest_method.to_string(),
            role: role_header.first().map(|r| r.to_string()).unwrap_or_default(),
            operations: rest_method.operations(),
            primary_key: context
                .primary_key
                .iter()
                .map(|(field, value)| KeyField {
                    field: field.clone(),
                    value: value.clone(),
                })
                .collect(),
            projection,
            predicate,
        })),
        AuthorizationOutcome::Denied { error, .. } => Err(BridgeError::Core(error)),
    }
}

/// principal 헤더 → 신원 (없으면 익명)
fn resolve_identity(headers: &HeaderMap) -> Result<ClaimsIdentity> {
    let Some(value) = headers.get(CLIENT_PRINCIPAL_HEADER) else {
        return Ok(ClaimsIdentity::anonymous());
    };

    let value = value.to_str().map_err(|_| BridgeError::BadRequest {
        message: "client principal header is not valid ASCII".to_string(),
    })?;

    Ok(ClientPrincipal::decode(value)?.into_identity())
}

/// 역할 헤더 값 목록
///
/// 헤더가 없으면 신원의 기본 역할을 사용합니다. 여러 개의 값은 그대로 넘겨 파이프라인이 거부하게 합니다.
fn role_header_values<'a>(headers: &'a HeaderMap, identity: &ClaimsIdentity) -> Result<Vec<&'a str>> {
    let values = headers
        .get_all(CLIENT_ROLE_HEADER)
        .iter()
        .map(|v| {
            v.to_str().map_err(|_| BridgeError::BadRequest {
                message: "client role header is not valid ASCII".to_string(),
            })
        })
        .collect::<Result<Vec<&str>>>()?;

    if values.is_empty() {
        return Ok(vec![identity.default_role()]);
    }
    Ok(values)
}

fn parse_body(body: &Bytes) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| BridgeError::BadRequest {
        message: format!("request body is not valid JSON: {}", e),
    })
}
