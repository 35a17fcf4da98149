//! REST 요청 컨텍스트
//!
//! 권한 파이프라인이 검사할 요청 정보를 모읍니다.
//! 경로의 primary key 필드, body 필드, `$select`/`$filter`/`$orderby` 쿼리 파라미터에서
//! 요청이 참조하는 컬럼(exposed 이름)을 추출합니다.

use std::fmt;

use serde_json::Value;

use crate::config::Operation;
use crate::error::{Error, Result};

/// `$select` 쿼리 파라미터
pub const SELECT_PARAM: &str = "$select";

/// `$filter` 쿼리 파라미터
pub const FILTER_PARAM: &str = "$filter";

/// `$orderby` 쿼리 파라미터
pub const ORDER_BY_PARAM: &str = "$orderby";

/// 필터 식에서 컬럼이 아닌 예약어
const FILTER_KEYWORDS: &[&str] = &[
    "eq", "ne", "gt", "ge", "lt", "le", "and", "or", "not", "null", "true", "false",
];

/// REST 메서드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RestMethod {
    /// HTTP 메서드 이름에서 파싱
    pub fn parse(method: &str) -> Result<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(RestMethod::Get),
            "POST" => Ok(RestMethod::Post),
            "PUT" => Ok(RestMethod::Put),
            "PATCH" => Ok(RestMethod::Patch),
            "DELETE" => Ok(RestMethod::Delete),
            other => Err(Error::bad_request(format!("unsupported HTTP method '{}'", other))),
        }
    }

    /// 필요한 CRUD 작업
    ///
    /// PUT/PATCH는 upsert이므로 Create와 Update가 모두 필요합니다.
    pub fn operations(self) -> Vec<Operation> {
        match self {
            RestMethod::Get => vec![Operation::Read],
            RestMethod::Post => vec![Operation::Create],
            RestMethod::Put | RestMethod::Patch => vec![Operation::Create, Operation::Update],
            RestMethod::Delete => vec![Operation::Delete],
        }
    }

    /// 행 정책을 가져올 작업
    pub fn primary_operation(self) -> Operation {
        match self {
            RestMethod::Get => Operation::Read,
            RestMethod::Post => Operation::Create,
            RestMethod::Put | RestMethod::Patch => Operation::Update,
            RestMethod::Delete => Operation::Delete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RestMethod::Get => "GET",
            RestMethod::Post => "POST",
            RestMethod::Put => "PUT",
            RestMethod::Patch => "PATCH",
            RestMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// REST 요청 컨텍스트
#[derive(Debug, Clone)]
pub struct RestRequestContext {
    /// 엔티티 이름
    pub entity: String,

    /// 요청 메서드
    pub method: RestMethod,

    /// 경로의 primary key (필드, 값) 쌍
    pub primary_key: Vec<(String, String)>,

    /// body 필드
    pub body_fields: Vec<String>,

    /// `$select` 필드 (None = 지정 안 함)
    pub select: Option<Vec<String>>,

    /// `$filter`에서 참조한 필드
    pub filter_fields: Vec<String>,

    /// `$orderby` 필드
    pub order_by: Vec<String>,

    /// 응답 projection (권한 검사 후 확정)
    projection: Vec<String>,
}

impl RestRequestContext {
    pub fn new(entity: impl Into<String>, method: RestMethod) -> Self {
        Self {
            entity: entity.into(),
            method,
            primary_key: Vec::new(),
            body_fields: Vec::new(),
            select: None,
            filter_fields: Vec::new(),
            order_by: Vec::new(),
            projection: Vec::new(),
        }
    }

    /// primary key 경로 파싱 (`id/1/title/abc` → [(id, 1), (title, abc)])
    pub fn with_primary_key_route(mut self, route: &str) -> Result<Self> {
        let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() % 2 != 0 {
            return Err(Error::bad_request(
                "primary key route must consist of field/value pairs",
            ));
        }

        self.primary_key = segments
            .chunks(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();
        Ok(self)
    }

    /// 쿼리 파라미터 반영
    ///
    /// `$` 로 시작하지 않는 파라미터와 알 수 없는 `$` 파라미터는 컬럼 참조가 아니므로 무시합니다.
    pub fn with_query<'a, I>(mut self, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in params {
            match key {
                SELECT_PARAM => {
                    let fields = split_list(value);
                    if fields.is_empty() {
                        return Err(Error::bad_request("$select must name at least one field"));
                    }
                    self.select = Some(fields);
                }
                FILTER_PARAM => {
                    self.filter_fields = filter_field_references(value)?;
                }
                ORDER_BY_PARAM => {
                    self.order_by = split_list(value)
                        .into_iter()
                        .filter_map(|clause| clause.split_whitespace().next().map(str::to_string))
                        .collect();
                }
                _ => {}
            }
        }
        Ok(self)
    }

    /// 요청 body 반영
    ///
    /// body는 JSON object여야 합니다. `null`은 body 없음으로 취급합니다.
    pub fn with_body(mut self, body: &Value) -> Result<Self> {
        match body {
            Value::Null => {}
            Value::Object(map) => self.body_fields = map.keys().cloned().collect(),
            _ => return Err(Error::bad_request("request body must be a JSON object")),
        }
        Ok(self)
    }

    /// 요청이 참조한 모든 컬럼 (중복 제거, 처음 등장 순서)
    pub fn cumulative_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();

        let referenced = self
            .primary_key
            .iter()
            .map(|(field, _)| field)
            .chain(self.body_fields.iter())
            .chain(self.select.iter().flatten())
            .chain(self.filter_fields.iter())
            .chain(self.order_by.iter());

        for column in referenced {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        columns
    }

    /// `$select`를 지정했는지
    pub fn has_explicit_select(&self) -> bool {
        self.select.is_some()
    }

    /// 응답 projection 확정
    pub fn update_return_fields(&mut self, fields: impl IntoIterator<Item = String>) {
        self.projection = fields.into_iter().collect();
        self.projection.sort();
    }

    /// 응답 projection
    ///
    /// 확정 전에는 `$select` 목록을 그대로 돌려줍니다.
    pub fn projection(&self) -> Vec<String> {
        if !self.projection.is_empty() {
            return self.projection.clone();
        }
        self.select.clone().unwrap_or_default()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `$filter` 식에서 필드 참조 추출
///
/// 작은따옴표 literal, 숫자, 예약어, 함수 이름(`contains(` 등)은 건너뜁니다.
pub fn filter_field_references(filter: &str) -> Result<Vec<String>> {
    let chars: Vec<char> = filter.chars().collect();
    let mut fields: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(Error::bad_request("unterminated string literal in $filter")),
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => i += 2,
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(_) => i += 1,
                }
            }
            continue;
        }

        if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | '-' | ':')) {
                i += 1;
            }
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();

            let mut next = i;
            while next < chars.len() && chars[next].is_whitespace() {
                next += 1;
            }
            let is_function = chars.get(next) == Some(&'(');
            let is_keyword = FILTER_KEYWORDS.contains(&word.to_ascii_lowercase().as_str());

            if !is_function && !is_keyword && !fields.contains(&word) {
                fields.push(word);
            }
            continue;
        }

        i += 1;
    }

    Ok(fields)
}
