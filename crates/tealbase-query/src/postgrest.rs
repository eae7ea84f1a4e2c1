//! Rendering of queries into PostgREST requests, and parsing of its responses.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, RANGE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use url::Url;

use tealbase_core::{StatusCode, TealbaseError, TealbaseResponse, TealbaseResult};

use crate::executor::{QueryOperation, QueryRequest, RpcRequest};
use crate::filter::{FilterOp, FilterOperator};

const PREFER: HeaderName = HeaderName::from_static("prefer");
const RANGE_UNIT: HeaderName = HeaderName::from_static("range-unit");
const ACCEPT_PROFILE: HeaderName = HeaderName::from_static("accept-profile");
const CONTENT_PROFILE: HeaderName = HeaderName::from_static("content-profile");
const OBJECT_JSON: &str = "application/vnd.pgrst.object+json";

/// An HTTP request ready to be sent.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<JsonValue>,
}

/// Render a table query. Chain operations are emitted in the order applied.
pub fn render_query(request: &QueryRequest) -> TealbaseResult<Rendered> {
    let mut url = request.url.clone();
    let mut headers = request.headers.clone();
    let mut params: Vec<(String, String)> = Vec::new();
    let mut orders: Vec<String> = Vec::new();
    let mut range = None;
    let mut single = false;

    if let QueryOperation::Select { columns } = &request.operation {
        params.push(("select".to_string(), clean_columns(columns)));
    }

    for op in request.ops() {
        match op {
            FilterOp::Filter {
                column,
                operator,
                criteria,
            } => params.push((
                column.clone(),
                format!("{}.{}", operator.postgrest_op(), render_criteria(*operator, criteria)),
            )),
            FilterOp::Match(map) => {
                for (column, value) in map {
                    params.push((column.clone(), format!("eq.{}", render_scalar(value))));
                }
            }
            FilterOp::Order {
                column,
                ascending,
                nulls_first,
            } => orders.push(format!(
                "{}.{}.{}",
                column,
                if *ascending { "asc" } else { "desc" },
                if *nulls_first { "nullsfirst" } else { "nullslast" },
            )),
            // The last range wins.
            FilterOp::Range { from, to } => range = Some((*from, *to)),
            FilterOp::Single => single = true,
        }
    }

    if !orders.is_empty() {
        params.push(("order".to_string(), orders.join(",")));
    }

    if let Some((from, to)) = range {
        let limit = to
            .checked_sub(from)
            .and_then(|span| span.checked_add(1))
            .filter(|_| from >= 0 && to >= from)
            .ok_or_else(|| {
                TealbaseError::query_builder(format!("Invalid range {from}..={to}"))
            })?;
        params.push(("offset".to_string(), from.to_string()));
        params.push(("limit".to_string(), limit.to_string()));
        headers.insert(RANGE, header_value(&format!("{from}-{to}"))?);
        headers.insert(RANGE_UNIT, HeaderValue::from_static("items"));
    }

    if single {
        headers.insert(ACCEPT, HeaderValue::from_static(OBJECT_JSON));
    }

    let mut prefer = Vec::new();
    let (method, body) = match &request.operation {
        QueryOperation::Select { .. } => (Method::GET, None),
        QueryOperation::Insert { rows } => {
            prefer.push("return=representation".to_string());
            let rows = rows.iter().cloned().map(|r| r.into_json()).collect();
            (Method::POST, Some(JsonValue::Array(rows)))
        }
        QueryOperation::Update { values } => {
            prefer.push("return=representation".to_string());
            (Method::PATCH, Some(values.clone().into_json()))
        }
        QueryOperation::Delete => {
            prefer.push("return=representation".to_string());
            (Method::DELETE, None)
        }
    };
    if let Some(count) = request.count {
        prefer.push(format!("count={}", count.as_str()));
    }
    if !prefer.is_empty() {
        headers.insert(PREFER, header_value(&prefer.join(","))?);
    }

    apply_schema(&mut headers, &request.schema, request.operation.is_read())?;
    headers
        .entry(ACCEPT)
        .or_insert(HeaderValue::from_static("application/json"));

    append_params(&mut url, &params);

    Ok(Rendered {
        method,
        url,
        headers,
        body,
    })
}

/// Render a procedure call. `head` and `get` move the arguments into the query string.
pub fn render_rpc(request: &RpcRequest) -> TealbaseResult<Rendered> {
    let mut url = request.url.clone();
    let mut headers = request.headers.clone();
    let options = request.options;

    let (method, body) = if options.head || options.get {
        if let JsonValue::Object(args) = &request.args {
            let params: Vec<(String, String)> = args
                .iter()
                .map(|(k, v)| (k.clone(), render_arg(v)))
                .collect();
            append_params(&mut url, &params);
        }
        let method = if options.head { Method::HEAD } else { Method::GET };
        (method, None)
    } else {
        let body = match &request.args {
            JsonValue::Null => JsonValue::Object(Default::default()),
            other => other.clone(),
        };
        (Method::POST, Some(body))
    };

    if let Some(count) = options.count {
        headers.insert(PREFER, header_value(&format!("count={}", count.as_str()))?);
    }

    apply_schema(&mut headers, &request.schema, method != Method::POST)?;
    headers
        .entry(ACCEPT)
        .or_insert(HeaderValue::from_static("application/json"));

    Ok(Rendered {
        method,
        url,
        headers,
        body,
    })
}

/// Format the right-hand side of a filter (without the operator prefix).
pub fn render_criteria(operator: FilterOperator, criteria: &JsonValue) -> String {
    match operator {
        FilterOperator::In => match criteria {
            JsonValue::Array(values) => {
                let items: Vec<String> = values.iter().map(render_list_item).collect();
                format!("({})", items.join(","))
            }
            other => format!("({})", render_list_item(other)),
        },
        FilterOperator::Cs | FilterOperator::Cd | FilterOperator::Ova => match criteria {
            JsonValue::Array(values) => array_literal(values),
            other => render_scalar(other),
        },
        _ => render_scalar(criteria),
    }
}

fn render_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_list_item(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) if s.contains([',', '(', ')']) => format!("\"{s}\""),
        other => render_scalar(other),
    }
}

fn render_arg(value: &JsonValue) -> String {
    match value {
        JsonValue::Array(values) => array_literal(values),
        other => render_scalar(other),
    }
}

fn array_literal(values: &[JsonValue]) -> String {
    let items: Vec<String> = values.iter().map(render_scalar).collect();
    format!("{{{}}}", items.join(","))
}

fn clean_columns(columns: &str) -> String {
    let trimmed = columns.trim();
    if trimmed.is_empty() {
        return "*".to_string();
    }
    // Whitespace outside quotes is insignificant to PostgREST.
    let mut quoted = false;
    trimmed
        .chars()
        .filter(|c| {
            if *c == '"' {
                quoted = !quoted;
            }
            quoted || !c.is_whitespace()
        })
        .collect()
}

fn apply_schema(headers: &mut HeaderMap, schema: &str, read: bool) -> TealbaseResult<()> {
    if schema.is_empty() || schema == "public" {
        return Ok(());
    }
    let name = if read { ACCEPT_PROFILE } else { CONTENT_PROFILE };
    if !headers.contains_key(&name) {
        headers.insert(name, header_value(schema)?);
    }
    Ok(())
}

fn append_params(url: &mut Url, params: &[(String, String)]) {
    if params.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in params {
        pairs.append_pair(key, value);
    }
}

fn header_value(value: &str) -> TealbaseResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| TealbaseError::query_builder(format!("invalid header value '{value}': {e}")))
}

/// Parse a regular PostgREST response body.
pub fn parse_response<T: DeserializeOwned>(
    status: u16,
    headers: &HeaderMap,
    body: &str,
    single: bool,
) -> TealbaseResponse<T> {
    if status >= 400 {
        return parse_error_response(status, body);
    }

    let count = parse_count(headers);
    if status == 204 || body.trim().is_empty() {
        return TealbaseResponse::no_content().with_count(count);
    }

    let data = if single {
        serde_json::from_str::<T>(body).map(|item| vec![item])
    } else {
        serde_json::from_str::<Vec<T>>(body)
            .or_else(|_| serde_json::from_str::<T>(body).map(|item| vec![item]))
    };

    match data {
        Ok(data) => TealbaseResponse::ok(data)
            .with_status(StatusCode::from_u16(status))
            .with_count(count),
        Err(e) => TealbaseResponse::error(TealbaseError::serialization(format!(
            "Failed to parse response: {e}"
        ))),
    }
}

/// Parse the response to a HEAD request: only the count matters.
pub fn parse_head_response<T>(status: u16, headers: &HeaderMap) -> TealbaseResponse<T> {
    if (200..300).contains(&status) {
        TealbaseResponse::ok(Vec::new())
            .with_status(StatusCode::from_u16(status))
            .with_count(parse_count(headers))
    } else {
        TealbaseResponse::error(TealbaseError::postgrest(
            status,
            format!("HEAD request failed with status {status}"),
            None,
        ))
    }
}

/// Total from a `Content-Range` header: `0-9/100` or `*/100`.
pub fn parse_count(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.rsplit_once('/'))
        .and_then(|(_, total)| total.parse::<i64>().ok())
}

fn parse_error_response<T>(status: u16, body: &str) -> TealbaseResponse<T> {
    // PostgREST error format: { "message", "code", "details", "hint" }
    let field =
        |obj: &JsonValue, key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);
    let error = match serde_json::from_str::<JsonValue>(body) {
        Ok(obj) if obj.is_object() => TealbaseError::Postgrest {
            status,
            message: field(&obj, "message").unwrap_or_else(|| "Unknown error".to_string()),
            code: field(&obj, "code"),
            details: field(&obj, "details"),
            hint: field(&obj, "hint"),
        },
        _ => TealbaseError::postgrest(status, body, None),
    };
    TealbaseResponse::error(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CountOption, RpcOptions};
    use serde_json::json;
    use tealbase_core::{row, Row};

    fn request(operation: QueryOperation, schema: &str) -> QueryRequest {
        let url = Url::parse("http://localhost:3000/rest/v1/users").unwrap();
        QueryRequest::new(url, "users", schema, HeaderMap::new(), operation)
    }

    fn select() -> QueryOperation {
        QueryOperation::Select {
            columns: "*".to_string(),
        }
    }

    fn pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn p(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn select_with_filter_order_single() {
        let mut req = request(select(), "public");
        req.apply(FilterOp::Filter {
            column: "id".into(),
            operator: FilterOperator::Eq,
            criteria: json!(1),
        });
        req.apply(FilterOp::Order {
            column: "name".into(),
            ascending: true,
            nulls_first: false,
        });
        req.apply(FilterOp::Single);

        let rendered = render_query(&req).unwrap();
        assert_eq!(rendered.method, Method::GET);
        assert_eq!(
            pairs(&rendered.url),
            vec![p("select", "*"), p("id", "eq.1"), p("order", "name.asc.nullslast")]
        );
        assert_eq!(rendered.headers.get(ACCEPT).unwrap(), OBJECT_JSON);
        assert!(rendered.headers.get(ACCEPT_PROFILE).is_none());
    }

    #[test]
    fn select_columns_are_compacted() {
        let req = request(
            QueryOperation::Select {
                columns: "id, name, \"first name\"".to_string(),
            },
            "public",
        );
        let rendered = render_query(&req).unwrap();
        assert_eq!(pairs(&rendered.url), vec![p("select", "id,name,\"first name\"")]);
    }

    #[test]
    fn in_list_quotes_reserved_characters() {
        assert_eq!(
            render_criteria(FilterOperator::In, &json!(["a", "b,c", 3])),
            "(a,\"b,c\",3)"
        );
    }

    #[test]
    fn containment_renders_array_literal() {
        assert_eq!(
            render_criteria(FilterOperator::Cs, &json!(["a", "b"])),
            "{a,b}"
        );
        assert_eq!(
            render_criteria(FilterOperator::Cd, &json!({"k": 1})),
            "{\"k\":1}"
        );
        assert_eq!(
            render_criteria(FilterOperator::Ovr, &json!("[1,5)")),
            "[1,5)"
        );
    }

    #[test]
    fn is_null_renders_literal() {
        assert_eq!(render_criteria(FilterOperator::Is, &JsonValue::Null), "null");
        assert_eq!(render_criteria(FilterOperator::Is, &json!(true)), "true");
    }

    #[test]
    fn match_expands_to_eq_filters() {
        let mut req = request(select(), "public");
        let mut map = serde_json::Map::new();
        map.insert("name".into(), json!("Bali"));
        map.insert("country".into(), json!("ID"));
        req.apply(FilterOp::Match(map));
        let rendered = render_query(&req).unwrap();
        assert_eq!(
            pairs(&rendered.url),
            vec![p("select", "*"), p("name", "eq.Bali"), p("country", "eq.ID")]
        );
    }

    #[test]
    fn range_sets_offset_limit_and_header() {
        let mut req = request(select(), "public");
        req.apply(FilterOp::Range { from: 10, to: 19 });
        let rendered = render_query(&req).unwrap();
        assert_eq!(
            pairs(&rendered.url),
            vec![p("select", "*"), p("offset", "10"), p("limit", "10")]
        );
        assert_eq!(rendered.headers.get(RANGE).unwrap(), "10-19");
    }

    #[test]
    fn inverted_or_overflowing_range_is_rejected() {
        for (from, to) in [(5, 4), (-1, 3), (i64::MIN, i64::MAX), (0, i64::MAX)] {
            let mut req = request(select(), "public");
            req.apply(FilterOp::Range { from, to });
            let err = render_query(&req).unwrap_err();
            assert!(matches!(err, TealbaseError::QueryBuilder(_)), "{from}..={to}");
        }
    }

    #[test]
    fn non_public_schema_sets_profile_headers() {
        let rendered = render_query(&request(select(), "personal")).unwrap();
        assert_eq!(rendered.headers.get(ACCEPT_PROFILE).unwrap(), "personal");

        let rendered = render_query(&request(QueryOperation::Delete, "personal")).unwrap();
        assert_eq!(rendered.headers.get(CONTENT_PROFILE).unwrap(), "personal");
        assert_eq!(rendered.method, Method::DELETE);
    }

    #[test]
    fn insert_posts_rows_with_representation() {
        let mut req = request(
            QueryOperation::Insert {
                rows: vec![row![("name", "Alice")]],
            },
            "public",
        );
        req.count = Some(CountOption::Exact);
        let rendered = render_query(&req).unwrap();
        assert_eq!(rendered.method, Method::POST);
        assert_eq!(rendered.body, Some(json!([{"name": "Alice"}])));
        assert_eq!(
            rendered.headers.get(PREFER).unwrap(),
            "return=representation,count=exact"
        );
    }

    #[test]
    fn update_patches_values() {
        let req = request(
            QueryOperation::Update {
                values: Row::from_json(json!({"status": "done"})).unwrap(),
            },
            "public",
        );
        let rendered = render_query(&req).unwrap();
        assert_eq!(rendered.method, Method::PATCH);
        assert_eq!(rendered.body, Some(json!({"status": "done"})));
    }

    fn rpc_request(args: JsonValue, options: RpcOptions) -> RpcRequest {
        RpcRequest {
            url: Url::parse("http://localhost:3000/rest/v1/rpc/add_one").unwrap(),
            function: "add_one".into(),
            schema: "public".into(),
            headers: HeaderMap::new(),
            args,
            options,
        }
    }

    #[test]
    fn rpc_posts_args() {
        let rendered = render_rpc(&rpc_request(json!({"n": 1}), RpcOptions::default())).unwrap();
        assert_eq!(rendered.method, Method::POST);
        assert_eq!(rendered.body, Some(json!({"n": 1})));
        assert!(rendered.url.query().is_none());
    }

    #[test]
    fn rpc_null_args_post_empty_object() {
        let rendered = render_rpc(&rpc_request(JsonValue::Null, RpcOptions::default())).unwrap();
        assert_eq!(rendered.body, Some(json!({})));
    }

    #[test]
    fn rpc_head_moves_args_to_query() {
        let options = RpcOptions::default().head(true).count(CountOption::Exact);
        let rendered = render_rpc(&rpc_request(json!({"ids": [1, 2]}), options)).unwrap();
        assert_eq!(rendered.method, Method::HEAD);
        assert!(rendered.body.is_none());
        assert_eq!(pairs(&rendered.url), vec![p("ids", "{1,2}")]);
        assert_eq!(rendered.headers.get(PREFER).unwrap(), "count=exact");
    }

    #[test]
    fn count_from_content_range() {
        let mut headers = HeaderMap::new();
        headers.insert("content-range", HeaderValue::from_static("0-9/100"));
        assert_eq!(parse_count(&headers), Some(100));
        headers.insert("content-range", HeaderValue::from_static("0-9/*"));
        assert_eq!(parse_count(&headers), None);
    }

    #[test]
    fn error_body_is_passed_through() {
        let body = r#"{"message":"relation does not exist","code":"42P01","details":null,"hint":"check"}"#;
        let resp = parse_response::<Row>(404, &HeaderMap::new(), body, false);
        assert_eq!(resp.status, StatusCode::NotFound);
        assert_eq!(
            resp.error,
            Some(TealbaseError::Postgrest {
                status: 404,
                message: "relation does not exist".into(),
                code: Some("42P01".into()),
                details: None,
                hint: Some("check".into()),
            })
        );
    }

    #[test]
    fn single_object_body() {
        let resp = parse_response::<Row>(200, &HeaderMap::new(), r#"{"id":1}"#, true);
        assert!(resp.is_ok());
        assert_eq!(resp.data.len(), 1);
    }

    #[test]
    fn scalar_rpc_body() {
        let resp = parse_response::<JsonValue>(200, &HeaderMap::new(), "42", false);
        assert_eq!(resp.data, vec![json!(42)]);
    }

    #[test]
    fn empty_body_is_no_content() {
        let resp = parse_response::<Row>(204, &HeaderMap::new(), "", false);
        assert_eq!(resp.status, StatusCode::NoContent);
        assert!(resp.data.is_empty());
    }
}
