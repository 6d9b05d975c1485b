use std::time::Instant;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::{Map, Value};
use url::Url;

use crate::catalog::ToolDefinition;
use crate::error::GatewayError;
use crate::metrics::{PROXY_LATENCY, PROXY_REQUESTS_TOTAL};

/// Allowlist of response headers to forward from the upstream.
const ALLOWED_RESPONSE_HEADERS: &[&str] = &[
    "content-type",
    "cache-control",
    "etag",
    "last-modified",
    "date",
    "x-ratelimit-limit",
    "x-ratelimit-remaining",
    "x-ratelimit-reset",
];

/// Maximum upstream response body size (10 MB).
const MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Turn a JSON object of tool parameters into upstream query pairs.
///
/// `null` values are dropped, scalars are stringified, anything nested and any
/// parameter the tool does not declare is refused.
pub fn query_params(
    tool: &ToolDefinition,
    params: &Map<String, Value>,
) -> Result<Vec<(String, String)>, GatewayError> {
    let mut pairs = Vec::with_capacity(params.len());
    for (name, value) in params {
        if !tool.accepts_param(name) {
            return Err(GatewayError::InvalidParams(format!(
                "tool '{}' has no parameter '{}'",
                tool.id, name
            )));
        }
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(GatewayError::InvalidParams(format!(
                    "parameter '{}' must be a string, number or boolean",
                    name
                )))
            }
        };
        pairs.push((name.clone(), value));
    }
    Ok(pairs)
}

/// Upstream URL for a tool: the base URL's path (if any) followed by the tool path.
pub fn upstream_url(base: &Url, tool: &ToolDefinition) -> Url {
    let mut url = base.clone();
    let path = format!("{}{}", base.path().trim_end_matches('/'), tool.path);
    url.set_path(&path);
    url
}

/// Call the upstream endpoint for `tool` as `identity` and relay its answer.
///
/// Any upstream status is passed through; only transport failures become a
/// 502 naming the endpoint.
pub async fn forward(
    client: &reqwest::Client,
    base: &Url,
    tool: &ToolDefinition,
    params: &[(String, String)],
    identity: Option<&str>,
) -> Result<HttpResponse, GatewayError> {
    let upstream_error = |message: String| GatewayError::Upstream {
        endpoint: tool.path.to_string(),
        message,
    };

    let mut request = client.get(upstream_url(base, tool)).query(params);
    if let Some(key) = identity {
        request = request.bearer_auth(key);
    }

    let started = Instant::now();
    let result = request.send().await;
    PROXY_LATENCY.observe(started.elapsed().as_secs_f64());

    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            PROXY_REQUESTS_TOTAL
                .with_label_values(&[tool.id, "transport_error"])
                .inc();
            return Err(upstream_error(e.to_string()));
        }
    };

    let status = response.status();
    let headers = response.headers().clone();
    PROXY_REQUESTS_TOTAL
        .with_label_values(&[tool.id, status.as_str()])
        .inc();

    if let Some(cl) = response.content_length() {
        if cl > MAX_RESPONSE_BODY_SIZE as u64 {
            return Err(upstream_error(format!(
                "response too large: {} bytes (max {})",
                cl, MAX_RESPONSE_BODY_SIZE
            )));
        }
    }

    let mut body = Vec::with_capacity(
        response
            .content_length()
            .map(|cl| cl as usize)
            .unwrap_or(8192)
            .min(MAX_RESPONSE_BODY_SIZE),
    );
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| upstream_error(format!("failed to read response: {e}")))?
    {
        if body.len() + chunk.len() > MAX_RESPONSE_BODY_SIZE {
            return Err(upstream_error(format!(
                "response too large (max {} bytes)",
                MAX_RESPONSE_BODY_SIZE
            )));
        }
        body.extend_from_slice(&chunk);
    }

    if !status.is_success() {
        tracing::warn!(tool = %tool.id, status = %status, "upstream returned an error status");
    }

    let mut builder = HttpResponse::build(
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
    );
    for (name, value) in headers.iter() {
        if ALLOWED_RESPONSE_HEADERS.contains(&name.as_str()) {
            if let Ok(value) = value.to_str() {
                builder.insert_header((name.as_str(), value));
            }
        }
    }
    Ok(builder.body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_query_params_drop_nulls_and_stringify() {
        let tool = catalog::find("quotes_latest").unwrap();
        let params = object(json!({ "symbol": "BTC,ETH", "id": 1, "skip_invalid": true, "aux": null }));
        let mut pairs = query_params(tool, &params).unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("id".to_string(), "1".to_string()),
                ("skip_invalid".to_string(), "true".to_string()),
                ("symbol".to_string(), "BTC,ETH".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_param_is_refused() {
        let tool = catalog::find("key_info").unwrap();
        let err = query_params(tool, &object(json!({ "api_key": "x" }))).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));
    }

    #[test]
    fn test_nested_value_is_refused() {
        let tool = catalog::find("quotes_latest").unwrap();
        let err = query_params(tool, &object(json!({ "symbol": ["BTC"] }))).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));
    }

    #[test]
    fn test_upstream_url_keeps_base_prefix() {
        let tool = catalog::find("quotes_latest").unwrap();

        let base = Url::parse("https://pro-api.coinmarketcap.com").unwrap();
        assert_eq!(
            upstream_url(&base, tool).as_str(),
            "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest"
        );

        let base = Url::parse("http://127.0.0.1:9000/cmc/").unwrap();
        assert_eq!(
            upstream_url(&base, tool).as_str(),
            "http://127.0.0.1:9000/cmc/v1/cryptocurrency/quotes/latest"
        );
    }
}
