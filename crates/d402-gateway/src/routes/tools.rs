use actix_web::middleware::from_fn;
use actix_web::{web, HttpResponse};
use d402::AcceptedPayment;
use serde_json::{Map, Value};

use crate::catalog::{self, TOOLS};
use crate::error::GatewayError;
use crate::middleware::{admission_gate, ResolvedIdentity};
use crate::proxy;
use crate::state::AppState;

/// GET /tools - List the catalogue with what each call costs
pub async fn list_tools(state: web::Data<AppState>) -> HttpResponse {
    let registry = state.admission.registry();
    let tools: Vec<_> = TOOLS
        .iter()
        .filter_map(|tool| {
            let price = registry.get(tool.id)?;
            Some(serde_json::json!({
                "id": tool.id,
                "description": tool.description,
                "params": tool.params,
                "price": AcceptedPayment::from(price),
            }))
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({ "tools": tools }))
}

fn parse_params(body: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(GatewayError::InvalidParams(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(GatewayError::InvalidParams(format!("invalid JSON body: {e}"))),
    }
}

/// POST /tools/{tool_id} - Call a tool. Only reachable through [`admission_gate`].
pub async fn call_tool(
    path: web::Path<String>,
    identity: web::ReqData<ResolvedIdentity>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let tool_id = path.into_inner();
    let tool = catalog::find(&tool_id).ok_or_else(|| {
        GatewayError::Internal(format!("tool '{tool_id}' is priced but has no upstream route"))
    })?;

    let params = proxy::query_params(tool, &parse_params(&body)?)?;
    let identity = identity.into_inner();

    tracing::debug!(tool = %tool.id, mode = identity.mode.as_str(), params = params.len(), "forwarding tool call");

    proxy::forward(
        &state.http_client,
        &state.config.upstream_base_url,
        tool,
        &params,
        identity.credential.as_deref(),
    )
    .await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/tools", web::get().to(list_tools)).service(
        web::scope("/tools/{tool_id}")
            .wrap(from_fn(admission_gate))
            .route("", web::post().to(call_tool)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_means_no_params() {
        assert!(parse_params(b"").unwrap().is_empty());
        assert!(parse_params(b"  \n").unwrap().is_empty());
        assert!(parse_params(b"null").unwrap().is_empty());
    }

    #[test]
    fn test_body_must_be_an_object() {
        assert!(matches!(
            parse_params(b"[1, 2]"),
            Err(GatewayError::InvalidParams(_))
        ));
        assert!(matches!(
            parse_params(b"{not json"),
            Err(GatewayError::InvalidParams(_))
        ));
        let map = parse_params(br#"{"symbol":"BTC"}"#).unwrap();
        assert_eq!(map["symbol"], "BTC");
    }
}
