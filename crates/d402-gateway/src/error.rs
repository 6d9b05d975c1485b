use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum GatewayError {
    /// Upstream API unreachable or its response unreadable
    Upstream { endpoint: String, message: String },
    /// Tool parameters rejected before any upstream call
    InvalidParams(String),
    /// Internal error
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Upstream { endpoint, message } => {
                write!(f, "upstream error on {}: {}", endpoint, message)
            }
            GatewayError::InvalidParams(msg) => write!(f, "invalid parameters: {}", msg),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        match self {
            GatewayError::Upstream { endpoint, message } => {
                tracing::error!(endpoint = %endpoint, "Upstream error: {}", message);
                HttpResponse::BadGateway().json(serde_json::json!({
                    "error": "upstream request failed",
                    "endpoint": endpoint,
                }))
            }
            GatewayError::InvalidParams(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "invalid_params",
                    "message": msg
                }))
            }
            GatewayError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;

    #[actix_rt::test]
    async fn test_upstream_error_hides_transport_detail() {
        let err = GatewayError::Upstream {
            endpoint: "/v1/key/info".to_string(),
            message: "connection refused (os error 111)".to_string(),
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["endpoint"], "/v1/key/info");
        assert!(!json.to_string().contains("os error"));
    }

    #[test]
    fn test_invalid_params_is_bad_request() {
        let resp = GatewayError::InvalidParams("unknown parameter 'foo'".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
