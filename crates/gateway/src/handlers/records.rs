//! Record handlers

use axum::Json;
use autoab_common::{errors::Result, models::NewRecord};

/// Check a create payload the way the catalog will, and echo it back
/// normalised. Nothing is stored.
pub async fn validate(Json(record): Json<NewRecord>) -> Result<Json<NewRecord>> {
    let record = record.validated()?;
    tracing::debug!(disease = %record.disease, autoantibody = %record.autoantibody, "Record payload valid");
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{app, catalog, send};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};

    fn post(body: Value) -> Request<Body> {
        Request::post("/v1/records/validate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_payload_is_trimmed() {
        let payload = json!({
            "disease": " Lupus ",
            "autoantibody": "Anti-dsDNA",
            "autoantigen": "dsDNA",
            "priority": "2.5"
        });
        let (status, body) = send(app(catalog()), post(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["disease"], "Lupus");
        assert_eq!(body["priority"], 2.5);
    }

    #[tokio::test]
    async fn test_blank_required_field_is_rejected() {
        let payload = json!({ "disease": "Lupus", "autoantibody": "   ", "autoantigen": "dsDNA" });
        let (status, body) = send(app(catalog()), post(payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "autoantibody");
    }
}
