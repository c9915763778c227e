use axum::response::Json;
use serde_json::{Value, json};

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "online" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_check_reports_online() {
        let Json(body) = health_check().await;
        assert_eq!(body, json!({ "status": "online" }));
    }
}
