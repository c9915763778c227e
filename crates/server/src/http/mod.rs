use axum::{Router, http::HeaderValue, routing::get};
use deployment::Deployment;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{DeploymentImpl, routes};

pub fn router(deployment: DeploymentImpl) -> Router {
    let api_prefix = deployment.config().api_prefix.clone();
    let cors = cors_layer(&deployment.config().cors_origins);

    let api_routes = Router::new()
        .merge(routes::workspaces::router(&deployment))
        .merge(routes::boards::router(&deployment))
        .merge(routes::columns::router(&deployment))
        .merge(routes::tasks::router(&deployment));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest(&api_prefix, api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

/// Allows exactly `origins`, with credentials. Methods and headers are
/// mirrored from the preflight because wildcards cannot carry credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
