use crate::{
    app::App,
    auth::{AdminSecret, require_auth},
    handler::{
        handle_analytics, handle_create_partner, handle_create_url, handle_delete_url,
        handle_health, handle_list_partners, handle_list_urls, handle_method_not_allowed,
        handle_not_found, handle_update_url,
    },
};
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, put},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Answers preflight (any `OPTIONS`) itself, so it must wrap the auth layer.
fn setup_cors(methods: &[Method]) -> CorsLayer {
    let mut allowed = methods.to_vec();
    allowed.push(Method::OPTIONS);

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(allowed)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

pub fn build_router(app: Arc<App>, secret: AdminSecret) -> Router {
    let auth = middleware::from_fn_with_state(secret, require_auth);

    let urls = Router::new()
        .route(
            "/urls_api",
            get(handle_list_urls)
                .post(handle_create_url)
                .fallback(handle_method_not_allowed),
        )
        .route(
            "/urls_api/{code}",
            put(handle_update_url)
                .delete(handle_delete_url)
                .fallback(handle_method_not_allowed),
        )
        .route_layer(auth.clone())
        .layer(setup_cors(&[
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ]));

    let partners = Router::new()
        .route(
            "/partners",
            get(handle_list_partners)
                .post(handle_create_partner)
                .fallback(handle_method_not_allowed),
        )
        // unlike the other resources, an unsupported method is only revealed after auth
        .layer(auth.clone())
        .layer(setup_cors(&[Method::GET, Method::POST]));

    let analytics = Router::new()
        .route(
            "/analytics_api/{code}",
            get(handle_analytics).fallback(handle_method_not_allowed),
        )
        .route_layer(auth)
        .layer(setup_cors(&[Method::GET]));

    Router::new()
        .merge(urls)
        .merge(partners)
        .merge(analytics)
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}
