//! HTTP surface of the gateway core.
//!
//! Routes are wired through `OpenApiRouter` so the served router and the
//! generated OpenAPI document never drift apart. Transport concerns beyond
//! a plain listener (TLS, proxy forwarding rules) belong to the reverse
//! proxy in front.

use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa::openapi::{InfoBuilder, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

pub(crate) mod handlers;
mod state;

pub use handlers::auth::MFA_VALIDATION_FAILED_MESSAGE;
pub use state::{GatewayConfig, GatewayState};

/// The generated OpenAPI document for the wired routes.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both
/// served and documented.
fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(handlers::health::health))
        .routes(routes!(handlers::auth::secondfactor::sign_start))
        .routes(routes!(handlers::auth::secondfactor::sign_finish))
        .routes(routes!(handlers::auth::session::logout))
        .routes(routes!(
            handlers::oidc::consent_get,
            handlers::oidc::consent_post
        ));

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Session and step-up authentication API".to_string());
    let mut oidc_tag = Tag::new("oidc");
    oidc_tag.description = Some("OpenID Connect consent API".to_string());
    router.get_openapi_mut().tags = Some(vec![auth_tag, oidc_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    OpenApiBuilder::new().info(info).build()
}

/// Build the serveable application router around shared gateway state.
#[must_use]
pub fn router(state: Arc<GatewayState>) -> Router {
    let (router, _openapi) = api_router().split_for_parts();
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(state)),
    )
}

/// Serve the gateway API until interrupted.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(port: u16, state: Arc<GatewayState>) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
