use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{BoxError, Json, Router};
use lazy_static::lazy_static;
use serde_json::json;
use tower::buffer::BufferLayer;
use tower::limit::RateLimitLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::client::Client;
use crate::config::AppConfig;
use crate::handlers::{get_circulating_supply, get_total_supply};
use crate::state::CommonState;

lazy_static! {
    static ref HTTP_TIMEOUT: u64 = 60;
    static ref REQ_PER_SEC: u64 = u64::MAX;
}

pub struct ApplicationServer;

impl ApplicationServer {
    pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
        let client = Client::new(
            reqwest::Client::new(),
            config.hiro_api_url.clone(),
            config.scale_by_decimals,
        );
        let state = CommonState::new(client);
        let router = Self::router(state);

        let port = config.port;
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        tracing::info!("🚀 Server has launched on http://{addr}");

        let listener = tokio::net::TcpListener::bind(&addr).await?;

        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .unwrap_or_else(|e| panic!("Server error: {}", e));

        Ok(())
    }

    fn router(state: CommonState) -> Router {
        let routes = Router::new()
            .route("/total-supply", get(get_total_supply))
            .route("/circulating-supply", get(get_circulating_supply))
            .with_state(state);

        let cors = CorsLayer::new()
            .allow_origin("*".parse::<HeaderValue>().unwrap())
            .allow_methods(Any)
            .allow_headers(Any);

        let router = routes
            .merge(Router::new().route(
                "/health",
                get(|| async { json!({"version": env!("CARGO_PKG_VERSION")}).to_string() }),
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(HandleErrorLayer::new(Self::handle_timeout_error))
                    .timeout(Duration::from_secs(*HTTP_TIMEOUT))
                    .layer(cors)
                    .layer(BufferLayer::new(4096))
                    .layer(RateLimitLayer::new(
                        *REQ_PER_SEC,
                        Duration::from_secs(1),
                    )),
            );

        router.fallback(Self::handle_404)
    }

    /// Adds a custom handler for tower's `TimeoutLayer`, see https://docs.rs/axum/latest/axum/middleware/index.html#commonly-used-middleware.
    async fn handle_timeout_error(err: BoxError) -> (StatusCode, Json<serde_json::Value>) {
        if err.is::<tower::timeout::error::Elapsed>() {
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(json!({
                    "error":
                        format!(
                            "request took longer than the configured {} second timeout",
                            *HTTP_TIMEOUT
                        )
                })),
            )
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": format!("unhandled internal error: {}", err)
                })),
            )
        }
    }

    /// Tokio signal handler that will wait for a user to press CTRL+C.
    /// We use this in our hyper `Server` method `with_graceful_shutdown`.
    async fn shutdown_signal() {
        tokio::signal::ctrl_c()
            .await
            .expect("expect tokio signal ctrl-c");
        tracing::warn!("signal shutdown");
    }

    async fn handle_404() -> impl IntoResponse {
        (
            StatusCode::NOT_FOUND,
            axum::response::Json(serde_json::json!({
                    "errors":{
                    "message": vec!(String::from("The requested resource does not exist on this server!")),}
                }
            )),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::CONTRACT_ADDRESS;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .expect("serve");
        });
        format!("http://{addr}")
    }

    async fn spawn_app(upstream: Router, scale_by_decimals: bool) -> String {
        let upstream_url = spawn(upstream).await;
        let client = Client::new(reqwest::Client::new(), upstream_url, scale_by_decimals);
        spawn(ApplicationServer::router(CommonState::new(client))).await
    }

    fn healthy_upstream() -> Router {
        let metadata = json!({ "decimals": 8, "total_supply": "100000000000000" });
        let balances = json!({
            "fungible_tokens": {
                (format!("{CONTRACT_ADDRESS}::welshcorgicoin")): { "total_sent": "50000000000000" }
            }
        });
        Router::new()
            .route(
                "/metadata/v1/ft/:contract",
                get(move || async move { Json(metadata) }),
            )
            .route(
                "/extended/v1/address/:address/balances",
                get(move || async move { Json(balances) }),
            )
    }

    async fn get_body(url: String) -> (StatusCode, String) {
        let res = reqwest::get(url).await.expect("request");
        let status = StatusCode::from_u16(res.status().as_u16()).expect("status");
        (status, res.text().await.expect("body"))
    }

    #[tokio::test]
    async fn total_supply_endpoint_returns_scaled_number() {
        let app = spawn_app(healthy_upstream(), true).await;

        let (status, body) = get_body(format!("{app}/total-supply")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1000000");
    }

    #[tokio::test]
    async fn circulating_supply_endpoint_returns_scaled_number() {
        let app = spawn_app(healthy_upstream(), true).await;

        let (status, body) = get_body(format!("{app}/circulating-supply")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "500000");
    }

    #[tokio::test]
    async fn missing_token_key_maps_to_fixed_500_body() {
        let metadata = json!({ "decimals": 8, "total_supply": "100000000000000" });
        let upstream = Router::new()
            .route(
                "/metadata/v1/ft/:contract",
                get(move || async move { Json(metadata) }),
            )
            .route(
                "/extended/v1/address/:address/balances",
                get(|| async { Json(json!({ "fungible_tokens": {} })) }),
            );
        let app = spawn_app(upstream, true).await;

        let (status, body) = get_body(format!("{app}/circulating-supply")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"Error fetching circulating supply"}"#);
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_fixed_500_body() {
        let upstream = Router::new().route(
            "/metadata/v1/ft/:contract",
            get(|| async { (StatusCode::NOT_FOUND, "no such contract") }),
        );
        let app = spawn_app(upstream, true).await;

        let (status, body) = get_body(format!("{app}/total-supply")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"Error fetching total supply"}"#);
    }

    #[tokio::test]
    async fn server_keeps_serving_after_a_failed_request() {
        let upstream = Router::new()
            .route(
                "/metadata/v1/ft/:contract",
                get(|| async {
                    Json(json!({ "decimals": 6, "total_supply": "123000000" }))
                }),
            )
            .route(
                "/extended/v1/address/:address/balances",
                get(|| async { Json(json!({ "fungible_tokens": {} })) }),
            );
        let app = spawn_app(upstream, true).await;

        let (status, _) = get_body(format!("{app}/circulating-supply")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        // A failed request never takes the server down with it.
        let (status, body) = get_body(format!("{app}/total-supply")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "123");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = spawn_app(healthy_upstream(), true).await;

        let (status, _) = get_body(format!("{app}/supply")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unscaled_mode_reports_raw_base_units() {
        let app = spawn_app(healthy_upstream(), false).await;

        let (status, body) = get_body(format!("{app}/total-supply")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "100000000000000");
    }
}
