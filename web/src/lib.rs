//! HTTP surface of the SSE gateway.
//!
//! Exposes the streaming endpoints that register client sessions and a health
//! check. Everything behind the handlers lives in the `sse` crate.

use axum::http::{HeaderValue, Method};
use log::*;
use service::{config::Config, AppState};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub mod error;
pub mod router;

mod controller;
mod extractors;
mod sse;

/// Binds the listener for the configured interface and port.
pub async fn bind(config: &Config) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind((config.interface(), config.port)).await?;
    info!("Server starting... listening for connections on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// Serves the gateway on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cors_layer = cors_layer(&app_state.config);
    let router = router::define_routes(app_state).layer(cors_layer);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_credentials(true)
        .allow_origin(origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::sse::message::OutboundEvent;
    use ::sse::{ClientIdentity, Manager};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use clap::Parser;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<Manager>) {
        let config = Config::try_parse_from(["sse_gateway", "--identity-header", "x-client-identity"])
            .unwrap();
        let manager = Arc::new(Manager::new());
        let app_state = AppState::new(config, &manager);
        (router::define_routes(app_state), manager)
    }

    async fn next_frame(body: &mut Body) -> String {
        let frame = body.frame().await.unwrap().unwrap();
        String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap()
    }

    async fn wait_until_unregistered(manager: &Manager, identity: &ClientIdentity) {
        for _ in 0..100 {
            if manager.registry().lookup(identity).is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{identity} was never unregistered");
    }

    #[tokio::test]
    async fn path_subscription_streams_events_as_sse() {
        let (app, manager) = test_app();
        let request = Request::builder()
            .uri("/subscribe/u1/client/c1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::CONNECTION], "keep-alive");

        manager.send_message(
            &ClientIdentity::new("u1", "c1"),
            &OutboundEvent::new(200, "hello"),
        );

        let mut body = response.into_body();
        assert_eq!(
            next_frame(&mut body).await,
            "data: {\"code\":200,\"message\":\"hello\"}\n\n"
        );
    }

    #[tokio::test]
    async fn claim_subscription_registers_header_identity() {
        let (app, manager) = test_app();
        let request = Request::builder()
            .uri("/subscribe")
            .header("x-client-identity", r#"{"userid":"u1","clientid":"c1"}"#)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(manager
            .registry()
            .lookup(&ClientIdentity::new("u1", "c1"))
            .is_some());
    }

    #[tokio::test]
    async fn missing_identity_claim_is_bad_request() {
        let (app, manager) = test_app();
        let request = Request::builder()
            .uri("/subscribe")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn malformed_identity_claim_is_bad_request() {
        let (app, _manager) = test_app();
        let request = Request::builder()
            .uri("/subscribe")
            .header("x-client-identity", r#"{"userid":"u1"}"#)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_identity_claim_is_bad_request() {
        let (app, _manager) = test_app();
        let request = Request::builder()
            .uri("/subscribe")
            .header("x-client-identity", r#"{"userid":"u1","clientid":" "}"#)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dropping_the_stream_unregisters_the_client() {
        let (app, manager) = test_app();
        let identity = ClientIdentity::new("u1", "c1");
        let request = Request::builder()
            .uri("/subscribe/u1/client/c1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(manager.registry().lookup(&identity).is_some());

        drop(response);

        wait_until_unregistered(&manager, &identity).await;
    }

    #[tokio::test]
    async fn health_reports_open_connections() {
        let (app, _manager) = test_app();
        let _stream = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/subscribe/u1/client/c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"healthy (1 connections, 0 replaced)");
    }
}
