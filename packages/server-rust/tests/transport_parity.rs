//! HTTP and gRPC share one `EndpointSet` and classify errors identically.

use std::sync::Arc;

use addsvc_core::BasicService;
use addsvc_server::network::{NetworkConfig, NetworkModule};
use addsvc_server::rpc::pb::add_server::Add;
use addsvc_server::rpc::{pb, AddRpcService};
use addsvc_server::service::middleware::build_endpoint;
use addsvc_server::service::{
    operation_names, BreakerConfig, EndpointConfig, EndpointSet, ErrorKind, Operation,
    OperationError, OperationResponse, RateLimitConfig, ServerConfig, Telemetry,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tonic::Code;
use tower::{service_fn, ServiceExt};

fn shared() -> (axum::Router, AddRpcService) {
    let endpoints = EndpointSet::new(Arc::new(BasicService::new()), &ServerConfig::default());
    let router = NetworkModule::new(NetworkConfig::default(), endpoints.clone()).build_router();
    (router, AddRpcService::new(endpoints))
}

/// Both transports over endpoints whose backend always fails internally.
fn shared_failing() -> (axum::Router, AddRpcService) {
    let config = EndpointConfig {
        rate_limit: RateLimitConfig::new(1000, 1000),
        breaker: BreakerConfig {
            failure_threshold: 2,
            ..BreakerConfig::default()
        },
    };
    let failing = service_fn(|_op: Operation| async {
        Err::<OperationResponse, _>(OperationError::Internal(anyhow::anyhow!(
            "connection refused by 10.0.0.7"
        )))
    });
    let endpoints = EndpointSet::from_endpoints(
        build_endpoint(operation_names::SUM, failing, &config, &Telemetry::disabled()),
        build_endpoint(operation_names::CONCAT, failing, &config, &Telemetry::disabled()),
        5000,
    );
    let router = NetworkModule::new(NetworkConfig::default(), endpoints.clone()).build_router();
    (router, AddRpcService::new(endpoints))
}

async fn http_sum_body(router: &axum::Router, a: i64, b: i64) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/sum")
        .body(Body::from(format!(r#"{{"A":{a},"B":{b}}}"#)))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn http_sum(router: &axum::Router, a: i64, b: i64) -> StatusCode {
    http_sum_body(router, a, b).await.0
}

#[tokio::test]
async fn transports_share_rate_limit() {
    let (router, rpc) = shared();

    // The single sum token is spent over HTTP.
    assert_eq!(http_sum(&router, 1, 2).await, StatusCode::OK);

    // ...so the RPC call is rejected with the matching class.
    let status = rpc
        .sum(tonic::Request::new(pb::SumRequest { a: 1, b: 2 }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), ErrorKind::RateLimited.grpc_code());
    assert_eq!(status.code(), Code::ResourceExhausted);
    assert_eq!(http_sum(&router, 1, 2).await, ErrorKind::RateLimited.http_status());
}

#[tokio::test]
async fn business_errors_match_across_transports() {
    let (router, rpc) = shared();

    let reply = rpc
        .concat(tonic::Request::new(pb::ConcatRequest {
            a: "0123456789".to_string(),
            b: "x".to_string(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(reply.err, "result exceeds maximum size");
    assert!(reply.v.is_empty());

    let req = Request::builder()
        .method("POST")
        .uri("/concat")
        .body(Body::from(r#"{"A":"0123456789","B":"x"}"#))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), ErrorKind::MaxSizeExceeded.http_status());
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], reply.err);
}

#[tokio::test]
async fn internal_and_circuit_open_match_across_transports() {
    let (router, rpc) = shared_failing();

    // Two internal failures, one per transport, open the shared breaker.
    let (status, body) = http_sum_body(&router, 1, 2).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(status, ErrorKind::Internal.http_status());
    assert_eq!(body["error"], "internal error");

    let rpc_status = rpc
        .sum(tonic::Request::new(pb::SumRequest { a: 1, b: 2 }))
        .await
        .unwrap_err();
    assert_eq!(rpc_status.code(), Code::Internal);
    assert_eq!(rpc_status.code(), ErrorKind::Internal.grpc_code());
    assert_eq!(rpc_status.message(), body["error"]);

    let (status, body) = http_sum_body(&router, 1, 2).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status, ErrorKind::CircuitOpen.http_status());
    assert_eq!(body["error"], "circuit breaker is open");

    let rpc_status = rpc
        .sum(tonic::Request::new(pb::SumRequest { a: 1, b: 2 }))
        .await
        .unwrap_err();
    assert_eq!(rpc_status.code(), Code::Unavailable);
    assert_eq!(rpc_status.code(), ErrorKind::CircuitOpen.grpc_code());
    assert_eq!(rpc_status.message(), body["error"]);

    // Concat has its own breaker, still closed.
    let rpc_status = rpc
        .concat(tonic::Request::new(pb::ConcatRequest {
            a: "a".to_string(),
            b: "b".to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(rpc_status.code(), Code::Internal);
}
