//! gRPC server implementation for `addsvc.Add`.

use std::future::Future;
use std::net::SocketAddr;

use addsvc_core::{ConcatRequest, SumRequest};
use tonic::{Request, Response, Status};
use tracing::info;

use super::pb;
use super::pb::add_server::{Add, AddServer};
use super::pb::{ConcatReply, SumReply};
use crate::service::classify::ClassifiedError;
use crate::service::trace_context::extract_from_metadata;
use crate::service::{EndpointSet, OperationError};

/// gRPC service that dispatches through the shared [`EndpointSet`].
#[derive(Clone, Debug)]
pub struct AddRpcService {
    endpoints: EndpointSet,
}

impl AddRpcService {
    #[must_use]
    pub fn new(endpoints: EndpointSet) -> Self {
        Self { endpoints }
    }
}

fn to_status(err: &OperationError) -> Status {
    let classified = ClassifiedError::operation(err);
    Status::new(classified.grpc_code(), classified.message)
}

#[tonic::async_trait]
impl Add for AddRpcService {
    async fn sum(&self, request: Request<pb::SumRequest>) -> Result<Response<SumReply>, Status> {
        let parent = extract_from_metadata(request.metadata());
        let req = request.into_inner();

        let reply = self
            .endpoints
            .sum(parent, SumRequest::new(req.a, req.b))
            .await
            .map_err(|e| to_status(&e))?;

        let reply = match reply {
            Ok(v) => SumReply { v, err: String::new() },
            Err(e) => SumReply {
                v: 0,
                err: ClassifiedError::business(e).message,
            },
        };
        Ok(Response::new(reply))
    }

    async fn concat(
        &self,
        request: Request<pb::ConcatRequest>,
    ) -> Result<Response<ConcatReply>, Status> {
        let parent = extract_from_metadata(request.metadata());
        let req = request.into_inner();

        let reply = self
            .endpoints
            .concat(parent, ConcatRequest::new(req.a, req.b))
            .await
            .map_err(|e| to_status(&e))?;

        let reply = match reply {
            Ok(v) => ConcatReply { v, err: String::new() },
            Err(e) => ConcatReply {
                v: String::new(),
                err: ClassifiedError::business(e).message,
            },
        };
        Ok(Response::new(reply))
    }
}

/// Serves `addsvc.Add` on `addr` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the transport fails.
pub async fn serve_grpc(
    addr: SocketAddr,
    endpoints: EndpointSet,
    shutdown: impl Future<Output = ()> + Send,
) -> anyhow::Result<()> {
    info!("Serving gRPC on {}", addr);

    tonic::transport::Server::builder()
        .add_service(AddServer::new(AddRpcService::new(endpoints)))
        .serve_with_shutdown(addr, shutdown)
        .await?;

    info!("gRPC server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use addsvc_core::BasicService;
    use tonic::Code;

    use super::*;
    use crate::service::ServerConfig;

    fn service() -> AddRpcService {
        AddRpcService::new(EndpointSet::new(
            Arc::new(BasicService::new()),
            &ServerConfig::default(),
        ))
    }

    #[tokio::test]
    async fn sum_success_and_business_error() {
        let svc = service();
        let reply = Add::sum(&svc, Request::new(pb::SumRequest { a: 5, b: 3 }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(reply, SumReply { v: 8, err: String::new() });

        let svc = service();
        let reply = Add::sum(&svc, Request::new(pb::SumRequest { a: 0, b: 0 }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(reply.v, 0);
        assert_eq!(reply.err, "can't sum two zeroes");
    }

    #[tokio::test]
    async fn rate_limit_becomes_resource_exhausted() {
        let svc = service();
        Add::sum(&svc, Request::new(pb::SumRequest { a: 1, b: 1 }))
            .await
            .unwrap();
        let status = Add::sum(&svc, Request::new(pb::SumRequest { a: 1, b: 1 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::ResourceExhausted);
        assert_eq!(status.message(), "rate limit exceeded");
    }

    #[tokio::test]
    async fn concat_over_limit_is_reported_in_reply() {
        let svc = service();
        let reply = Add::concat(
            &svc,
            Request::new(pb::ConcatRequest {
                a: "abcdef".to_string(),
                b: "ghijk".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_inner();
        assert!(reply.v.is_empty());
        assert_eq!(reply.err, "result exceeds maximum size");
    }
}
