//! RPC adapter: the `addsvc.Add` gRPC service over the shared endpoints.

pub mod pb;
pub mod server;

pub use server::{serve_grpc, AddRpcService};
