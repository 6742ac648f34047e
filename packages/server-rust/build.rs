//! Generates the `addsvc.Add` gRPC client and server from the hand-written
//! prost messages in `src/rpc/pb.rs`. No `.proto` file or `protoc` is needed.

use tonic_build::manual::{Builder, Method, Service};

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(input)
        .output_type(output)
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    let add = Service::builder()
        .name("Add")
        .package("addsvc")
        .method(unary(
            "sum",
            "Sum",
            "crate::rpc::pb::SumRequest",
            "crate::rpc::pb::SumReply",
        ))
        .method(unary(
            "concat",
            "Concat",
            "crate::rpc::pb::ConcatRequest",
            "crate::rpc::pb::ConcatReply",
        ))
        .build();

    Builder::new().compile(&[add]);

    println!("cargo:rerun-if-changed=build.rs");
}
