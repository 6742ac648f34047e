//! Protobuf messages for the `addsvc.Add` service, plus the generated
//! client and server modules (`add_client`, `add_server`).

/// `Sum` request: two integers.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SumRequest {
    #[prost(int64, tag = "1")]
    pub a: i64,
    #[prost(int64, tag = "2")]
    pub b: i64,
}

/// `Sum` reply. `err` is empty on success; `v` is zero when `err` is set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SumReply {
    #[prost(int64, tag = "1")]
    pub v: i64,
    #[prost(string, tag = "2")]
    pub err: ::prost::alloc::string::String,
}

/// `Concat` request: two strings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConcatRequest {
    #[prost(string, tag = "1")]
    pub a: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub b: ::prost::alloc::string::String,
}

/// `Concat` reply. `err` is empty on success; `v` is empty when `err` is set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConcatReply {
    #[prost(string, tag = "1")]
    pub v: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub err: ::prost::alloc::string::String,
}

include!(concat!(env!("OUT_DIR"), "/addsvc.Add.rs"));
