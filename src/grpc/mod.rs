//! gRPC client module

mod client;

pub use client::StreamingGatewayClient;

// Re-export protobuf types
pub mod wsgateway {
    tonic::include_proto!("wsgateway");
}
