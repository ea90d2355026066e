//! Generated protobuf/gRPC types for the cryptex service.

// Include the generated proto code
tonic::include_proto!("cryptex");
