//! Resource validators.
//!
//! Every validator is a pure function of the decoded resource (or of the old
//! and new resource, for update checks) returning the ordered list of field
//! errors it found. An empty list means the resource is admitted.

mod common;
mod gateway;
mod gatewayclass;
mod grpcroute;
mod httproute;
mod l4route;

pub use gateway::{validate_gateway, validate_gateway_listener_hostnames};
pub use gatewayclass::validate_gateway_class_update;
pub use grpcroute::validate_grpc_route;
pub use httproute::{validate_http_route, validate_http_route_unique_filters};
pub use l4route::{validate_tcp_route, validate_tls_route, validate_udp_route};

/// Message of the error reported when a filter kind is repeated within a rule
pub const DUPLICATE_FILTER_MESSAGE: &str = "cannot be used multiple times in the same rule";

/// Message of the error reported for a listener hostname written as an IP
pub const HOSTNAME_IS_IP_MESSAGE: &str = "must be a DNS hostname, not an IP address";

/// Message of the error reported when an immutable field changes
pub const IMMUTABLE_FIELD_MESSAGE: &str = "cannot update an immutable field";
