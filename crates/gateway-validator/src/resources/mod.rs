//! Models of the Gateway API resources the webhook validates.
//!
//! Only the fields read by the validators are modelled, everything else in
//! the embedded object is ignored on decode. Optional fields map to `Option`
//! and lists default to empty, so that an absent field means "use the
//! default", exactly like for the CRD itself.

mod gateway;
mod gatewayclass;
mod grpcroute;
mod httproute;
mod l4route;
mod shared;

pub use gateway::*;
pub use gatewayclass::*;
pub use grpcroute::*;
pub use httproute::*;
pub use l4route::*;
pub use shared::*;

use serde::de::DeserializeOwned;

/// A resource the kind registry knows how to decode
pub trait GatewayApiResource: DeserializeOwned + Send + Sync + 'static {
    /// Value of the `kind` field of a serialized object
    const KIND: &'static str;
}
