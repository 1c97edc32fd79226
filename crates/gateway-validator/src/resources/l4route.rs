//! TCPRoute, UDPRoute and TLSRoute. The three kinds share the same rule
//! layout as far as validation is concerned.

use serde::{Deserialize, Serialize};

use super::{BackendRef, GatewayApiResource, ObjectMeta, ParentReference};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct L4RouteSpec {
    pub parent_refs: Vec<ParentReference>,
    /// Only meaningful for TLSRoute.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hostnames: Vec<String>,
    pub rules: Vec<L4RouteRule>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct L4RouteRule {
    pub backend_refs: Vec<BackendRef>,
}

macro_rules! l4_route {
    ($name:ident, $kind:literal) => {
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            pub metadata: ObjectMeta,
            pub spec: L4RouteSpec,
        }

        impl GatewayApiResource for $name {
            const KIND: &'static str = $kind;
        }
    };
}

l4_route!(TcpRoute, "TCPRoute");
l4_route!(UdpRoute, "UDPRoute");
l4_route!(TlsRoute, "TLSRoute");
