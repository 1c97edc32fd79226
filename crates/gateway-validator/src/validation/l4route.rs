use crate::field::{FieldErrors, FieldPath};
use crate::resources::{L4RouteSpec, TcpRoute, TlsRoute, UdpRoute};

use super::common::{validate_backend_service_port, validate_parent_refs};

pub fn validate_tcp_route(route: &TcpRoute) -> FieldErrors {
    validate_l4_route_spec(&route.spec)
}

pub fn validate_udp_route(route: &UdpRoute) -> FieldErrors {
    validate_l4_route_spec(&route.spec)
}

pub fn validate_tls_route(route: &TlsRoute) -> FieldErrors {
    validate_l4_route_spec(&route.spec)
}

fn validate_l4_route_spec(spec: &L4RouteSpec) -> FieldErrors {
    let path = FieldPath::new("spec");
    let rules = path.child("rules");

    let mut errors: FieldErrors = spec
        .rules
        .iter()
        .enumerate()
        .flat_map(|(i, rule)| {
            let rule_path = rules.index(i);
            rule.backend_refs.iter().enumerate().filter_map(move |(j, backend)| {
                validate_backend_service_port(
                    &backend.object,
                    &rule_path.child("backendRefs").index(j),
                )
            })
        })
        .collect();
    errors.extend(validate_parent_refs(&spec.parent_refs, &path));
    errors
}
