use lazy_static::lazy_static;
use regex::Regex;

use crate::field::{FieldError, FieldErrors, FieldPath};
use crate::resources::{GrpcRoute, GrpcRouteFilter, GrpcRouteMatch, grpc_filter_type};

use super::common::{
    FilterConfig, validate_filter_type_matches_value, validate_header_matches,
    validate_header_modifier, validate_parent_refs, validate_unique_filter_types,
};

const VALID_SERVICE_NAME: &str = r"^(?i)\.?[a-z_][a-z_0-9]*(\.[a-z_][a-z_0-9]*)*$";
const VALID_METHOD_NAME: &str = r"^[A-Za-z_][A-Za-z_0-9]*$";

lazy_static! {
    static ref VALID_SERVICE_NAME_REGEX: Regex =
        Regex::new(VALID_SERVICE_NAME).expect("gRPC service name regex must compile");
    static ref VALID_METHOD_NAME_REGEX: Regex =
        Regex::new(VALID_METHOD_NAME).expect("gRPC method name regex must compile");
}

pub fn validate_grpc_route(route: &GrpcRoute) -> FieldErrors {
    let spec = &route.spec;
    let path = FieldPath::new("spec");
    let rules = path.child("rules");
    let mut errors = Vec::new();

    for (i, rule) in spec.rules.iter().enumerate() {
        let rule_path = rules.index(i);
        errors.extend(validate_matches(&rule.matches, &rule_path.child("matches")));
        errors.extend(validate_filters(&rule.filters, &rule_path.child("filters")));
        for (j, backend) in rule.backend_refs.iter().enumerate() {
            errors.extend(validate_filters(
                &backend.filters,
                &rule_path.child("backendRefs").index(j).child("filters"),
            ));
        }
    }

    errors.extend(validate_parent_refs(&spec.parent_refs, &path));
    errors
}

fn validate_matches(matches: &[GrpcRouteMatch], path: &FieldPath) -> FieldErrors {
    let mut errors = Vec::new();
    for (i, route_match) in matches.iter().enumerate() {
        let match_path = path.index(i);
        if let Some(method) = &route_match.method {
            let method_path = match_path.child("method");
            if method.service.is_none() && method.method.is_none() {
                errors.push(FieldError::required(
                    method_path.clone(),
                    "one or both of `service` or `method` must be specified",
                ));
            }
            // regular expressions are left to the implementations
            if method.is_exact() {
                if let Some(service) = method
                    .service
                    .as_deref()
                    .filter(|s| !VALID_SERVICE_NAME_REGEX.is_match(s))
                {
                    errors.push(FieldError::invalid(
                        method_path.clone(),
                        service,
                        format!("must only contain valid characters (matching {VALID_SERVICE_NAME})"),
                    ));
                }
                if let Some(name) = method
                    .method
                    .as_deref()
                    .filter(|m| !VALID_METHOD_NAME_REGEX.is_match(m))
                {
                    errors.push(FieldError::invalid(
                        method_path,
                        name,
                        format!("must only contain valid characters (matching {VALID_METHOD_NAME})"),
                    ));
                }
            }
        }
        errors.extend(validate_header_matches(
            &route_match.headers,
            &match_path.child("headers"),
        ));
    }
    errors
}

fn validate_filters(filters: &[GrpcRouteFilter], path: &FieldPath) -> FieldErrors {
    let mut errors = Vec::new();
    for (i, filter) in filters.iter().enumerate() {
        let filter_path = path.index(i);
        if let Some(modifier) = &filter.request_header_modifier {
            errors.extend(validate_header_modifier(
                modifier,
                &filter_path.child("requestHeaderModifier"),
            ));
        }
        if let Some(modifier) = &filter.response_header_modifier {
            errors.extend(validate_header_modifier(
                modifier,
                &filter_path.child("responseHeaderModifier"),
            ));
        }
        errors.extend(validate_filter_type_matches_value(
            &filter.r#type,
            vec![
                FilterConfig::new(grpc_filter_type::EXTENSION_REF, &filter.extension_ref),
                FilterConfig::new(
                    grpc_filter_type::REQUEST_HEADER_MODIFIER,
                    &filter.request_header_modifier,
                ),
                FilterConfig::new(
                    grpc_filter_type::RESPONSE_HEADER_MODIFIER,
                    &filter.response_header_modifier,
                ),
                FilterConfig::new(grpc_filter_type::REQUEST_MIRROR, &filter.request_mirror),
            ],
            "GRPCRouteFilter",
            &filter_path,
        ));
    }

    errors.extend(validate_unique_filter_types(
        filters.iter().map(|f| f.r#type.as_str()),
        grpc_filter_type::EXTENSION_REF,
        path,
    ));
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{GrpcMethodMatch, GrpcRouteRule, HeaderMatch, HttpHeaderFilter};
    use rstest::rstest;

    fn route_with_match(route_match: GrpcRouteMatch) -> GrpcRoute {
        let mut route = GrpcRoute::default();
        route.spec.rules = vec![GrpcRouteRule {
            matches: vec![route_match],
            ..Default::default()
        }];
        route
    }

    fn method_match(
        match_type: Option<&str>,
        service: Option<&str>,
        method: Option<&str>,
    ) -> GrpcRouteMatch {
        GrpcRouteMatch {
            method: Some(GrpcMethodMatch {
                r#type: match_type.map(str::to_owned),
                service: service.map(str::to_owned),
                method: method.map(str::to_owned),
            }),
            headers: vec![],
        }
    }

    #[rstest]
    #[case::exact(None, Some("foo.bar.v1.Greeter"), Some("SayHello"), vec![])]
    #[case::leading_dot(None, Some(".foo.Greeter"), None, vec![])]
    #[case::service_only_case_insensitive(Some("Exact"), Some("FOO.Greeter"), None, vec![])]
    #[case::neither(
        None,
        None,
        None,
        vec!["spec.rules[0].matches[0].method: Required value: one or both of `service` or `method` must be specified"]
    )]
    #[case::bad_service(
        None,
        Some("foo/bar"),
        Some("SayHello"),
        vec![r#"spec.rules[0].matches[0].method: Invalid value: "foo/bar": must only contain valid characters (matching ^(?i)\.?[a-z_][a-z_0-9]*(\.[a-z_][a-z_0-9]*)*$)"#]
    )]
    #[case::bad_method(
        Some("Exact"),
        None,
        Some("Say.Hello"),
        vec![r#"spec.rules[0].matches[0].method: Invalid value: "Say.Hello": must only contain valid characters (matching ^[A-Za-z_][A-Za-z_0-9]*$)"#]
    )]
    #[case::regex_not_checked(Some("RegularExpression"), Some("foo/.*"), Some("Say.*"), vec![])]
    fn method_matches(
        #[case] match_type: Option<&str>,
        #[case] service: Option<&str>,
        #[case] method: Option<&str>,
        #[case] expected: Vec<&str>,
    ) {
        let route = route_with_match(method_match(match_type, service, method));
        let errors: Vec<String> = validate_grpc_route(&route)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(errors, expected);
    }

    #[test]
    fn duplicated_header_matches() {
        let header = |name: &str| HeaderMatch {
            name: name.to_owned(),
            value: "v".to_owned(),
            ..Default::default()
        };
        let route = route_with_match(GrpcRouteMatch {
            method: None,
            headers: vec![header("X-Version"), header("x-version")],
        });
        let errors = validate_grpc_route(&route);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.as_str(), "spec.rules[0].matches[0].headers");
    }

    #[test]
    fn filters() {
        let header_filter = GrpcRouteFilter {
            r#type: grpc_filter_type::REQUEST_HEADER_MODIFIER.to_owned(),
            request_header_modifier: Some(HttpHeaderFilter::default()),
            ..Default::default()
        };
        let missing_mirror = GrpcRouteFilter {
            r#type: grpc_filter_type::REQUEST_MIRROR.to_owned(),
            ..Default::default()
        };
        let mut route = GrpcRoute::default();
        route.spec.rules = vec![GrpcRouteRule {
            filters: vec![header_filter.clone(), header_filter, missing_mirror],
            ..Default::default()
        }];

        let errors: Vec<String> = validate_grpc_route(&route)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            errors,
            vec![
                "spec.rules[0].filters[2]: Required value: filter.RequestMirror must be specified for RequestMirror GRPCRouteFilter.Type",
                r#"spec.rules[0].filters: Invalid value: "RequestHeaderModifier": cannot be used multiple times in the same rule"#,
            ]
        );
    }
}
