use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use crate::field::{FieldError, FieldErrors, FieldPath};
use crate::resources::{
    HttpPathMatch, HttpPathModifier, HttpQueryParamMatch, HttpRoute, HttpRouteFilter,
    HttpRouteMatch, filter_type, path_match_type, path_modifier_type,
};

use super::common::{
    FilterConfig, validate_backend_service_port, validate_filter_type_matches_value,
    validate_header_matches, validate_header_modifier, validate_parent_refs,
    validate_unique_filter_types,
};

/// Sequences a path match must not contain, mostly directory traversals
const INVALID_PATH_SEQUENCES: &[&str] = &["//", "/./", "/../", "%2f", "%2F", "#"];
const INVALID_PATH_SUFFIXES: &[&str] = &["/..", "/."];

/// Characters allowed in a path by RFC 3986
const VALID_PATH_CHARACTERS: &str = r"^(?:[A-Za-z0-9\/\-._~!$&'()*+,;=:@]|[%][0-9a-fA-F]{2})+$";

lazy_static! {
    static ref VALID_PATH_CHARACTERS_REGEX: Regex =
        Regex::new(VALID_PATH_CHARACTERS).expect("path characters regex must compile");
}

fn rules_path() -> FieldPath {
    FieldPath::new("spec").child("rules")
}

/// Every filter type except `ExtensionRef` may appear at most once in the
/// filters of a rule. One error is reported per repeated type, rules are
/// checked independently.
pub fn validate_http_route_unique_filters(route: &HttpRoute) -> FieldErrors {
    let rules = rules_path();
    route
        .spec
        .rules
        .iter()
        .enumerate()
        .flat_map(|(i, rule)| {
            validate_unique_filter_types(
                rule.filters.iter().map(|f| f.r#type.as_str()),
                filter_type::EXTENSION_REF,
                &rules.index(i).child("filters"),
            )
        })
        .collect()
}

/// Runs every HTTPRoute check: filters of rules and of backends, matches,
/// service backend ports and parent references.
pub fn validate_http_route(route: &HttpRoute) -> FieldErrors {
    let spec = &route.spec;
    let rules = rules_path();
    let mut errors = Vec::new();

    for (i, rule) in spec.rules.iter().enumerate() {
        let rule_path = rules.index(i);
        errors.extend(validate_filters(
            &rule.filters,
            &rule.matches,
            &rule_path.child("filters"),
        ));
        for (j, backend) in rule.backend_refs.iter().enumerate() {
            errors.extend(validate_filters(
                &backend.filters,
                &rule.matches,
                &rule_path.child("backendRefs").index(j).child("filters"),
            ));
        }
        for (j, route_match) in rule.matches.iter().enumerate() {
            errors.extend(validate_match(
                route_match,
                &rule_path.child("matches").index(j),
            ));
        }
    }

    for (i, rule) in spec.rules.iter().enumerate() {
        let backends_path = rules.index(i).child("backendRefs");
        errors.extend(rule.backend_refs.iter().enumerate().filter_map(|(j, backend)| {
            validate_backend_service_port(&backend.backend.object, &backends_path.index(j))
        }));
    }

    errors.extend(validate_parent_refs(&spec.parent_refs, &FieldPath::new("spec")));
    errors
}

fn validate_filters(
    filters: &[HttpRouteFilter],
    matches: &[HttpRouteMatch],
    path: &FieldPath,
) -> FieldErrors {
    let mut errors = Vec::new();

    for (i, filter) in filters.iter().enumerate() {
        let filter_path = path.index(i);
        if let Some(modifier) = filter.request_redirect.as_ref().and_then(|r| r.path.as_ref()) {
            errors.extend(validate_path_modifier(
                modifier,
                matches,
                &filter_path.child("requestRedirect").child("path"),
            ));
        }
        if let Some(modifier) = filter.url_rewrite.as_ref().and_then(|r| r.path.as_ref()) {
            errors.extend(validate_path_modifier(
                modifier,
                matches,
                &filter_path.child("urlRewrite").child("path"),
            ));
        }
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
                FilterConfig::new(filter_type::EXTENSION_REF, &filter.extension_ref),
                FilterConfig::new(
                    filter_type::REQUEST_HEADER_MODIFIER,
                    &filter.request_header_modifier,
                ),
                FilterConfig::new(
                    filter_type::RESPONSE_HEADER_MODIFIER,
                    &filter.response_header_modifier,
                ),
                FilterConfig::new(filter_type::REQUEST_MIRROR, &filter.request_mirror),
                FilterConfig::new(filter_type::REQUEST_REDIRECT, &filter.request_redirect),
                FilterConfig::new(filter_type::URL_REWRITE, &filter.url_rewrite),
            ],
            "HTTPRouteFilter",
            &filter_path,
        ));
    }

    let has_type = |wanted: &str| filters.iter().any(|f| f.r#type == wanted);
    if has_type(filter_type::REQUEST_REDIRECT) && has_type(filter_type::URL_REWRITE) {
        errors.push(FieldError::invalid(
            path.clone(),
            filter_type::REQUEST_REDIRECT,
            "may specify either httpRouteFilterRequestRedirect or httpRouteFilterRequestRewrite, but not both",
        ));
    }

    errors.extend(validate_unique_filter_types(
        filters.iter().map(|f| f.r#type.as_str()),
        filter_type::EXTENSION_REF,
        path,
    ));
    errors
}

fn validate_path_modifier(
    modifier: &HttpPathModifier,
    matches: &[HttpRouteMatch],
    path: &FieldPath,
) -> FieldErrors {
    let mut errors = Vec::new();
    let checks = [
        (
            path_modifier_type::REPLACE_FULL_PATH,
            &modifier.replace_full_path,
        ),
        (
            path_modifier_type::REPLACE_PREFIX_MATCH,
            &modifier.replace_prefix_match,
        ),
    ];
    for (modifier_type, value) in checks {
        if value.is_some() && modifier.r#type != modifier_type {
            errors.push(FieldError::invalid(
                path.clone(),
                value,
                format!("must be nil if the HTTPRouteFilter.Type is not {modifier_type}"),
            ));
        }
        if value.is_none() && modifier.r#type == modifier_type {
            errors.push(FieldError::invalid(
                path.clone(),
                value,
                format!("must not be nil if the HTTPRouteFilter.Type is {modifier_type}"),
            ));
        }
    }

    if modifier.r#type == path_modifier_type::REPLACE_PREFIX_MATCH
        && modifier.replace_prefix_match.is_some()
        && !has_exactly_one_prefix_match(matches)
    {
        errors.push(FieldError::invalid(
            path.clone(),
            &modifier.replace_prefix_match,
            "exactly one PathPrefix match must be specified to use this path modifier",
        ));
    }
    errors
}

fn has_exactly_one_prefix_match(matches: &[HttpRouteMatch]) -> bool {
    match matches {
        [only] => only
            .path
            .as_ref()
            .and_then(|p| p.r#type.as_deref())
            .is_some_and(|t| t == path_match_type::PATH_PREFIX),
        _ => false,
    }
}

fn validate_match(route_match: &HttpRouteMatch, path: &FieldPath) -> FieldErrors {
    let mut errors = Vec::new();
    if let Some(path_match) = &route_match.path {
        errors.extend(validate_path_match(path_match, &path.child("path")));
    }
    if !route_match.headers.is_empty() {
        errors.extend(validate_header_matches(
            &route_match.headers,
            &path.child("headers"),
        ));
    }
    if !route_match.query_params.is_empty() {
        errors.extend(validate_query_param_matches(
            &route_match.query_params,
            &path.child("queryParams"),
        ));
    }
    errors
}

fn validate_path_match(path_match: &HttpPathMatch, path: &FieldPath) -> FieldErrors {
    let Some(match_type) = path_match.r#type.as_deref() else {
        return vec![FieldError::required(path.child("type"), "must be specified")];
    };
    let Some(value) = path_match.value.as_deref() else {
        return vec![FieldError::required(path.child("value"), "must be specified")];
    };

    let mut errors = Vec::new();
    match match_type {
        path_match_type::EXACT | path_match_type::PATH_PREFIX => {
            let value_path = path.child("value");
            if !value.starts_with('/') {
                errors.push(FieldError::invalid(
                    value_path.clone(),
                    value,
                    "must be an absolute path",
                ));
            }
            for sequence in INVALID_PATH_SEQUENCES {
                if value.contains(sequence) {
                    errors.push(FieldError::invalid(
                        value_path.clone(),
                        value,
                        format!("must not contain {sequence:?}"),
                    ));
                }
            }
            for suffix in INVALID_PATH_SUFFIXES {
                if value.ends_with(suffix) {
                    errors.push(FieldError::invalid(
                        value_path.clone(),
                        value,
                        format!("cannot end with '{suffix}'"),
                    ));
                }
            }
            if !VALID_PATH_CHARACTERS_REGEX.is_match(value) {
                errors.push(FieldError::invalid(
                    value_path,
                    value,
                    format!("must only contain valid characters (matching {VALID_PATH_CHARACTERS})"),
                ));
            }
        }
        path_match_type::REGULAR_EXPRESSION => {}
        unsupported => errors.push(FieldError::not_supported(
            path.child("type"),
            unsupported,
            &[
                path_match_type::EXACT,
                path_match_type::PATH_PREFIX,
                path_match_type::REGULAR_EXPRESSION,
            ],
        )),
    }
    errors
}

/// Query parameter names are case-sensitive, unlike header names
fn validate_query_param_matches(matches: &[HttpQueryParamMatch], path: &FieldPath) -> FieldErrors {
    matches
        .iter()
        .map(|m| m.name.as_str())
        .duplicates()
        .map(|name| {
            FieldError::invalid(
                path.clone(),
                name,
                "cannot match the same query parameter multiple times in the same rule",
            )
        })
        .collect()
}
