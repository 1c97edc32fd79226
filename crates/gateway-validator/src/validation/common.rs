use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::field::{FieldError, FieldErrors, FieldPath};
use crate::resources::{BackendObjectReference, HeaderMatch, HttpHeaderFilter, ParentReference};

use super::DUPLICATE_FILTER_MESSAGE;

const MULTIPLE_HEADER_ACTIONS_MESSAGE: &str = "cannot specify multiple actions for header";
const DUPLICATE_HEADER_MATCH_MESSAGE: &str =
    "cannot match the same header multiple times in the same rule";

#[derive(PartialEq, Eq, Hash)]
struct ParentKey<'a> {
    name: &'a str,
    namespace: &'a str,
    kind: &'a str,
}

#[derive(Default, PartialEq, Eq, Hash)]
struct ParentQualifier<'a> {
    section: &'a str,
    port: i32,
}

/// When more than one parentRef targets the same parent, each one must be
/// qualified by a sectionName or a port, and the qualifiers must be unique.
/// Checking stops at the first violation.
pub(crate) fn validate_parent_refs(parent_refs: &[ParentReference], spec: &FieldPath) -> FieldErrors {
    if parent_refs.len() <= 1 {
        return Vec::new();
    }

    let mut seen: HashMap<ParentKey, HashSet<ParentQualifier>> = HashMap::new();
    for (i, parent) in parent_refs.iter().enumerate() {
        let key = ParentKey {
            name: &parent.name,
            namespace: parent.namespace.as_deref().unwrap_or_default(),
            kind: parent.kind.as_deref().unwrap_or_default(),
        };
        let qualifier = ParentQualifier {
            section: parent.section_name.as_deref().unwrap_or_default(),
            port: parent.port.unwrap_or_default(),
        };

        match seen.get_mut(&key) {
            None => {
                seen.insert(key, HashSet::from([qualifier]));
            }
            Some(qualifiers) => {
                if qualifier == ParentQualifier::default()
                    || qualifiers.contains(&ParentQualifier::default())
                {
                    return vec![FieldError::required(
                        spec.child("parentRefs"),
                        "sectionNames or ports must be specified when more than one parentRef refers to the same parent",
                    )];
                }
                if qualifiers.contains(&qualifier) {
                    let path = spec.child("parentRefs").index(i);
                    let error = if qualifier.section.is_empty() {
                        FieldError::invalid(path.child("port"), qualifier.port, PARENT_QUALIFIER_MESSAGE)
                    } else {
                        FieldError::invalid(
                            path.child("sectionName"),
                            qualifier.section,
                            PARENT_QUALIFIER_MESSAGE,
                        )
                    };
                    return vec![error];
                }
                qualifiers.insert(qualifier);
            }
        }
    }
    Vec::new()
}

const PARENT_QUALIFIER_MESSAGE: &str =
    "must be unique when ParentRefs includes 2 or more references to the same parent";

/// Service backends have no default port
pub(crate) fn validate_backend_service_port(
    backend: &BackendObjectReference,
    path: &FieldPath,
) -> Option<FieldError> {
    (backend.is_service() && backend.port.is_none())
        .then(|| FieldError::required(path.child("port"), "missing port for Service reference"))
}

/// Reports every filter type used more than once in `filter_types`, except
/// for `repeatable`. Types are reported in the order they become duplicated.
pub(crate) fn validate_unique_filter_types<'a>(
    filter_types: impl IntoIterator<Item = &'a str>,
    repeatable: &str,
    path: &FieldPath,
) -> FieldErrors {
    filter_types
        .into_iter()
        .filter(|filter_type| *filter_type != repeatable)
        .duplicates()
        .map(|filter_type| FieldError::invalid(path.clone(), filter_type, DUPLICATE_FILTER_MESSAGE))
        .collect()
}

/// The sub-configuration of a route filter that belongs to `filter_type`
pub(crate) struct FilterConfig {
    pub filter_type: &'static str,
    pub value: Option<Value>,
}

impl FilterConfig {
    pub fn new<T: Serialize>(filter_type: &'static str, config: &Option<T>) -> Self {
        FilterConfig {
            filter_type,
            value: config
                .as_ref()
                .map(|c| serde_json::to_value(c).unwrap_or_default()),
        }
    }
}

/// Only the sub-configuration named by the filter type may be populated,
/// and it must be. `kind` is the name of the filter resource used in
/// messages, e.g. `HTTPRouteFilter`.
pub(crate) fn validate_filter_type_matches_value(
    filter_type: &str,
    configs: Vec<FilterConfig>,
    kind: &str,
    path: &FieldPath,
) -> FieldErrors {
    let mut errors = Vec::new();
    for config in configs {
        match config.value {
            Some(value) if config.filter_type != filter_type => errors.push(FieldError::invalid(
                path.clone(),
                value,
                format!("must be nil if the {kind}.Type is not {}", config.filter_type),
            )),
            None if config.filter_type == filter_type => errors.push(FieldError::required(
                path.clone(),
                format!(
                    "filter.{0} must be specified for {0} {kind}.Type",
                    config.filter_type
                ),
            )),
            _ => {}
        }
    }
    errors
}

/// A header may be the target of a single action (add, set or remove),
/// compared case-insensitively. Only the second action on a header is
/// reported.
pub(crate) fn validate_header_modifier(filter: &HttpHeaderFilter, path: &FieldPath) -> FieldErrors {
    let mut errors = Vec::new();
    let mut actions: HashMap<String, bool> = HashMap::new();
    let mut check = |name: &str, path: FieldPath, value: Value| {
        match actions.get_mut(&name.to_lowercase()) {
            Some(needs_error) => {
                if *needs_error {
                    errors.push(FieldError::invalid(path, value, MULTIPLE_HEADER_ACTIONS_MESSAGE));
                }
                *needs_error = false;
            }
            None => {
                actions.insert(name.to_lowercase(), true);
            }
        }
    };

    for header in &filter.add {
        check(&header.name, path.child("add"), to_value(header));
    }
    for header in &filter.set {
        check(&header.name, path.child("set"), to_value(header));
    }
    for name in &filter.remove {
        check(name, path.child("remove"), Value::from(name.as_str()));
    }
    errors
}

fn to_value(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// A header name may be matched only once per match, compared
/// case-insensitively
pub(crate) fn validate_header_matches(matches: &[HeaderMatch], path: &FieldPath) -> FieldErrors {
    matches
        .iter()
        .map(|m| m.name.to_lowercase())
        .duplicates()
        .map(|name| {
            FieldError::invalid(
                path.clone(),
                canonical_header_key(&name),
                DUPLICATE_HEADER_MATCH_MESSAGE,
            )
        })
        .collect()
}

/// Canonical MIME form of a header name: the first letter and every letter
/// following a hyphen are upper case, the rest lower case. Names holding
/// characters not allowed in a header name are returned unchanged.
pub(crate) fn canonical_header_key(name: &str) -> String {
    let is_token = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);
    if name.is_empty() || !name.chars().all(is_token) {
        return name.to_owned();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let c = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            c
        })
        .collect()
}
