use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::dns;
use crate::field::{FieldError, FieldErrors, FieldPath};
use crate::resources::{Gateway, GatewayAddress, Listener, TlsMode, address_type, protocol};

use super::HOSTNAME_IS_IP_MESSAGE;

const VALID_HOSTNAME_ADDRESS: &str =
    r"^(\*\.)?[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";

lazy_static! {
    static ref VALID_HOSTNAME_ADDRESS_REGEX: Regex =
        Regex::new(VALID_HOSTNAME_ADDRESS).expect("hostname address regex must compile");
}

/// Protocols for which the listener must not set a hostname
const PROTOCOLS_HOSTNAME_INVALID: &[&str] = &[protocol::TCP, protocol::UDP];
/// Protocols for which the listener must not carry a TLS configuration
const PROTOCOLS_TLS_INVALID: &[&str] = &[protocol::HTTP, protocol::TCP, protocol::UDP];
/// Protocols for which the listener must carry a TLS configuration
const PROTOCOLS_TLS_REQUIRED: &[&str] = &[protocol::HTTPS, protocol::TLS];

fn listeners_path() -> FieldPath {
    FieldPath::new("spec").child("listeners")
}

/// Checks the syntax of every listener hostname.
///
/// An unset, empty or `*` hostname matches everything and is skipped. Any
/// other value must not be an IP address, and must be a DNS-1123 subdomain,
/// optionally prefixed by a single `*.` label. The IP check and the syntax
/// check are independent, a value failing both is reported twice.
pub fn validate_gateway_listener_hostnames(gateway: &Gateway) -> FieldErrors {
    validate_listener_hostnames(&gateway.spec.listeners, &listeners_path())
}

fn validate_listener_hostnames(listeners: &[Listener], path: &FieldPath) -> FieldErrors {
    let mut errors = Vec::new();
    for (i, listener) in listeners.iter().enumerate() {
        let hostname = match listener.hostname.as_deref() {
            None | Some("") | Some("*") => continue,
            Some(hostname) => hostname,
        };
        let hostname_path = path.index(i).child("hostname");

        if dns::is_ip_address(hostname) {
            errors.push(FieldError::invalid(
                hostname_path.clone(),
                hostname,
                HOSTNAME_IS_IP_MESSAGE,
            ));
        }

        let violations = if hostname.contains('*') {
            dns::is_wildcard_dns1123_subdomain(hostname)
        } else {
            dns::is_dns1123_subdomain(hostname)
        };
        errors.extend(
            violations
                .into_iter()
                .map(|message| FieldError::invalid(hostname_path.clone(), hostname, message)),
        );
    }
    errors
}

/// Runs every Gateway check: listener hostnames, TLS configuration,
/// uniqueness of names and of hostname/protocol/port combinations, then
/// addresses.
pub fn validate_gateway(gateway: &Gateway) -> FieldErrors {
    let listeners = &gateway.spec.listeners;
    let path = listeners_path();

    let mut errors = validate_listener_hostnames(listeners, &path);
    errors.extend(validate_listener_tls_config(listeners, &path));
    errors.extend(validate_listener_hostname_protocol(listeners, &path));
    errors.extend(validate_tls_certificate_refs(listeners, &path));
    errors.extend(validate_listener_names(listeners, &path));
    errors.extend(validate_hostname_protocol_port(listeners, &path));
    errors.extend(validate_gateway_addresses(
        &gateway.spec.addresses,
        &FieldPath::new("spec").child("addresses"),
    ));
    errors
}

fn validate_listener_tls_config(listeners: &[Listener], path: &FieldPath) -> FieldErrors {
    let mut errors = Vec::new();
    for (i, listener) in listeners.iter().enumerate() {
        let protocol = listener.protocol.as_str();
        if PROTOCOLS_TLS_REQUIRED.contains(&protocol) && listener.tls.is_none() {
            errors.push(FieldError::forbidden(
                path.index(i).child("tls"),
                format!("must be set for protocol {protocol}"),
            ));
        }
        if PROTOCOLS_TLS_INVALID.contains(&protocol) && listener.tls.is_some() {
            errors.push(FieldError::forbidden(
                path.index(i).child("tls"),
                format!("should be empty for protocol {protocol}"),
            ));
        }
    }
    errors
}

fn validate_listener_hostname_protocol(listeners: &[Listener], path: &FieldPath) -> FieldErrors {
    listeners
        .iter()
        .enumerate()
        .filter(|(_, l)| {
            PROTOCOLS_HOSTNAME_INVALID.contains(&l.protocol.as_str()) && l.hostname.is_some()
        })
        .map(|(i, l)| {
            FieldError::forbidden(
                path.index(i).child("hostname"),
                format!("should be empty for protocol {}", l.protocol),
            )
        })
        .collect()
}

fn validate_tls_certificate_refs(listeners: &[Listener], path: &FieldPath) -> FieldErrors {
    let mut errors = Vec::new();
    for (i, listener) in listeners.iter().enumerate() {
        if !PROTOCOLS_TLS_REQUIRED.contains(&listener.protocol.as_str()) {
            continue;
        }
        if let Some(tls) = &listener.tls {
            if tls.mode() == TlsMode::Terminate && tls.certificate_refs.is_empty() {
                errors.push(FieldError::forbidden(
                    path.index(i).child("tls").child("certificateRefs"),
                    "should be set and not empty when TLSModeType is Terminate",
                ));
            }
        }
    }
    errors
}

fn validate_listener_names(listeners: &[Listener], path: &FieldPath) -> FieldErrors {
    let mut names = HashSet::new();
    let mut errors = Vec::new();
    for (i, listener) in listeners.iter().enumerate() {
        if !names.insert(listener.name.as_str()) {
            errors.push(FieldError::duplicate(
                path.index(i).child("name"),
                "must be unique within the Gateway",
            ));
        }
    }
    errors
}

fn validate_hostname_protocol_port(listeners: &[Listener], path: &FieldPath) -> FieldErrors {
    let mut combinations = HashSet::new();
    let mut errors = Vec::new();
    for (i, listener) in listeners.iter().enumerate() {
        let combination = format!(
            "{}:{}:{}",
            listener.hostname.as_deref().unwrap_or_default(),
            listener.protocol,
            listener.port
        );
        if combinations.contains(&combination) {
            errors.push(FieldError::duplicate(
                path.index(i),
                "combination of port, protocol, and hostname must be unique for each listener",
            ));
        } else {
            combinations.insert(combination);
        }
    }
    errors
}

fn validate_gateway_addresses(addresses: &[GatewayAddress], path: &FieldPath) -> FieldErrors {
    let mut errors = Vec::new();
    let mut ip_addresses = HashSet::new();
    let mut hostnames = HashSet::new();

    for (i, address) in addresses.iter().enumerate() {
        let value = address.value.as_str();
        let seen = match address.address_type() {
            address_type::IP_ADDRESS => {
                if !dns::is_ip_address(value) {
                    errors.push(FieldError::invalid(path.index(i), value, "invalid ip address"));
                }
                &mut ip_addresses
            }
            address_type::HOSTNAME => {
                if !VALID_HOSTNAME_ADDRESS_REGEX.is_match(value) {
                    errors.push(FieldError::invalid(
                        path.index(i),
                        value,
                        format!("must only contain valid characters (matching {VALID_HOSTNAME_ADDRESS})"),
                    ));
                }
                &mut hostnames
            }
            // implementation-specific address types
            _ => continue,
        };
        if !seen.insert(value) {
            errors.push(FieldError::duplicate(path.index(i), value));
        }
    }
    errors
}
