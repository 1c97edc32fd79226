//! DNS-1123 syntax checks, producing the same messages as the Kubernetes
//! apimachinery validation helpers.

use lazy_static::lazy_static;
use regex::Regex;
use std::net::IpAddr;

const DNS1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";

pub const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;

const DNS1123_SUBDOMAIN_ERROR_MSG: &str = "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character";

const WILDCARD_DNS1123_SUBDOMAIN_ERROR_MSG: &str = "a wildcard DNS-1123 subdomain must start with '*.', followed by a valid DNS subdomain, which must consist of lower case alphanumeric characters, '-' or '.' and end with an alphanumeric character";

lazy_static! {
    static ref DNS1123_SUBDOMAIN_FMT: String =
        format!("{DNS1123_LABEL_FMT}(\\.{DNS1123_LABEL_FMT})*");
    static ref WILDCARD_DNS1123_SUBDOMAIN_FMT: String =
        format!("\\*\\.{}", *DNS1123_SUBDOMAIN_FMT);
    static ref DNS1123_SUBDOMAIN_REGEX: Regex =
        Regex::new(&format!("^{}$", *DNS1123_SUBDOMAIN_FMT))
            .expect("DNS-1123 subdomain regex must compile");
    static ref WILDCARD_DNS1123_SUBDOMAIN_REGEX: Regex =
        Regex::new(&format!("^{}$", *WILDCARD_DNS1123_SUBDOMAIN_FMT))
            .expect("wildcard DNS-1123 subdomain regex must compile");
}

fn regex_error(message: &str, fmt: &str, example: &str) -> String {
    format!("{message} (e.g. '{example}', regex used for validation is '{fmt}')")
}

fn max_len_error(length: usize) -> String {
    format!("must be no more than {length} characters")
}

/// Checks `value` is a lowercase RFC 1123 subdomain. Returns the list of
/// violations, empty when the value is valid.
pub fn is_dns1123_subdomain(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(max_len_error(DNS1123_SUBDOMAIN_MAX_LENGTH));
    }
    if !DNS1123_SUBDOMAIN_REGEX.is_match(value) {
        errors.push(regex_error(
            DNS1123_SUBDOMAIN_ERROR_MSG,
            &DNS1123_SUBDOMAIN_FMT,
            "example.com",
        ));
    }
    errors
}

/// Checks `value` is a `*.` prefixed RFC 1123 subdomain
pub fn is_wildcard_dns1123_subdomain(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(max_len_error(DNS1123_SUBDOMAIN_MAX_LENGTH));
    }
    if !WILDCARD_DNS1123_SUBDOMAIN_REGEX.is_match(value) {
        errors.push(regex_error(
            WILDCARD_DNS1123_SUBDOMAIN_ERROR_MSG,
            &WILDCARD_DNS1123_SUBDOMAIN_FMT,
            "*.example.com",
        ));
    }
    errors
}

/// True when `value` is an IPv4 or IPv6 literal
pub fn is_ip_address(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("example.com", 0)]
    #[case("foo-bar.example.com", 0)]
    #[case("a", 0)]
    #[case("Example.com", 1)]
    #[case("-example.com", 1)]
    #[case("example.com.", 1)]
    #[case("foo.example.com:8080", 1)]
    #[case("", 1)]
    fn subdomain(#[case] value: &str, #[case] expected_errors: usize) {
        assert_eq!(is_dns1123_subdomain(value).len(), expected_errors);
    }

    #[test]
    fn overlong_subdomain_reports_length() {
        let value = format!("{}.com", "a".repeat(250));
        let errors = is_dns1123_subdomain(&value);
        assert_eq!(errors, vec!["must be no more than 253 characters".to_owned()]);
    }

    #[rstest]
    #[case("*.example.com", 0)]
    #[case("*.com", 0)]
    #[case("*.*.com", 1)]
    #[case("foo.*.com", 1)]
    #[case("*example.com", 1)]
    fn wildcard_subdomain(#[case] value: &str, #[case] expected_errors: usize) {
        assert_eq!(is_wildcard_dns1123_subdomain(value).len(), expected_errors);
    }

    #[test]
    fn subdomain_message() {
        assert_eq!(
            is_dns1123_subdomain("foo.example.com:8080"),
            vec![
                r"a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character (e.g. 'example.com', regex used for validation is '[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*')".to_owned()
            ]
        );
    }

    #[rstest]
    #[case("1.2.3.4", true)]
    #[case("2001:db8::68", true)]
    #[case("::1", true)]
    #[case("example.com", false)]
    #[case("1.2.3", false)]
    fn ip_address(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_ip_address(value), expected);
    }
}
