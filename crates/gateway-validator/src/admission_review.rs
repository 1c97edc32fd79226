use k8s_openapi::api::authentication::v1::UserInfo;
use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{ADMISSION_REVIEW_API_VERSION, ADMISSION_REVIEW_KIND, DENIED_STATUS_CODE};

/// This models the admission/v1/AdmissionReview object of Kubernetes.
/// A review received from the API server carries a `request`, the one sent
/// back carries the same request plus a `response`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionReview {
    /// Wraps a request into a fresh `admission.k8s.io/v1` envelope
    pub fn new(request: AdmissionRequest) -> Self {
        AdmissionReview {
            kind: ADMISSION_REVIEW_KIND.to_owned(),
            api_version: ADMISSION_REVIEW_API_VERSION.to_owned(),
            request: Some(request),
            response: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<GroupVersionKind>,
    #[serde(default)]
    pub resource: ResourceIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_kind: Option<GroupVersionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_resource: Option<ResourceIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_sub_resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<RawExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_object: Option<RawExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<RawExtension>,
}

impl AdmissionRequest {
    /// Builds a request with only the fields the engine looks at
    pub fn new(uid: &str, resource: ResourceIdentity, operation: Operation) -> Self {
        AdmissionRequest {
            uid: uid.to_owned(),
            kind: None,
            resource,
            sub_resource: None,
            request_kind: None,
            request_resource: None,
            request_sub_resource: None,
            name: None,
            namespace: None,
            operation,
            user_info: None,
            object: None,
            old_object: None,
            dry_run: None,
            options: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

/// The (group, version, resource) triple a request targets. The kind
/// registry matches it exactly: no wildcards, no version negotiation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub resource: String,
}

impl ResourceIdentity {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        ResourceIdentity {
            group: group.to_owned(),
            version: version.to_owned(),
            resource: resource.to_owned(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, Resource={}", self.group, self.version, self.resource)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Connect => "CONNECT",
        }
    }

    /// DELETE and CONNECT requests are never validated
    pub fn is_validated(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// This models the admission/v1/AdmissionResponse object of Kubernetes
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Copied over from the corresponding AdmissionRequest.
    pub uid: String,

    pub allowed: bool,

    /// Why the request was denied. Allowed responses carry an empty status,
    /// responses to DELETE and CONNECT requests carry none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionResponseStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionResponseStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl AdmissionResponse {
    /// The request passed every check
    pub fn allow(uid: &str) -> Self {
        AdmissionResponse {
            uid: uid.to_owned(),
            allowed: true,
            status: Some(AdmissionResponseStatus::default()),
        }
    }

    /// The request is let through without looking at it
    pub fn pass_through(uid: &str) -> Self {
        AdmissionResponse {
            uid: uid.to_owned(),
            allowed: true,
            status: None,
        }
    }

    pub fn deny(uid: &str, message: String) -> Self {
        AdmissionResponse {
            uid: uid.to_owned(),
            allowed: false,
            status: Some(AdmissionResponseStatus {
                message: Some(message),
                code: Some(DENIED_STATUS_CODE),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_request_envelope() {
        let review: AdmissionReview = serde_json::from_value(json!({
            "kind": "AdmissionReview",
            "apiVersion": "admission.k8s.io/v1",
            "request": {
                "uid": "7313cd05-eddc-4150-b88c-971a0d53b2ab",
                "kind": {"group": "gateway.networking.k8s.io", "version": "v1", "kind": "Gateway"},
                "resource": {"group": "gateway.networking.k8s.io", "version": "v1", "resource": "gateways"},
                "operation": "CREATE",
                "userInfo": {"username": "kubernetes-admin", "groups": ["system:masters"]},
                "object": {"kind": "Gateway"}
            }
        }))
        .expect("cannot deserialize review");

        let request = review.request.expect("request is missing");
        assert_eq!(request.uid, "7313cd05-eddc-4150-b88c-971a0d53b2ab");
        assert_eq!(request.operation, Operation::Create);
        assert_eq!(
            request.resource,
            ResourceIdentity::new("gateway.networking.k8s.io", "v1", "gateways")
        );
        assert!(request.old_object.is_none());
        assert_eq!(
            request.user_info.and_then(|u| u.username),
            Some("kubernetes-admin".to_owned())
        );
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let result = serde_json::from_value::<AdmissionRequest>(json!({
            "uid": "abc",
            "operation": "PATCH",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn serialize_allowed_response_with_empty_status() {
        let response = AdmissionResponse::allow("abc");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"uid": "abc", "allowed": true, "status": {}})
        );
    }

    #[test]
    fn serialize_pass_through_response_without_status() {
        let response = AdmissionResponse::pass_through("abc");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"uid": "abc", "allowed": true})
        );
    }

    #[test]
    fn serialize_denied_response() {
        let response = AdmissionResponse::deny("abc", "nope".to_owned());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"uid": "abc", "allowed": false, "status": {"message": "nope", "code": 400}})
        );
    }
}
