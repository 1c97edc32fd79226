pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";
pub const ADMISSION_REVIEW_API_VERSION: &str = "admission.k8s.io/v1";

pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// Status code carried by a denied AdmissionResponse
pub const DENIED_STATUS_CODE: u16 = 400;
