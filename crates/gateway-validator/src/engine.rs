use tracing::{Span, debug, info};

use crate::admission_review::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use crate::codec::AdmissionCodec;
use crate::errors::ReviewError;
use crate::field;
use crate::registry::KindRegistry;

/// Turns the body of an admission request into the body of the reply.
///
/// The engine is immutable once built: it can be shared between any number
/// of concurrent requests.
pub struct AdmissionEngine {
    codec: AdmissionCodec,
    registry: KindRegistry,
}

impl AdmissionEngine {
    pub fn new(codec: AdmissionCodec, registry: KindRegistry) -> Self {
        AdmissionEngine { codec, registry }
    }

    /// Engine validating every supported Gateway API resource
    pub fn gateway_api() -> Self {
        AdmissionEngine::new(AdmissionCodec::new(), KindRegistry::gateway_api())
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Full pipeline: decode the envelope, evaluate the request and encode
    /// the reply.
    ///
    /// The request and the verdict are recorded on the current span, into
    /// the `request_uid`, `operation`, `resource_group`, `resource_version`,
    /// `resource`, `allowed` and `response_code` fields when the span
    /// declares them.
    pub fn review(&self, body: &[u8]) -> Result<Vec<u8>, ReviewError> {
        let review = self.decode_review(body)?;
        let response = match &review.request {
            Some(request) => {
                populate_span_with_admission_request_data(request);
                self.evaluate(request)?
            }
            None => return Err(ReviewError::MissingRequest),
        };
        populate_span_with_admission_response(&response);
        debug!(response = ?response, "request evaluated");

        self.respond(review, response)
    }

    /// Decodes a request body, making sure it is an AdmissionReview holding
    /// a request
    pub fn decode_review(&self, body: &[u8]) -> Result<AdmissionReview, ReviewError> {
        if body.is_empty() {
            return Err(ReviewError::MissingBody);
        }
        if !self
            .codec
            .verify_envelope_kind(body)
            .map_err(ReviewError::Malformed)?
        {
            return Err(ReviewError::NotAdmissionReview);
        }

        let review = self
            .codec
            .decode_envelope(body)
            .map_err(ReviewError::Malformed)?;
        if review.request.is_none() {
            return Err(ReviewError::MissingRequest);
        }
        Ok(review)
    }

    /// Computes the verdict for a single request. DELETE and CONNECT
    /// requests are admitted without looking them up.
    pub fn evaluate(&self, request: &AdmissionRequest) -> Result<AdmissionResponse, ReviewError> {
        if !request.operation.is_validated() {
            debug!(
                uid = request.uid.as_str(),
                operation = %request.operation,
                "operation not validated"
            );
            return Ok(AdmissionResponse::pass_through(&request.uid));
        }

        let errors = self.registry.dispatch(request)?;
        if errors.is_empty() {
            return Ok(AdmissionResponse::allow(&request.uid));
        }

        info!(
            uid = request.uid.as_str(),
            resource = %request.resource,
            errors = errors.len(),
            "request rejected"
        );
        Ok(AdmissionResponse::deny(
            &request.uid,
            field::aggregate(&errors),
        ))
    }

    /// Attaches the response to the envelope it answers and encodes it
    pub fn respond(
        &self,
        mut review: AdmissionReview,
        response: AdmissionResponse,
    ) -> Result<Vec<u8>, ReviewError> {
        review.response = Some(response);
        Ok(self.codec.encode_envelope(&review)?)
    }
}

fn populate_span_with_admission_request_data(adm_req: &AdmissionRequest) {
    let span = Span::current();
    span.record("request_uid", adm_req.uid.as_str());
    span.record("operation", adm_req.operation.as_str());
    span.record("resource_group", adm_req.resource.group.as_str());
    span.record("resource_version", adm_req.resource.version.as_str());
    span.record("resource", adm_req.resource.resource.as_str());
}

fn populate_span_with_admission_response(response: &AdmissionResponse) {
    let span = Span::current();
    span.record("allowed", response.allowed);
    if let Some(code) = response.status.as_ref().and_then(|status| status.code) {
        span.record("response_code", code);
    }
}
