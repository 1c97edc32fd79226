use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use serde::Deserialize;
use serde_json::Value;

use crate::admission_review::AdmissionReview;
use crate::constants::ADMISSION_REVIEW_KIND;
use crate::errors::{DecodeError, EncodeError};
use crate::resources::GatewayApiResource;

/// Turns request bodies into AdmissionReview envelopes and back.
///
/// The codec holds no state. It is built once and handed around by
/// reference, so the same instance serves every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdmissionCodec;

#[derive(Deserialize)]
struct TypeMeta<'a> {
    #[serde(default, borrow)]
    kind: Option<std::borrow::Cow<'a, str>>,
}

impl AdmissionCodec {
    pub fn new() -> Self {
        AdmissionCodec
    }

    /// Reads only the `kind` of the body. Returns `false` when the body is
    /// well formed JSON but not an AdmissionReview.
    pub fn verify_envelope_kind(&self, body: &[u8]) -> Result<bool, DecodeError> {
        let type_meta: TypeMeta = serde_json::from_slice(body).map_err(DecodeError::Syntax)?;
        Ok(type_meta.kind.as_deref() == Some(ADMISSION_REVIEW_KIND))
    }

    pub fn decode_envelope(&self, body: &[u8]) -> Result<AdmissionReview, DecodeError> {
        serde_json::from_slice(body).map_err(DecodeError::Syntax)
    }

    pub fn encode_envelope(&self, review: &AdmissionReview) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(review)?)
    }
}

/// Decodes an object embedded in an AdmissionRequest into its typed model.
/// An object declaring a `kind` other than the one of the model is refused.
pub fn decode_object<T: GatewayApiResource>(raw: &RawExtension) -> Result<T, DecodeError> {
    if let Some(found) = raw.0.get("kind").and_then(Value::as_str) {
        if found != T::KIND {
            return Err(DecodeError::UnexpectedKind {
                expected: T::KIND,
                found: found.to_owned(),
            });
        }
    }

    T::deserialize(&raw.0).map_err(|source| DecodeError::Object {
        kind: T::KIND,
        source,
    })
}
