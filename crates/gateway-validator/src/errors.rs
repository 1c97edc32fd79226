use thiserror::Error;

use crate::admission_review::ResourceIdentity;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Syntax(#[source] serde_json::Error),

    #[error("object is missing from the admission request")]
    MissingObject,

    #[error("oldObject is missing from the admission request")]
    MissingOldObject,

    #[error("expected an object of kind {expected}, got {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: String,
    },

    #[error("cannot decode {kind} object: {source}")]
    Object {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
#[error("cannot encode admission review: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown resource '{}'", .0.resource)]
    UnknownResource(ResourceIdentity),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Everything that can go wrong while turning a request body into a reply
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("admission review object is missing")]
    MissingBody,

    #[error("submitted object is not of kind AdmissionReview")]
    NotAdmissionReview,

    #[error("admission review request is missing")]
    MissingRequest,

    #[error(transparent)]
    Malformed(DecodeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl ReviewError {
    /// Whether the fault lies with the submitted body (4xx) rather than with
    /// the server (5xx)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReviewError::MissingBody
                | ReviewError::NotAdmissionReview
                | ReviewError::MissingRequest
                | ReviewError::Malformed(_)
        )
    }
}
