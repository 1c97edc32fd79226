use axum::{
    body::Bytes,
    extract,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::{api_error::ApiError, state::ApiServerState};

#[tracing::instrument(
    name = "validation",
    fields(
        request_uid=tracing::field::Empty,
        operation=tracing::field::Empty,
        resource_group=tracing::field::Empty,
        resource_version=tracing::field::Empty,
        resource=tracing::field::Empty,
        allowed=tracing::field::Empty,
        response_code=tracing::field::Empty,
    ),
    skip_all)]
/// Validate the Gateway API object carried by an AdmissionReview.
/// The engine fills the span fields as the review goes.
pub(crate) async fn validate_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = state.engine.review(&body)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())],
        payload,
    )
        .into_response())
}

/// Any other method on the validation endpoint. The body is not read.
pub(crate) async fn method_not_allowed_handler(method: Method) -> ApiError {
    ApiError::method_not_allowed(&method)
}
