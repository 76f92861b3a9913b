use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::utils::signature::{SignatureError, SIGNATURE_HEADER};
use crate::AppState;

/// Upper bound on a signed request body.
pub const MAX_SIGNED_BODY_BYTES: usize = 64 * 1024;

/// Rejects requests whose body does not carry a valid `X-Signature`.
///
/// The body is buffered so the MAC covers the exact bytes the handler will parse.
pub async fn signature_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|len| len > MAX_SIGNED_BODY_BYTES) {
        return Err(AppError::PayloadTooLarge(MAX_SIGNED_BODY_BYTES));
    }

    // Bodies without a declared length fail here once they pass the limit.
    let bytes = axum::body::to_bytes(body, MAX_SIGNED_BODY_BYTES)
        .await
        .map_err(|e| {
            tracing::warn!(uri = %parts.uri, error = %e, "Signed request body not buffered");
            AppError::PayloadTooLarge(MAX_SIGNED_BODY_BYTES)
        })?;

    let tag = match parts.headers.get(SIGNATURE_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| SignatureError::Invalid)?),
        None => None,
    };

    if let Err(e) = state.verifier.verify(&bytes, tag) {
        tracing::warn!(uri = %parts.uri, error = %e, "Rejected unsigned or mis-signed request");
        return Err(e.into());
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
