use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::AppError;
use crate::schemas::{
    ErrorResponse, GenerateQrRequest, GenerateQrResponse, PaymentCallbackRequest,
    PaymentCallbackResponse, QR_GENERATE_SUCCESS_CODE, QR_PAYMENT_SUCCESS_CODE,
};
use crate::services::transaction_engine::{IssueRequest, ReconcileRequest};
use crate::AppState;

const SUCCESSFUL: &str = "Successful";

#[utoipa::path(
    post,
    path = "/api/v1/qr/generate",
    request_body = GenerateQrRequest,
    params(("X-Signature" = String, Header, description = "Base64 HMAC-SHA256 of the raw body")),
    responses(
        (status = 200, description = "QR issued, or the existing one returned", body = GenerateQrResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 409, description = "Lost a concurrent issuance race", body = ErrorResponse),
        (status = 413, description = "Signed body over 64 KiB", body = ErrorResponse)
    ),
    tag = "QR"
)]
pub async fn generate_qr(
    State(state): State<AppState>,
    payload: Result<Json<GenerateQrRequest>, JsonRejection>,
) -> Result<Json<GenerateQrResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let outcome = state
        .engine
        .issue(IssueRequest {
            merchant_id: req.merchant_id,
            partner_reference_no: req.partner_reference_no,
            amount: req.amount.value,
            currency: req.amount.currency,
        })
        .await?;

    Ok(Json(GenerateQrResponse {
        response_code: QR_GENERATE_SUCCESS_CODE.to_string(),
        response_message: SUCCESSFUL.to_string(),
        reference_no: outcome.reference_no,
        partner_reference_no: outcome.partner_reference_no,
        qr_content: outcome.qr_content,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/qr/payment",
    request_body = PaymentCallbackRequest,
    params(("X-Signature" = String, Header, description = "Base64 HMAC-SHA256 of the raw body")),
    responses(
        (status = 200, description = "Callback applied or already applied", body = PaymentCallbackResponse),
        (status = 400, description = "Invalid input or mismatch", body = ErrorResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 404, description = "Unknown reference number", body = ErrorResponse),
        (status = 409, description = "Transaction already resolved", body = ErrorResponse),
        (status = 413, description = "Signed body over 64 KiB", body = ErrorResponse)
    ),
    tag = "QR"
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    payload: Result<Json<PaymentCallbackRequest>, JsonRejection>,
) -> Result<Json<PaymentCallbackResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let outcome = state
        .engine
        .reconcile(ReconcileRequest {
            original_reference_no: req.original_reference_no,
            original_partner_reference_no: req.original_partner_reference_no,
            amount: req.amount.value,
            currency: req.amount.currency,
            status_desc: req.transaction_status_desc,
            paid_time: req.paid_time,
        })
        .await?;

    Ok(Json(PaymentCallbackResponse {
        response_code: QR_PAYMENT_SUCCESS_CODE.to_string(),
        response_message: SUCCESSFUL.to_string(),
        transaction_status_desc: outcome.status_desc,
    }))
}
