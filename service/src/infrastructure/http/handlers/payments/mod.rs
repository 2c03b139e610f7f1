use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

use crate::domain::AppState;
use crate::domain::enrollment::{self, EnrollmentError, Fulfilment, PaymentSubmission, PendingPaymentView};
use crate::domain::ids::{CourseId, PendingPurchaseId};
use crate::domain::payment_provider::{MerchantTradeNo, SignatureHeaders, authenticate};
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::auth::CurrentUser;
use crate::infrastructure::http::handlers::payments::dto::{
    CheckoutResponse, RejectPaymentRequest, SUCCESS, SubmitPaymentRequest, SuccessResponse,
    WebhookAck,
};

mod dto;

pub const TIMESTAMP_HEADER: &str = "BinancePay-Timestamp";
pub const NONCE_HEADER: &str = "BinancePay-Nonce";
pub const SIGNATURE_HEADER: &str = "BinancePay-Signature";

pub async fn submit_payment<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
    Json(body): Json<SubmitPaymentRequest>,
) -> Result<ApiSuccess<SuccessResponse>, ApiError> {
    let submission = PaymentSubmission::try_from(body)?;

    enrollment::submit_payment_proof(state.enrollments(), &caller, submission)
        .await
        .map(|_| ApiSuccess::ok(SUCCESS))
        .map_err(ApiError::tagged("[PAYMENT_SUBMIT]"))
}

pub async fn checkout<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(course_id): Path<CourseId>,
    State(state): State<S>,
) -> Result<ApiSuccess<CheckoutResponse>, ApiError> {
    enrollment::checkout(state.enrollments(), &caller, course_id)
        .await
        .map(|checkout| {
            ApiSuccess::ok(CheckoutResponse::new(checkout, course_id, state.payment_settings()))
        })
        .map_err(ApiError::tagged("[COURSE_ID_CHECKOUT]"))
}

pub async fn list_pending_payments<S: AppState>(
    CurrentUser(caller): CurrentUser,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<PendingPaymentView>>, ApiError> {
    let admin = caller.require_admin()?;

    enrollment::list_pending_payments(state.enrollments(), &admin)
        .await
        .map(ApiSuccess::ok)
        .map_err(ApiError::tagged("[ADMIN_PAYMENTS]"))
}

pub async fn approve_payment<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(payment_id): Path<PendingPurchaseId>,
    State(state): State<S>,
) -> Result<ApiSuccess<SuccessResponse>, ApiError> {
    let admin = caller.require_admin()?;

    enrollment::approve_payment(state.enrollments(), &admin, payment_id)
        .await
        .map(|_| ApiSuccess::ok(SUCCESS))
        .map_err(ApiError::tagged("[PAYMENT_APPROVE]"))
}

/// The note is optional, an empty body rejects with the default note.
pub async fn reject_payment<S: AppState>(
    CurrentUser(caller): CurrentUser,
    Path(payment_id): Path<PendingPurchaseId>,
    State(state): State<S>,
    body: Bytes,
) -> Result<ApiSuccess<SuccessResponse>, ApiError> {
    let admin = caller.require_admin()?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RejectPaymentRequest::default()
    } else {
        serde_json::from_slice::<RejectPaymentRequest>(&body)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    enrollment::reject_payment(state.enrollments(), &admin, payment_id, request.note)
        .await
        .map(|_| ApiSuccess::ok(SUCCESS))
        .map_err(ApiError::tagged("[PAYMENT_REJECT]"))
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Provider notification of an order status change. Anything that is not a
/// successful payment of one of our trade numbers is acknowledged and ignored.
pub async fn payment_webhook<S: AppState>(
    State(state): State<S>,
    headers: HeaderMap,
    body: String,
) -> Result<ApiSuccess<WebhookAck>, ApiError> {
    let signature = SignatureHeaders {
        timestamp: header(&headers, TIMESTAMP_HEADER),
        nonce: header(&headers, NONCE_HEADER),
        signature: header(&headers, SIGNATURE_HEADER),
    };
    let secret = state.payment_settings().webhook_secret.as_deref();
    let notification =
        authenticate(secret, &signature, &body).map_err(ApiError::tagged("[BINANCE_WEBHOOK]"))?;

    if !notification.is_paid() {
        tracing::debug!(status = ?notification.biz_status, "provider notification ignored");
        return Ok(ApiSuccess::ok(WebhookAck::success()));
    }

    let Some(raw_trade_no) = notification.merchant_trade_no() else {
        tracing::warn!("paid notification without merchant trade number");
        return Ok(ApiSuccess::ok(WebhookAck::success()));
    };
    let trade_no = match raw_trade_no.parse::<MerchantTradeNo>() {
        Ok(trade_no) => trade_no,
        Err(e) => {
            tracing::warn!(error = %e, "paid notification for a foreign order");
            return Ok(ApiSuccess::ok(WebhookAck::success()));
        }
    };

    match enrollment::fulfil_provider_payment(state.enrollments(), &trade_no).await {
        Ok(Fulfilment::Enrolled(purchase)) => {
            tracing::info!(purchase_id = %purchase.id, trade_no = %trade_no, "provider payment fulfilled");
        }
        Ok(Fulfilment::AlreadyEnrolled) => {}
        Err(EnrollmentError::CourseNotFound) => {
            tracing::warn!(trade_no = %trade_no, "paid notification for an unknown course");
        }
        Err(e) => return Err(ApiError::tagged("[BINANCE_WEBHOOK]")(e)),
    }

    Ok(ApiSuccess::ok(WebhookAck::success()))
}
