use coursehub_common::OrderId;
use serde::{Deserialize, Serialize};

use crate::domain::enrollment::{Checkout, PaymentSubmission};
use crate::domain::ids::CourseId;
use crate::domain::payment_provider::PaymentSettings;
use crate::infrastructure::http::api::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentRequest {
    pub course_id: Option<String>,
    pub order_id: Option<String>,
    pub proof_image_url: Option<String>,
}

impl TryFrom<SubmitPaymentRequest> for PaymentSubmission {
    type Error = ApiError;

    fn try_from(value: SubmitPaymentRequest) -> Result<Self, Self::Error> {
        let missing = || ApiError::BadRequest("Missing required fields".to_string());

        let course_id = value
            .course_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(missing)?;
        let order_id = value
            .order_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(missing)?;

        let course_id = course_id
            .trim()
            .parse::<CourseId>()
            .map_err(|_| ApiError::BadRequest("Invalid course id".to_string()))?;
        let order_id =
            OrderId::try_new(order_id).map_err(|_| ApiError::BadRequest("Invalid order id".to_string()))?;

        Ok(Self {
            course_id,
            order_id,
            proof_image_url: value
                .proof_image_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectPaymentRequest {
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub const SUCCESS: SuccessResponse = SuccessResponse { success: true };

/// Where the learner continues after checkout, relative to the platform root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl CheckoutResponse {
    pub fn new(checkout: Checkout, course_id: CourseId, settings: &PaymentSettings) -> Self {
        match checkout {
            Checkout::Enrolled(_) => Self {
                url: format!("/courses/{}", course_id),
                title: None,
                currency: None,
            },
            Checkout::PaymentRequired {
                trade_no,
                price,
                title,
            } => Self {
                url: format!(
                    "/payment/checkout?courseId={}&orderId={}&price={}",
                    course_id, trade_no, price
                ),
                title: Some(title),
                currency: Some(settings.currency.clone()),
            },
        }
    }
}

/// Acknowledgement the provider expects for every accepted notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub return_code: &'static str,
    pub return_message: Option<String>,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self {
            return_code: "SUCCESS",
            return_message: None,
        }
    }
}
