use chrono::{DateTime, Utc};
use coursehub_common::{OrderId, PaymentStatus};
use serde::Serialize;

use crate::domain::ids::{CourseId, PendingPurchaseId, PurchaseId, UserId};
use crate::domain::payment_provider::MerchantTradeNo;
use crate::domain::repository::RepositoryError;

pub mod capacity;
pub mod workflow;

pub use workflow::*;

pub const DEFAULT_REJECTION_NOTE: &str = "Payment proof was not verified";
pub const PROVIDER_CONFIRMATION_NOTE: &str = "Confirmed by payment provider";

/// Confirmed enrollment of a user in a course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub created_at: DateTime<Utc>,
}

/// Payment awaiting manual verification. One row per (user, course),
/// updated in place on resubmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPurchase {
    pub id: PendingPurchaseId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub order_id: String,
    pub proof_image_url: Option<String>,
    pub status: PaymentStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingPurchase {
    fn resubmit(&mut self, order_id: OrderId, proof_image_url: Option<String>) {
        self.order_id = order_id.into_inner();
        self.proof_image_url = proof_image_url;
        self.status = PaymentStatus::Pending;
        self.admin_note = None;
    }
}

#[derive(Debug, Clone)]
pub struct NewPendingPurchase {
    pub id: PendingPurchaseId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub order_id: OrderId,
    pub proof_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub course_id: CourseId,
}

impl NewPurchase {
    pub fn new(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            id: PurchaseId::generate(),
            user_id,
            course_id,
        }
    }
}

/// Payment proof submitted by a learner
#[derive(Debug, Clone)]
pub struct PaymentSubmission {
    pub course_id: CourseId,
    pub order_id: OrderId,
    pub proof_image_url: Option<String>,
}

/// Pending payment with the details an admin needs for review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPaymentView {
    #[serde(flatten)]
    pub pending: PendingPurchase,
    pub course_title: String,
    pub course_price: Option<f64>,
    pub user_name: Option<String>,
    pub user_email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub purchase: Purchase,
    pub pending: PendingPurchase,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Checkout {
    /// Free course, the purchase was recorded immediately
    Enrolled(Purchase),
    /// Paid course, the learner has to pay with the given merchant trade number
    PaymentRequired {
        trade_no: MerchantTradeNo,
        price: f64,
        title: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fulfilment {
    Enrolled(Purchase),
    AlreadyEnrolled,
}

#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("Course not found")]
    CourseNotFound,
    #[error("Payment not found")]
    PaymentNotFound,
    #[error("Already enrolled")]
    AlreadyEnrolled,
    #[error("Already purchased")]
    AlreadyPurchased,
    #[error("Course is at full capacity")]
    CapacityReached,
    #[error("Payment was already approved")]
    AlreadyApproved,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
