use chrono::Utc;
use coursehub_common::PaymentStatus;

use crate::domain::course::Course;
use crate::domain::enrollment::{
    Approval, Checkout, EnrollmentError, Fulfilment, NewPendingPurchase, NewPurchase,
    PaymentSubmission, PendingPaymentView, PendingPurchase, DEFAULT_REJECTION_NOTE,
    PROVIDER_CONFIRMATION_NOTE,
};
use crate::domain::identity::{Admin, Caller};
use crate::domain::ids::{CourseId, PendingPurchaseId};
use crate::domain::notification::NewNotification;
use crate::domain::payment_provider::MerchantTradeNo;
use crate::domain::repository::{EnrollmentStore, EnrollmentTx};

/// Records a payment proof for manual review.
///
/// A second submission for the same course overwrites the existing row and
/// puts it back under review. A first submission has to fit into the course
/// capacity together with confirmed purchases and payments still pending.
pub async fn submit_payment_proof<E: EnrollmentStore>(
    store: &E,
    caller: &Caller,
    submission: PaymentSubmission,
) -> Result<PendingPurchase, EnrollmentError> {
    let mut tx = store.begin().await?;
    let course = tx
        .lock_course(submission.course_id)
        .await?
        .ok_or(EnrollmentError::CourseNotFound)?;

    if tx.find_purchase(caller.id, course.id).await?.is_some() {
        return Err(EnrollmentError::AlreadyEnrolled);
    }

    let pending = match tx.find_pending_for(caller.id, course.id).await? {
        Some(mut existing) => {
            existing.resubmit(submission.order_id, submission.proof_image_url);
            let updated = tx.update_pending(&existing).await?;
            tracing::info!(pending_id = %updated.id, course_id = %course.id, "payment proof resubmitted");
            updated
        }
        None => {
            let confirmed = tx.count_purchases(course.id).await?;
            let pending = tx.count_pending(course.id).await?;
            if !course.capacity().admits_submission(confirmed, pending) {
                tracing::info!(course_id = %course.id, confirmed, pending, "submission refused, course is full");
                return Err(EnrollmentError::CapacityReached);
            }

            let created = tx
                .insert_pending(NewPendingPurchase {
                    id: PendingPurchaseId::generate(),
                    user_id: caller.id,
                    course_id: course.id,
                    order_id: submission.order_id,
                    proof_image_url: submission.proof_image_url,
                })
                .await?;
            tracing::info!(pending_id = %created.id, course_id = %course.id, "payment proof submitted");
            created
        }
    };

    tx.commit().await?;
    Ok(pending)
}

/// Locks the course of a pending payment, then the payment itself.
/// Every writer takes the course lock first.
async fn lock_for_review<T: EnrollmentTx>(
    tx: &mut T,
    id: PendingPurchaseId,
) -> Result<(Course, PendingPurchase), EnrollmentError> {
    let found = tx
        .find_pending(id)
        .await?
        .ok_or(EnrollmentError::PaymentNotFound)?;
    let course = tx
        .lock_course(found.course_id)
        .await?
        .ok_or(EnrollmentError::CourseNotFound)?;
    let pending = tx
        .lock_pending(id)
        .await?
        .ok_or(EnrollmentError::PaymentNotFound)?;
    Ok((course, pending))
}

/// Converts a pending payment into a confirmed purchase and tells the buyer.
/// Only confirmed purchases count against the capacity here.
pub async fn approve_payment<E: EnrollmentStore>(
    store: &E,
    admin: &Admin,
    id: PendingPurchaseId,
) -> Result<Approval, EnrollmentError> {
    let mut tx = store.begin().await?;
    let (course, mut pending) = lock_for_review(&mut tx, id).await?;

    if pending.status == PaymentStatus::Approved {
        return Err(EnrollmentError::AlreadyApproved);
    }

    let purchase = match tx.find_purchase(pending.user_id, course.id).await? {
        Some(purchase) => purchase,
        None => {
            let confirmed = tx.count_purchases(course.id).await?;
            if !course.capacity().admits_approval(confirmed) {
                tracing::info!(pending_id = %id, course_id = %course.id, confirmed, "approval refused, course is full");
                return Err(EnrollmentError::CapacityReached);
            }
            tx.insert_purchase(NewPurchase::new(pending.user_id, course.id))
                .await?
        }
    };

    pending.status = PaymentStatus::Approved;
    let pending = tx.update_pending(&pending).await?;
    tx.insert_notification(NewNotification::payment_approved(pending.user_id, &course.title))
        .await?;
    tx.commit().await?;

    tracing::info!(
        admin_id = %admin.id(),
        pending_id = %pending.id,
        purchase_id = %purchase.id,
        "payment approved"
    );
    Ok(Approval { purchase, pending })
}

/// Marks a pending payment as rejected and tells the buyer. Never creates a purchase.
pub async fn reject_payment<E: EnrollmentStore>(
    store: &E,
    admin: &Admin,
    id: PendingPurchaseId,
    note: Option<String>,
) -> Result<PendingPurchase, EnrollmentError> {
    let mut tx = store.begin().await?;
    let (course, mut pending) = lock_for_review(&mut tx, id).await?;

    if pending.status == PaymentStatus::Approved {
        return Err(EnrollmentError::AlreadyApproved);
    }

    pending.status = PaymentStatus::Rejected;
    pending.admin_note = Some(
        note.map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_NOTE.to_string()),
    );
    let pending = tx.update_pending(&pending).await?;
    tx.insert_notification(NewNotification::payment_rejected(pending.user_id, &course.title))
        .await?;
    tx.commit().await?;

    tracing::info!(admin_id = %admin.id(), pending_id = %pending.id, "payment rejected");
    Ok(pending)
}

pub async fn list_pending_payments<E: EnrollmentStore>(
    store: &E,
    _admin: &Admin,
) -> Result<Vec<PendingPaymentView>, EnrollmentError> {
    Ok(store.list_pending_payments().await?)
}

/// Starts the purchase of a published course. Free courses are enrolled on
/// the spot, paid ones get a merchant trade number to pay with.
pub async fn checkout<E: EnrollmentStore>(
    store: &E,
    caller: &Caller,
    course_id: CourseId,
) -> Result<Checkout, EnrollmentError> {
    let mut tx = store.begin().await?;
    let course = tx
        .lock_course(course_id)
        .await?
        .filter(|course| course.is_published)
        .ok_or(EnrollmentError::CourseNotFound)?;

    if tx.find_purchase(caller.id, course.id).await?.is_some() {
        return Err(EnrollmentError::AlreadyPurchased);
    }

    let own_pending = tx
        .find_pending_for(caller.id, course.id)
        .await?
        .is_some_and(|pending| pending.status == PaymentStatus::Pending);
    let confirmed = tx.count_purchases(course.id).await?;
    let pending = tx.count_pending(course.id).await? - i64::from(own_pending);
    if !course.capacity().admits_submission(confirmed, pending) {
        return Err(EnrollmentError::CapacityReached);
    }

    if course.is_free() {
        let purchase = tx
            .insert_purchase(NewPurchase::new(caller.id, course.id))
            .await?;
        tx.commit().await?;
        tracing::info!(course_id = %course.id, user_id = %caller.id, "enrolled in free course");
        return Ok(Checkout::Enrolled(purchase));
    }

    Ok(Checkout::PaymentRequired {
        trade_no: MerchantTradeNo::new(course.id, caller.id, Utc::now()),
        price: course.price.unwrap_or_default(),
        title: course.title,
    })
}

/// Enrolls the buyer named by a trade number the provider reported as paid.
/// Repeated notifications for the same order are acknowledged without effect.
pub async fn fulfil_provider_payment<E: EnrollmentStore>(
    store: &E,
    trade_no: &MerchantTradeNo,
) -> Result<Fulfilment, EnrollmentError> {
    let mut tx = store.begin().await?;
    let course = tx
        .lock_course(trade_no.course_id)
        .await?
        .ok_or(EnrollmentError::CourseNotFound)?;

    if tx.find_purchase(trade_no.user_id, course.id).await?.is_some() {
        tracing::debug!(trade_no = %trade_no, "provider payment already fulfilled");
        return Ok(Fulfilment::AlreadyEnrolled);
    }

    let purchase = tx
        .insert_purchase(NewPurchase::new(trade_no.user_id, course.id))
        .await?;

    if let Some(mut pending) = tx.find_pending_for(trade_no.user_id, course.id).await? {
        if pending.status == PaymentStatus::Pending {
            pending.status = PaymentStatus::Approved;
            pending.admin_note = Some(PROVIDER_CONFIRMATION_NOTE.to_string());
            tx.update_pending(&pending).await?;
        }
    }

    tx.insert_notification(NewNotification::payment_confirmed(trade_no.user_id, &course.title))
        .await?;
    tx.commit().await?;

    tracing::info!(trade_no = %trade_no, purchase_id = %purchase.id, "provider payment fulfilled");
    Ok(Fulfilment::Enrolled(purchase))
}
