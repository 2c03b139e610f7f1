use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::identity::Caller;
use crate::domain::ids::{NotificationId, UserId};
use crate::domain::repository::{NotificationRepository, RepositoryError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
}

impl NewNotification {
    fn new(user_id: UserId, title: &str, message: String) -> Self {
        Self {
            id: NotificationId::generate(),
            user_id,
            title: title.to_string(),
            message,
        }
    }

    pub fn payment_approved(user_id: UserId, course_title: &str) -> Self {
        Self::new(
            user_id,
            "Payment Approved! 🎉",
            format!(
                "Your payment for \"{}\" has been approved. You can now access the course.",
                course_title
            ),
        )
    }

    pub fn payment_rejected(user_id: UserId, course_title: &str) -> Self {
        Self::new(
            user_id,
            "Payment Not Verified",
            format!(
                "Your payment for \"{}\" could not be verified. Please contact support or try again.",
                course_title
            ),
        )
    }

    pub fn payment_confirmed(user_id: UserId, course_title: &str) -> Self {
        Self::new(
            user_id,
            "Payment Confirmed",
            format!(
                "Your payment for \"{}\" was confirmed by the payment provider. You can now access the course.",
                course_title
            ),
        )
    }
}

pub async fn list_notifications<N: NotificationRepository>(
    notifications: &N,
    caller: &Caller,
) -> Result<Vec<Notification>, RepositoryError> {
    notifications.list_for_user(caller.id).await
}

/// Only the recipient can mark a notification as read.
pub async fn mark_notification_read<N: NotificationRepository>(
    notifications: &N,
    caller: &Caller,
    id: NotificationId,
) -> Result<(), RepositoryError> {
    if notifications.mark_read(caller.id, id).await? {
        Ok(())
    } else {
        Err(RepositoryError::NotFound)
    }
}

pub async fn mark_all_notifications_read<N: NotificationRepository>(
    notifications: &N,
    caller: &Caller,
) -> Result<u64, RepositoryError> {
    notifications.mark_all_read(caller.id).await
}
