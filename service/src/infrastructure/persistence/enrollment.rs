use sqlx::{Postgres, Transaction};

use crate::domain::course::Course;
use crate::domain::enrollment::{
    NewPendingPurchase, NewPurchase, PendingPaymentView, PendingPurchase, Purchase,
};
use crate::domain::ids::{CourseId, PendingPurchaseId, UserId};
use crate::domain::notification::{NewNotification, Notification};
use crate::domain::repository::{EnrollmentStore, EnrollmentTx, RepositoryError};
use crate::infrastructure::persistence::PostgresRepository;
use crate::infrastructure::persistence::result::{
    COURSE_COLUMNS, PENDING_COLUMNS, database_error, row_to_course, row_to_notification,
    row_to_pending, row_to_pending_view, row_to_purchase,
};
use coursehub_common::PaymentStatus;

/// Database transaction backing one enrollment unit of work.
/// Rolled back by sqlx when dropped before `commit`.
pub struct PostgresEnrollmentTx {
    tx: Transaction<'static, Postgres>,
}

impl EnrollmentStore for PostgresRepository {
    type Tx = PostgresEnrollmentTx;

    async fn begin(&self) -> Result<PostgresEnrollmentTx, RepositoryError> {
        let tx = self.pool().begin().await.map_err(database_error)?;
        Ok(PostgresEnrollmentTx { tx })
    }

    async fn list_pending_payments(&self) -> Result<Vec<PendingPaymentView>, RepositoryError> {
        let sql = format!(
            "SELECT {}, c.title AS course_title, c.price AS course_price, \
                u.name AS user_name, u.email AS user_email \
             FROM pending_purchases p \
             JOIN courses c ON c.id = p.course_id \
             JOIN users u ON u.id = p.user_id \
             WHERE p.status = $1 \
             ORDER BY p.created_at",
            PENDING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(PaymentStatus::Pending.as_str())
            .fetch_all(self.pool())
            .await
            .map_err(database_error)?;
        rows.iter().map(row_to_pending_view).collect()
    }
}

impl PostgresEnrollmentTx {
    async fn fetch_pending(
        &mut self,
        id: PendingPurchaseId,
        lock: bool,
    ) -> Result<Option<PendingPurchase>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM pending_purchases p WHERE p.id = $1{}",
            PENDING_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_pending)
            .transpose()
    }

    async fn count(&mut self, sql: &str, course_id: CourseId) -> Result<i64, RepositoryError> {
        sqlx::query_scalar::<_, i64>(sql)
            .bind(course_id.0)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(database_error)
    }
}

impl EnrollmentTx for PostgresEnrollmentTx {
    async fn lock_course(&mut self, course_id: CourseId) -> Result<Option<Course>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM courses c WHERE c.id = $1 FOR UPDATE",
            COURSE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(course_id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_course)
            .transpose()
    }

    async fn find_purchase(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Purchase>, RepositoryError> {
        sqlx::query(
            "SELECT id, user_id, course_id, created_at FROM purchases WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id.0)
        .bind(course_id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(database_error)?
        .as_ref()
        .map(row_to_purchase)
        .transpose()
    }

    async fn find_pending(
        &mut self,
        id: PendingPurchaseId,
    ) -> Result<Option<PendingPurchase>, RepositoryError> {
        self.fetch_pending(id, false).await
    }

    async fn lock_pending(
        &mut self,
        id: PendingPurchaseId,
    ) -> Result<Option<PendingPurchase>, RepositoryError> {
        self.fetch_pending(id, true).await
    }

    async fn find_pending_for(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<PendingPurchase>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM pending_purchases p WHERE p.user_id = $1 AND p.course_id = $2 FOR UPDATE",
            PENDING_COLUMNS
        );
        sqlx::query(&sql)
            .bind(user_id.0)
            .bind(course_id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_pending)
            .transpose()
    }

    async fn count_purchases(&mut self, course_id: CourseId) -> Result<i64, RepositoryError> {
        self.count("SELECT COUNT(*) FROM purchases WHERE course_id = $1", course_id)
            .await
    }

    async fn count_pending(&mut self, course_id: CourseId) -> Result<i64, RepositoryError> {
        self.count(
            "SELECT COUNT(*) FROM pending_purchases WHERE course_id = $1 AND status = 'PENDING'",
            course_id,
        )
        .await
    }

    async fn insert_pending(
        &mut self,
        pending: NewPendingPurchase,
    ) -> Result<PendingPurchase, RepositoryError> {
        let sql = format!(
            "INSERT INTO pending_purchases AS p (id, user_id, course_id, order_id, proof_image_url, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            PENDING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(pending.id.0)
            .bind(pending.user_id.0)
            .bind(pending.course_id.0)
            .bind(pending.order_id.into_inner())
            .bind(pending.proof_image_url)
            .bind(PaymentStatus::Pending.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(database_error)?;
        row_to_pending(&row)
    }

    async fn update_pending(
        &mut self,
        pending: &PendingPurchase,
    ) -> Result<PendingPurchase, RepositoryError> {
        let sql = format!(
            "UPDATE pending_purchases AS p SET order_id = $2, proof_image_url = $3, status = $4, \
             admin_note = $5, updated_at = now() WHERE p.id = $1 RETURNING {}",
            PENDING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(pending.id.0)
            .bind(&pending.order_id)
            .bind(&pending.proof_image_url)
            .bind(pending.status.as_str())
            .bind(&pending.admin_note)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)?
            .ok_or(RepositoryError::NotFound)?;
        row_to_pending(&row)
    }

    async fn insert_purchase(&mut self, purchase: NewPurchase) -> Result<Purchase, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO purchases (id, user_id, course_id) VALUES ($1, $2, $3) \
             RETURNING id, user_id, course_id, created_at",
        )
        .bind(purchase.id.0)
        .bind(purchase.user_id.0)
        .bind(purchase.course_id.0)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(database_error)?;
        row_to_purchase(&row)
    }

    async fn insert_notification(
        &mut self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO notifications (id, user_id, title, message) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, title, message, is_read, created_at",
        )
        .bind(notification.id.0)
        .bind(notification.user_id.0)
        .bind(notification.title)
        .bind(notification.message)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(database_error)?;
        row_to_notification(&row)
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await.map_err(database_error)
    }
}
