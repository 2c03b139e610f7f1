use crate::domain::ids::{NotificationId, UserId};
use crate::domain::notification::Notification;
use crate::domain::repository::{NotificationRepository, RepositoryError};
use crate::infrastructure::persistence::PostgresRepository;
use crate::infrastructure::persistence::result::{database_error, row_to_notification};

impl NotificationRepository for PostgresRepository {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, message, is_read, created_at FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.0)
        .fetch_all(self.pool())
        .await
        .map_err(database_error)?;
        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
            .bind(id.0)
            .bind(user_id.0)
            .execute(self.pool())
            .await
            .map_err(database_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE user_id = $1 AND NOT is_read")
            .bind(user_id.0)
            .execute(self.pool())
            .await
            .map_err(database_error)?;
        Ok(result.rows_affected())
    }
}
