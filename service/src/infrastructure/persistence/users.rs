use coursehub_common::PaymentStatus;

use crate::domain::ids::UserId;
use crate::domain::repository::{RepositoryError, UserRepository};
use crate::domain::user::{PlatformCounts, User};
use crate::infrastructure::persistence::PostgresRepository;
use crate::infrastructure::persistence::result::{
    database_error, row_to_platform_counts, row_to_user,
};

const USER_COLUMNS: &str = "id, name, email, role, is_banned, created_at";

impl UserRepository for PostgresRepository {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_user)
            .transpose()
    }

    async fn toggle_ban(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "UPDATE users SET is_banned = NOT is_banned WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_user)
            .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
        sqlx::query(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(database_error)?
            .iter()
            .map(row_to_user)
            .collect()
    }

    async fn count_platform(&self) -> Result<PlatformCounts, RepositoryError> {
        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM courses) AS total_courses, \
                (SELECT COUNT(*) FROM courses WHERE is_published) AS published_courses, \
                (SELECT COUNT(*) FROM users) AS total_users, \
                (SELECT COUNT(*) FROM purchases) AS total_purchases, \
                (SELECT COUNT(*) FROM pending_purchases WHERE status = $1) AS pending_payments, \
                (SELECT COUNT(*) FROM user_progress WHERE is_completed) AS completed_chapters",
        )
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(database_error)?;
        row_to_platform_counts(&row)
    }
}
