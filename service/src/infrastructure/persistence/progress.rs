use crate::domain::ids::{ChapterId, CourseId, ProgressId, UserId};
use crate::domain::progress::{ProgressCounts, UserProgress};
use crate::domain::repository::{ProgressRepository, RepositoryError};
use crate::infrastructure::persistence::PostgresRepository;
use crate::infrastructure::persistence::result::{
    database_error, row_to_progress, row_to_progress_counts,
};

const PROGRESS_COLUMNS: &str = "id, user_id, chapter_id, is_completed, created_at, updated_at";

impl ProgressRepository for PostgresRepository {
    async fn upsert_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
        is_completed: bool,
    ) -> Result<UserProgress, RepositoryError> {
        let sql = format!(
            "INSERT INTO user_progress (id, user_id, chapter_id, is_completed) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, chapter_id) \
             DO UPDATE SET is_completed = EXCLUDED.is_completed, updated_at = now() \
             RETURNING {}",
            PROGRESS_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(ProgressId::generate().0)
            .bind(user_id.0)
            .bind(chapter_id.0)
            .bind(is_completed)
            .fetch_one(self.pool())
            .await
            .map_err(database_error)?;
        row_to_progress(&row)
    }

    async fn find_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
    ) -> Result<Option<UserProgress>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM user_progress WHERE user_id = $1 AND chapter_id = $2",
            PROGRESS_COLUMNS
        );
        sqlx::query(&sql)
            .bind(user_id.0)
            .bind(chapter_id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_progress)
            .transpose()
    }

    async fn list_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<UserProgress>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM user_progress up \
             WHERE up.user_id = $1 \
               AND up.chapter_id IN (SELECT ch.id FROM chapters ch WHERE ch.course_id = $2)",
            PROGRESS_COLUMNS
        );
        sqlx::query(&sql)
            .bind(user_id.0)
            .bind(course_id.0)
            .fetch_all(self.pool())
            .await
            .map_err(database_error)?
            .iter()
            .map(row_to_progress)
            .collect()
    }

    async fn count_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<ProgressCounts, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(ch.id) AS published, \
                COUNT(up.id) FILTER (WHERE up.is_completed) AS completed \
             FROM chapters ch \
             LEFT JOIN user_progress up ON up.chapter_id = ch.id AND up.user_id = $1 \
             WHERE ch.course_id = $2 AND ch.is_published",
        )
        .bind(user_id.0)
        .bind(course_id.0)
        .fetch_one(self.pool())
        .await
        .map_err(database_error)?;
        row_to_progress_counts(&row)
    }
}
