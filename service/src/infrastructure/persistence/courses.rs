use futures::TryStreamExt;
use sqlx::postgres::PgRow;

use crate::domain::course::{
    Attachment, Category, Chapter, ChapterPosition, Course, CourseFilter, CourseSummary,
    NewAttachment, NewChapter, NewCourse, Sale,
};
use crate::domain::ids::{AttachmentId, ChapterId, CourseId, UserId};
use crate::domain::repository::{CourseRepository, RepositoryError};
use crate::infrastructure::persistence::PostgresRepository;
use crate::infrastructure::persistence::result::{
    CHAPTER_COLUMNS, COURSE_COLUMNS, database_error, row_to_attachment, row_to_category,
    row_to_chapter, row_to_course, row_to_course_summary, row_to_sale,
};

fn collect<T>(
    rows: Vec<PgRow>,
    map: fn(&PgRow) -> Result<T, RepositoryError>,
) -> Result<Vec<T>, RepositoryError> {
    rows.iter().map(map).collect()
}

/// Makes `%`, `_` and the escape character itself match literally in a LIKE pattern.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl CourseRepository for PostgresRepository {
    async fn create_course(&self, course: NewCourse) -> Result<Course, RepositoryError> {
        let sql = format!(
            "INSERT INTO courses AS c (id, user_id, title) VALUES ($1, $2, $3) RETURNING {}",
            COURSE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(course.id.0)
            .bind(course.user_id.0)
            .bind(course.title.into_inner())
            .fetch_one(self.pool())
            .await
            .map_err(database_error)?;
        row_to_course(&row)
    }

    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        let sql = format!("SELECT {} FROM courses c WHERE c.id = $1", COURSE_COLUMNS);
        sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_course)
            .transpose()
    }

    async fn find_owned_course(
        &self,
        id: CourseId,
        owner: UserId,
    ) -> Result<Option<Course>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM courses c WHERE c.id = $1 AND c.user_id = $2",
            COURSE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(id.0)
            .bind(owner.0)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_course)
            .transpose()
    }

    async fn update_course(&self, course: &Course) -> Result<Course, RepositoryError> {
        let sql = format!(
            "UPDATE courses AS c SET title = $2, description = $3, image_url = $4, price = $5, \
             category_id = $6, max_capacity = $7, is_live = $8, live_url = $9, start_date = $10, \
             updated_at = now() WHERE c.id = $1 RETURNING {}",
            COURSE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(course.id.0)
            .bind(&course.title)
            .bind(&course.description)
            .bind(&course.image_url)
            .bind(course.price)
            .bind(course.category_id.map(|id| id.0))
            .bind(course.max_capacity)
            .bind(course.is_live)
            .bind(&course.live_url)
            .bind(course.start_date)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .ok_or(RepositoryError::NotFound)?;
        row_to_course(&row)
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), RepositoryError> {
        // chapters, attachments, purchases and progress go with it through ON DELETE CASCADE
        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id.0)
            .execute(self.pool())
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn set_course_published(
        &self,
        id: CourseId,
        published: bool,
    ) -> Result<Course, RepositoryError> {
        let sql = format!(
            "UPDATE courses AS c SET is_published = $2, updated_at = now() WHERE c.id = $1 RETURNING {}",
            COURSE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.0)
            .bind(published)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .ok_or(RepositoryError::NotFound)?;
        row_to_course(&row)
    }

    async fn list_published_courses(
        &self,
        filter: &CourseFilter,
    ) -> Result<Vec<CourseSummary>, RepositoryError> {
        let sql = format!(
            "SELECT {}, cat.name AS category_name, \
                (SELECT COUNT(*) FROM chapters ch WHERE ch.course_id = c.id AND ch.is_published) AS published_chapters \
             FROM courses c \
             LEFT JOIN categories cat ON cat.id = c.category_id \
             WHERE c.is_published \
               AND ($1::text IS NULL OR c.title ILIKE '%' || $1 || '%' ESCAPE '\\') \
               AND ($2::uuid IS NULL OR c.category_id = $2) \
             ORDER BY c.created_at DESC",
            COURSE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.title.as_deref().map(escape_like))
            .bind(filter.category_id.map(|id| id.0))
            .fetch_all(self.pool())
            .await
            .map_err(database_error)?;
        collect(rows, row_to_course_summary)
    }

    async fn list_courses(&self, owner: Option<UserId>) -> Result<Vec<Course>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM courses c WHERE ($1::uuid IS NULL OR c.user_id = $1) \
             ORDER BY c.created_at DESC",
            COURSE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(owner.map(|id| id.0))
            .fetch_all(self.pool())
            .await
            .map_err(database_error)?;
        collect(rows, row_to_course)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(self.pool())
            .await
            .map_err(database_error)?;
        collect(rows, row_to_category)
    }

    async fn list_chapters(&self, course_id: CourseId) -> Result<Vec<Chapter>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM chapters WHERE course_id = $1 ORDER BY position",
            CHAPTER_COLUMNS
        );
        let mut rows = sqlx::query(&sql).bind(course_id.0).fetch(self.pool());

        let mut chapters = Vec::new();
        while let Some(row) = rows.try_next().await.map_err(database_error)? {
            chapters.push(row_to_chapter(&row)?);
        }
        Ok(chapters)
    }

    async fn find_chapter(
        &self,
        course_id: CourseId,
        chapter_id: ChapterId,
    ) -> Result<Option<Chapter>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM chapters WHERE id = $1 AND course_id = $2",
            CHAPTER_COLUMNS
        );
        sqlx::query(&sql)
            .bind(chapter_id.0)
            .bind(course_id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .as_ref()
            .map(row_to_chapter)
            .transpose()
    }

    async fn create_chapter(&self, chapter: NewChapter) -> Result<Chapter, RepositoryError> {
        let sql = format!(
            "INSERT INTO chapters (id, course_id, title, position) VALUES ($1, $2, $3, $4) RETURNING {}",
            CHAPTER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(chapter.id.0)
            .bind(chapter.course_id.0)
            .bind(chapter.title.into_inner())
            .bind(chapter.position)
            .fetch_one(self.pool())
            .await
            .map_err(database_error)?;
        row_to_chapter(&row)
    }

    async fn update_chapter(&self, chapter: &Chapter) -> Result<Chapter, RepositoryError> {
        let sql = format!(
            "UPDATE chapters SET title = $2, description = $3, video_url = $4, is_free = $5, \
             is_published = $6, updated_at = now() WHERE id = $1 RETURNING {}",
            CHAPTER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(chapter.id.0)
            .bind(&chapter.title)
            .bind(&chapter.description)
            .bind(&chapter.video_url)
            .bind(chapter.is_free)
            .bind(chapter.is_published)
            .fetch_optional(self.pool())
            .await
            .map_err(database_error)?
            .ok_or(RepositoryError::NotFound)?;
        row_to_chapter(&row)
    }

    async fn delete_chapter(
        &self,
        course_id: CourseId,
        chapter_id: ChapterId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = $1 AND course_id = $2")
            .bind(chapter_id.0)
            .bind(course_id.0)
            .execute(self.pool())
            .await
            .map_err(database_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn reorder_chapters(
        &self,
        course_id: CourseId,
        positions: &[ChapterPosition],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await.map_err(database_error)?;
        for update in positions {
            sqlx::query("UPDATE chapters SET position = $3, updated_at = now() WHERE id = $1 AND course_id = $2")
                .bind(update.id.0)
                .bind(course_id.0)
                .bind(update.position)
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }
        tx.commit().await.map_err(database_error)
    }

    async fn list_attachments(&self, course_id: CourseId) -> Result<Vec<Attachment>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, course_id, name, url, created_at FROM attachments WHERE course_id = $1 ORDER BY created_at",
        )
        .bind(course_id.0)
        .fetch_all(self.pool())
        .await
        .map_err(database_error)?;
        collect(rows, row_to_attachment)
    }

    async fn create_attachment(&self, attachment: NewAttachment) -> Result<Attachment, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO attachments (id, course_id, name, url) VALUES ($1, $2, $3, $4) \
             RETURNING id, course_id, name, url, created_at",
        )
        .bind(attachment.id.0)
        .bind(attachment.course_id.0)
        .bind(attachment.name)
        .bind(attachment.url)
        .fetch_one(self.pool())
        .await
        .map_err(database_error)?;
        row_to_attachment(&row)
    }

    async fn delete_attachment(
        &self,
        course_id: CourseId,
        attachment_id: AttachmentId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1 AND course_id = $2")
            .bind(attachment_id.0)
            .bind(course_id.0)
            .execute(self.pool())
            .await
            .map_err(database_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn has_purchase(&self, user_id: UserId, course_id: CourseId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM purchases WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id.0)
        .bind(course_id.0)
        .fetch_one(self.pool())
        .await
        .map_err(database_error)
    }

    async fn list_purchased_courses(&self, user_id: UserId) -> Result<Vec<Course>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM purchases p JOIN courses c ON c.id = p.course_id \
             WHERE p.user_id = $1 ORDER BY p.created_at DESC",
            COURSE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.0)
            .fetch_all(self.pool())
            .await
            .map_err(database_error)?;
        collect(rows, row_to_course)
    }

    async fn list_sales(&self, owner: UserId) -> Result<Vec<Sale>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT c.id AS course_id, c.title, c.price FROM purchases p \
             JOIN courses c ON c.id = p.course_id WHERE c.user_id = $1",
        )
        .bind(owner.0)
        .fetch_all(self.pool())
        .await
        .map_err(database_error)?;
        collect(rows, row_to_sale)
    }
}
