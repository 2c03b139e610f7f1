use coursehub_common::{
    CHAPTER_ID_FIELD_NAME, COURSE_ID_FIELD_NAME, CREATED_FIELD_NAME, ID_FIELD_NAME,
    UPDATED_FIELD_NAME, USER_ID_FIELD_NAME,
};
use sqlx::{Postgres, Row, postgres::PgRow, types::Uuid};

use crate::domain::course::{Attachment, Category, Chapter, Course, CourseSummary, Sale};
use crate::domain::enrollment::{PendingPaymentView, PendingPurchase, Purchase};
use crate::domain::notification::Notification;
use crate::domain::progress::{ProgressCounts, UserProgress};
use crate::domain::repository::RepositoryError;
use crate::domain::user::{PlatformCounts, User};

pub const COURSE_COLUMNS: &str = "c.id, c.user_id, c.title, c.description, c.image_url, c.price, \
    c.category_id, c.is_published, c.max_capacity, c.is_live, c.live_url, c.start_date, \
    c.created_at, c.updated_at";

pub const CHAPTER_COLUMNS: &str = "id, course_id, title, description, video_url, position, \
    is_published, is_free, created_at, updated_at";

pub const PENDING_COLUMNS: &str = "p.id, p.user_id, p.course_id, p.order_id, p.proof_image_url, \
    p.status, p.admin_note, p.created_at, p.updated_at";

/// Translates driver errors, keeping unique violations apart so they can become conflicts.
pub fn database_error(e: sqlx::Error) -> RepositoryError {
    if let Some(db_error) = e.as_database_error() {
        if db_error.is_unique_violation() {
            let constraint = db_error.constraint().unwrap_or_default().to_string();
            return RepositoryError::UniqueViolation(constraint);
        }
    }
    RepositoryError::DatabaseError(e.to_string())
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::DatabaseError(format!("Failed to parse {}: {}", name, e)))
}

fn id_column<T: From<Uuid>>(row: &PgRow, name: &str) -> Result<T, RepositoryError> {
    column::<Uuid>(row, name).map(T::from)
}

fn parsed_column<T>(row: &PgRow, name: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    column::<String>(row, name)?
        .parse()
        .map_err(|e: T::Err| RepositoryError::DatabaseError(format!("Failed to parse {}: {}", name, e)))
}

pub fn row_to_course(row: &PgRow) -> Result<Course, RepositoryError> {
    Ok(Course {
        id: id_column(row, ID_FIELD_NAME)?,
        user_id: id_column(row, USER_ID_FIELD_NAME)?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        image_url: column(row, "image_url")?,
        price: column(row, "price")?,
        category_id: column::<Option<Uuid>>(row, "category_id")?.map(Into::into),
        is_published: column(row, "is_published")?,
        max_capacity: column(row, "max_capacity")?,
        is_live: column(row, "is_live")?,
        live_url: column(row, "live_url")?,
        start_date: column(row, "start_date")?,
        created_at: column(row, CREATED_FIELD_NAME)?,
        updated_at: column(row, UPDATED_FIELD_NAME)?,
    })
}

pub fn row_to_course_summary(row: &PgRow) -> Result<CourseSummary, RepositoryError> {
    Ok(CourseSummary {
        course: row_to_course(row)?,
        category_name: column(row, "category_name")?,
        published_chapters: column(row, "published_chapters")?,
    })
}

pub fn row_to_category(row: &PgRow) -> Result<Category, RepositoryError> {
    Ok(Category {
        id: id_column(row, ID_FIELD_NAME)?,
        name: column(row, "name")?,
    })
}

pub fn row_to_chapter(row: &PgRow) -> Result<Chapter, RepositoryError> {
    Ok(Chapter {
        id: id_column(row, ID_FIELD_NAME)?,
        course_id: id_column(row, COURSE_ID_FIELD_NAME)?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        video_url: column(row, "video_url")?,
        position: column(row, "position")?,
        is_published: column(row, "is_published")?,
        is_free: column(row, "is_free")?,
        created_at: column(row, CREATED_FIELD_NAME)?,
        updated_at: column(row, UPDATED_FIELD_NAME)?,
    })
}

pub fn row_to_attachment(row: &PgRow) -> Result<Attachment, RepositoryError> {
    Ok(Attachment {
        id: id_column(row, ID_FIELD_NAME)?,
        course_id: id_column(row, COURSE_ID_FIELD_NAME)?,
        name: column(row, "name")?,
        url: column(row, "url")?,
        created_at: column(row, CREATED_FIELD_NAME)?,
    })
}

pub fn row_to_sale(row: &PgRow) -> Result<Sale, RepositoryError> {
    Ok(Sale {
        course_id: id_column(row, COURSE_ID_FIELD_NAME)?,
        title: column(row, "title")?,
        price: column(row, "price")?,
    })
}

pub fn row_to_purchase(row: &PgRow) -> Result<Purchase, RepositoryError> {
    Ok(Purchase {
        id: id_column(row, ID_FIELD_NAME)?,
        user_id: id_column(row, USER_ID_FIELD_NAME)?,
        course_id: id_column(row, COURSE_ID_FIELD_NAME)?,
        created_at: column(row, CREATED_FIELD_NAME)?,
    })
}

pub fn row_to_pending(row: &PgRow) -> Result<PendingPurchase, RepositoryError> {
    Ok(PendingPurchase {
        id: id_column(row, ID_FIELD_NAME)?,
        user_id: id_column(row, USER_ID_FIELD_NAME)?,
        course_id: id_column(row, COURSE_ID_FIELD_NAME)?,
        order_id: column(row, "order_id")?,
        proof_image_url: column(row, "proof_image_url")?,
        status: parsed_column(row, "status")?,
        admin_note: column(row, "admin_note")?,
        created_at: column(row, CREATED_FIELD_NAME)?,
        updated_at: column(row, UPDATED_FIELD_NAME)?,
    })
}

pub fn row_to_pending_view(row: &PgRow) -> Result<PendingPaymentView, RepositoryError> {
    Ok(PendingPaymentView {
        pending: row_to_pending(row)?,
        course_title: column(row, "course_title")?,
        course_price: column(row, "course_price")?,
        user_name: column(row, "user_name")?,
        user_email: column(row, "user_email")?,
    })
}

pub fn row_to_progress(row: &PgRow) -> Result<UserProgress, RepositoryError> {
    Ok(UserProgress {
        id: id_column(row, ID_FIELD_NAME)?,
        user_id: id_column(row, USER_ID_FIELD_NAME)?,
        chapter_id: id_column(row, CHAPTER_ID_FIELD_NAME)?,
        is_completed: column(row, "is_completed")?,
        created_at: column(row, CREATED_FIELD_NAME)?,
        updated_at: column(row, UPDATED_FIELD_NAME)?,
    })
}

pub fn row_to_progress_counts(row: &PgRow) -> Result<ProgressCounts, RepositoryError> {
    Ok(ProgressCounts {
        published: column(row, "published")?,
        completed: column(row, "completed")?,
    })
}

pub fn row_to_notification(row: &PgRow) -> Result<Notification, RepositoryError> {
    Ok(Notification {
        id: id_column(row, ID_FIELD_NAME)?,
        user_id: id_column(row, USER_ID_FIELD_NAME)?,
        title: column(row, "title")?,
        message: column(row, "message")?,
        is_read: column(row, "is_read")?,
        created_at: column(row, CREATED_FIELD_NAME)?,
    })
}

pub fn row_to_user(row: &PgRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: id_column(row, ID_FIELD_NAME)?,
        name: column(row, "name")?,
        email: column(row, "email")?,
        role: parsed_column(row, "role")?,
        is_banned: column(row, "is_banned")?,
        created_at: column(row, CREATED_FIELD_NAME)?,
    })
}

pub fn row_to_platform_counts(row: &PgRow) -> Result<PlatformCounts, RepositoryError> {
    Ok(PlatformCounts {
        total_courses: column(row, "total_courses")?,
        published_courses: column(row, "published_courses")?,
        total_users: column(row, "total_users")?,
        total_purchases: column(row, "total_purchases")?,
        pending_payments: column(row, "pending_payments")?,
        completed_chapters: column(row, "completed_chapters")?,
    })
}
