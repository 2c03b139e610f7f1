use std::future::Future;

use crate::domain::course::{
    Attachment, Category, Chapter, ChapterPosition, Course, CourseFilter, CourseSummary,
    NewAttachment, NewChapter, NewCourse, Sale,
};
use crate::domain::enrollment::{
    NewPendingPurchase, NewPurchase, PendingPaymentView, PendingPurchase, Purchase,
};
use crate::domain::ids::{AttachmentId, ChapterId, CourseId, NotificationId, PendingPurchaseId, UserId};
use crate::domain::notification::{NewNotification, Notification};
use crate::domain::progress::{ProgressCounts, UserProgress};
use crate::domain::user::{PlatformCounts, User};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    DatabaseError(String),
}

/// Courses, their chapters and attachments
pub trait CourseRepository: Clone + Send + Sync + 'static {
    fn create_course(
        &self,
        course: NewCourse,
    ) -> impl Future<Output = Result<Course, RepositoryError>> + Send;

    fn find_course(
        &self,
        id: CourseId,
    ) -> impl Future<Output = Result<Option<Course>, RepositoryError>> + Send;

    /// Find a course only if it belongs to the given instructor
    fn find_owned_course(
        &self,
        id: CourseId,
        owner: UserId,
    ) -> impl Future<Output = Result<Option<Course>, RepositoryError>> + Send;

    fn update_course(
        &self,
        course: &Course,
    ) -> impl Future<Output = Result<Course, RepositoryError>> + Send;

    /// Delete a course together with everything that references it
    fn delete_course(&self, id: CourseId) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn set_course_published(
        &self,
        id: CourseId,
        published: bool,
    ) -> impl Future<Output = Result<Course, RepositoryError>> + Send;

    /// Published courses matching the filter, newest first
    fn list_published_courses(
        &self,
        filter: &CourseFilter,
    ) -> impl Future<Output = Result<Vec<CourseSummary>, RepositoryError>> + Send;

    /// Courses regardless of publication, newest first. `owner` narrows the
    /// list to the courses of one instructor.
    fn list_courses(
        &self,
        owner: Option<UserId>,
    ) -> impl Future<Output = Result<Vec<Course>, RepositoryError>> + Send;

    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, RepositoryError>> + Send;

    /// Chapters of a course ordered by position
    fn list_chapters(
        &self,
        course_id: CourseId,
    ) -> impl Future<Output = Result<Vec<Chapter>, RepositoryError>> + Send;

    fn find_chapter(
        &self,
        course_id: CourseId,
        chapter_id: ChapterId,
    ) -> impl Future<Output = Result<Option<Chapter>, RepositoryError>> + Send;

    fn create_chapter(
        &self,
        chapter: NewChapter,
    ) -> impl Future<Output = Result<Chapter, RepositoryError>> + Send;

    fn update_chapter(
        &self,
        chapter: &Chapter,
    ) -> impl Future<Output = Result<Chapter, RepositoryError>> + Send;

    /// Returns false when the chapter does not exist in the course
    fn delete_chapter(
        &self,
        course_id: CourseId,
        chapter_id: ChapterId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn reorder_chapters(
        &self,
        course_id: CourseId,
        positions: &[ChapterPosition],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn list_attachments(
        &self,
        course_id: CourseId,
    ) -> impl Future<Output = Result<Vec<Attachment>, RepositoryError>> + Send;

    fn create_attachment(
        &self,
        attachment: NewAttachment,
    ) -> impl Future<Output = Result<Attachment, RepositoryError>> + Send;

    /// Returns false when the attachment does not exist in the course
    fn delete_attachment(
        &self,
        course_id: CourseId,
        attachment_id: AttachmentId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn has_purchase(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn list_purchased_courses(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Course>, RepositoryError>> + Send;

    /// One entry per purchase of a course owned by the instructor
    fn list_sales(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Vec<Sale>, RepositoryError>> + Send;
}

/// Entry point of the enrollment workflow: every multi-write operation runs
/// inside one [`EnrollmentTx`].
pub trait EnrollmentStore: Clone + Send + Sync + 'static {
    type Tx: EnrollmentTx;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;

    /// Payments with status PENDING, oldest first
    fn list_pending_payments(
        &self,
    ) -> impl Future<Output = Result<Vec<PendingPaymentView>, RepositoryError>> + Send;
}

/// Unit of work over purchases, pending purchases and notifications.
/// Dropping it without `commit` discards every write.
pub trait EnrollmentTx: Send {
    /// Load the course and hold it until the end of the unit of work, so that
    /// capacity checks on the same course are serialized
    fn lock_course(
        &mut self,
        course_id: CourseId,
    ) -> impl Future<Output = Result<Option<Course>, RepositoryError>> + Send;

    fn find_purchase(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
    ) -> impl Future<Output = Result<Option<Purchase>, RepositoryError>> + Send;

    fn find_pending(
        &mut self,
        id: PendingPurchaseId,
    ) -> impl Future<Output = Result<Option<PendingPurchase>, RepositoryError>> + Send;

    /// Like `find_pending`, but holds the row until the end of the unit of work
    fn lock_pending(
        &mut self,
        id: PendingPurchaseId,
    ) -> impl Future<Output = Result<Option<PendingPurchase>, RepositoryError>> + Send;

    fn find_pending_for(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
    ) -> impl Future<Output = Result<Option<PendingPurchase>, RepositoryError>> + Send;

    fn count_purchases(
        &mut self,
        course_id: CourseId,
    ) -> impl Future<Output = Result<i64, RepositoryError>> + Send;

    /// Count pending purchases of the course with status PENDING
    fn count_pending(
        &mut self,
        course_id: CourseId,
    ) -> impl Future<Output = Result<i64, RepositoryError>> + Send;

    fn insert_pending(
        &mut self,
        pending: NewPendingPurchase,
    ) -> impl Future<Output = Result<PendingPurchase, RepositoryError>> + Send;

    /// Persist status, order id, proof and admin note of an existing row
    fn update_pending(
        &mut self,
        pending: &PendingPurchase,
    ) -> impl Future<Output = Result<PendingPurchase, RepositoryError>> + Send;

    fn insert_purchase(
        &mut self,
        purchase: NewPurchase,
    ) -> impl Future<Output = Result<Purchase, RepositoryError>> + Send;

    fn insert_notification(
        &mut self,
        notification: NewNotification,
    ) -> impl Future<Output = Result<Notification, RepositoryError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

pub trait ProgressRepository: Clone + Send + Sync + 'static {
    fn upsert_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
        is_completed: bool,
    ) -> impl Future<Output = Result<UserProgress, RepositoryError>> + Send;

    fn find_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
    ) -> impl Future<Output = Result<Option<UserProgress>, RepositoryError>> + Send;

    /// Progress rows of the user for chapters of the course
    fn list_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> impl Future<Output = Result<Vec<UserProgress>, RepositoryError>> + Send;

    /// Published chapters of the course and how many of them the user completed
    fn count_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> impl Future<Output = Result<ProgressCounts, RepositoryError>> + Send;
}

pub trait NotificationRepository: Clone + Send + Sync + 'static {
    /// Notifications of the user, newest first
    fn list_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Notification>, RepositoryError>> + Send;

    /// Returns false when the notification does not belong to the user
    fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn mark_all_read(&self, user_id: UserId) -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

pub trait UserRepository: Clone + Send + Sync + 'static {
    fn find_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn toggle_ban(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Every user, newest first
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    fn count_platform(&self) -> impl Future<Output = Result<PlatformCounts, RepositoryError>> + Send;
}
