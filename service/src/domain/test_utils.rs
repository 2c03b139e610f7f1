use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use coursehub_common::{PaymentStatus, Role};

use crate::domain::course::{
    Attachment, Category, Chapter, ChapterPosition, Course, CourseFilter, CourseSummary,
    NewAttachment, NewChapter, NewCourse, Sale,
};
use crate::domain::enrollment::{
    NewPendingPurchase, NewPurchase, PendingPaymentView, PendingPurchase, Purchase,
};
use crate::domain::ids::{
    AttachmentId, CategoryId, ChapterId, CourseId, NotificationId, PendingPurchaseId, ProgressId,
    UserId,
};
use crate::domain::notification::{NewNotification, Notification};
use crate::domain::progress::{ProgressCounts, UserProgress};
use crate::domain::repository::{
    CourseRepository, EnrollmentStore, EnrollmentTx, NotificationRepository, ProgressRepository,
    RepositoryError, UserRepository,
};
use crate::domain::user::{PlatformCounts, User};

#[derive(Debug, Clone, Default)]
struct State {
    users: Vec<User>,
    categories: Vec<Category>,
    courses: Vec<Course>,
    chapters: Vec<Chapter>,
    attachments: Vec<Attachment>,
    purchases: Vec<Purchase>,
    pending: Vec<PendingPurchase>,
    progress: Vec<UserProgress>,
    notifications: Vec<Notification>,
}

impl State {
    fn course(&self, id: CourseId) -> Option<&Course> {
        self.courses.iter().find(|course| course.id == id)
    }

    fn purchase(&self, user_id: UserId, course_id: CourseId) -> Option<&Purchase> {
        self.purchases
            .iter()
            .find(|p| p.user_id == user_id && p.course_id == course_id)
    }

    fn insert_purchase(&mut self, purchase: NewPurchase) -> Result<Purchase, RepositoryError> {
        if self.purchase(purchase.user_id, purchase.course_id).is_some() {
            return Err(RepositoryError::UniqueViolation("purchases_user_id_course_id_idx".into()));
        }
        let purchase = Purchase {
            id: purchase.id,
            user_id: purchase.user_id,
            course_id: purchase.course_id,
            created_at: Utc::now(),
        };
        self.purchases.push(purchase.clone());
        Ok(purchase)
    }

    fn insert_notification(&mut self, notification: NewNotification) -> Notification {
        let notification = Notification {
            id: notification.id,
            user_id: notification.user_id,
            title: notification.title,
            message: notification.message,
            is_read: false,
            created_at: Utc::now(),
        };
        self.notifications.push(notification.clone());
        notification
    }
}

/// In-memory implementation of every repository, used by unit and router tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_user(&self, role: Role) -> UserId {
        let id = UserId::generate();
        self.state().users.push(User {
            id,
            name: Some(format!("{:?}", role)),
            email: format!("{}@example.com", id),
            role,
            is_banned: false,
            created_at: Utc::now(),
        });
        id
    }

    pub fn ban(&self, id: UserId) {
        if let Some(user) = self.state().users.iter_mut().find(|user| user.id == id) {
            user.is_banned = true;
        }
    }

    pub fn add_category(&self, name: &str) -> CategoryId {
        let id = CategoryId::generate();
        self.state().categories.push(Category {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Published course owned by a fresh instructor
    pub fn add_course(&self, price: Option<f64>, max_capacity: Option<i32>) -> CourseId {
        let owner = self.add_user(Role::Instructor);
        let id = CourseId::generate();
        let now = Utc::now();
        self.state().courses.push(Course {
            id,
            user_id: owner,
            title: "Course".to_string(),
            description: Some("Description".to_string()),
            image_url: Some("https://img.example/course.png".to_string()),
            price,
            category_id: None,
            is_published: true,
            max_capacity,
            is_live: false,
            live_url: None,
            start_date: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn set_published(&self, id: CourseId, published: bool) {
        if let Some(course) = self.state().courses.iter_mut().find(|c| c.id == id) {
            course.is_published = published;
        }
    }

    pub fn course_owner(&self, id: CourseId) -> Option<UserId> {
        self.state().course(id).map(|course| course.user_id)
    }

    /// Chapter with video and description, appended after the last one
    pub fn add_chapter(&self, course_id: CourseId, published: bool) -> ChapterId {
        let mut state = self.state();
        let id = ChapterId::generate();
        let position = state
            .chapters
            .iter()
            .filter(|c| c.course_id == course_id)
            .count() as i32
            + 1;
        let now = Utc::now();
        state.chapters.push(Chapter {
            id,
            course_id,
            title: format!("Chapter {}", position),
            description: Some("Description".to_string()),
            video_url: Some(format!("https://video.example/{}.mp4", position)),
            position,
            is_published: published,
            is_free: false,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn complete_chapter(&self, user_id: UserId, chapter_id: ChapterId) {
        let now = Utc::now();
        self.state().progress.push(UserProgress {
            id: ProgressId::generate(),
            user_id,
            chapter_id,
            is_completed: true,
            created_at: now,
            updated_at: now,
        });
    }

    pub fn add_purchase(&self, user_id: UserId, course_id: CourseId) {
        self.state()
            .insert_purchase(NewPurchase::new(user_id, course_id))
            .unwrap();
    }

    pub fn add_notification(&self, notification: NewNotification) -> NotificationId {
        self.state().insert_notification(notification).id
    }

    pub fn purchase_count(&self, course_id: CourseId) -> i64 {
        self.state()
            .purchases
            .iter()
            .filter(|p| p.course_id == course_id)
            .count() as i64
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    pub fn pending(&self, id: PendingPurchaseId) -> Option<PendingPurchase> {
        self.state().pending.iter().find(|p| p.id == id).cloned()
    }
}

impl CourseRepository for MemoryStore {
    async fn create_course(&self, course: NewCourse) -> Result<Course, RepositoryError> {
        let now = Utc::now();
        let course = Course {
            id: course.id,
            user_id: course.user_id,
            title: course.title.into_inner(),
            description: None,
            image_url: None,
            price: None,
            category_id: None,
            is_published: false,
            max_capacity: None,
            is_live: false,
            live_url: None,
            start_date: None,
            created_at: now,
            updated_at: now,
        };
        self.state().courses.push(course.clone());
        Ok(course)
    }

    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.state().course(id).cloned())
    }

    async fn find_owned_course(
        &self,
        id: CourseId,
        owner: UserId,
    ) -> Result<Option<Course>, RepositoryError> {
        Ok(self
            .state()
            .course(id)
            .filter(|course| course.user_id == owner)
            .cloned())
    }

    async fn update_course(&self, course: &Course) -> Result<Course, RepositoryError> {
        let mut state = self.state();
        let stored = state
            .courses
            .iter_mut()
            .find(|c| c.id == course.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = Course {
            updated_at: Utc::now(),
            ..course.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let chapters = state
            .chapters
            .iter()
            .filter(|chapter| chapter.course_id == id)
            .map(|chapter| chapter.id)
            .collect::<Vec<_>>();
        state.courses.retain(|course| course.id != id);
        state.chapters.retain(|chapter| chapter.course_id != id);
        state.attachments.retain(|a| a.course_id != id);
        state.purchases.retain(|p| p.course_id != id);
        state.pending.retain(|p| p.course_id != id);
        state.progress.retain(|p| !chapters.contains(&p.chapter_id));
        Ok(())
    }

    async fn set_course_published(
        &self,
        id: CourseId,
        published: bool,
    ) -> Result<Course, RepositoryError> {
        let mut state = self.state();
        let course = state
            .courses
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        course.is_published = published;
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn list_published_courses(
        &self,
        filter: &CourseFilter,
    ) -> Result<Vec<CourseSummary>, RepositoryError> {
        let state = self.state();
        let title = filter.title.as_ref().map(|t| t.to_lowercase());
        let mut summaries = state
            .courses
            .iter()
            .filter(|course| course.is_published)
            .filter(|course| {
                title
                    .as_ref()
                    .is_none_or(|t| course.title.to_lowercase().contains(t))
            })
            .filter(|course| filter.category_id.is_none_or(|c| course.category_id == Some(c)))
            .map(|course| CourseSummary {
                course: course.clone(),
                category_name: state
                    .categories
                    .iter()
                    .find(|c| Some(c.id) == course.category_id)
                    .map(|c| c.name.clone()),
                published_chapters: state
                    .chapters
                    .iter()
                    .filter(|ch| ch.course_id == course.id && ch.is_published)
                    .count() as i64,
            })
            .collect::<Vec<_>>();
        summaries.sort_by(|a, b| b.course.created_at.cmp(&a.course.created_at));
        Ok(summaries)
    }

    async fn list_courses(&self, owner: Option<UserId>) -> Result<Vec<Course>, RepositoryError> {
        let mut courses = self
            .state()
            .courses
            .iter()
            .rev()
            .filter(|course| owner.is_none_or(|owner| course.user_id == owner))
            .cloned()
            .collect::<Vec<_>>();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories = self.state().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_chapters(&self, course_id: CourseId) -> Result<Vec<Chapter>, RepositoryError> {
        let mut chapters = self
            .state()
            .chapters
            .iter()
            .filter(|chapter| chapter.course_id == course_id)
            .cloned()
            .collect::<Vec<_>>();
        chapters.sort_by_key(|chapter| chapter.position);
        Ok(chapters)
    }

    async fn find_chapter(
        &self,
        course_id: CourseId,
        chapter_id: ChapterId,
    ) -> Result<Option<Chapter>, RepositoryError> {
        Ok(self
            .state()
            .chapters
            .iter()
            .find(|c| c.id == chapter_id && c.course_id == course_id)
            .cloned())
    }

    async fn create_chapter(&self, chapter: NewChapter) -> Result<Chapter, RepositoryError> {
        let now = Utc::now();
        let chapter = Chapter {
            id: chapter.id,
            course_id: chapter.course_id,
            title: chapter.title.into_inner(),
            description: None,
            video_url: None,
            position: chapter.position,
            is_published: false,
            is_free: false,
            created_at: now,
            updated_at: now,
        };
        self.state().chapters.push(chapter.clone());
        Ok(chapter)
    }

    async fn update_chapter(&self, chapter: &Chapter) -> Result<Chapter, RepositoryError> {
        let mut state = self.state();
        let stored = state
            .chapters
            .iter_mut()
            .find(|c| c.id == chapter.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = Chapter {
            updated_at: Utc::now(),
            ..chapter.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_chapter(
        &self,
        course_id: CourseId,
        chapter_id: ChapterId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        let before = state.chapters.len();
        state
            .chapters
            .retain(|c| !(c.id == chapter_id && c.course_id == course_id));
        let deleted = state.chapters.len() < before;
        if deleted {
            state.progress.retain(|p| p.chapter_id != chapter_id);
        }
        Ok(deleted)
    }

    async fn reorder_chapters(
        &self,
        course_id: CourseId,
        positions: &[ChapterPosition],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        for update in positions {
            if let Some(chapter) = state
                .chapters
                .iter_mut()
                .find(|c| c.id == update.id && c.course_id == course_id)
            {
                chapter.position = update.position;
            }
        }
        Ok(())
    }

    async fn list_attachments(&self, course_id: CourseId) -> Result<Vec<Attachment>, RepositoryError> {
        Ok(self
            .state()
            .attachments
            .iter()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn create_attachment(&self, attachment: NewAttachment) -> Result<Attachment, RepositoryError> {
        let attachment = Attachment {
            id: attachment.id,
            course_id: attachment.course_id,
            name: attachment.name,
            url: attachment.url,
            created_at: Utc::now(),
        };
        self.state().attachments.push(attachment.clone());
        Ok(attachment)
    }

    async fn delete_attachment(
        &self,
        course_id: CourseId,
        attachment_id: AttachmentId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        let before = state.attachments.len();
        state
            .attachments
            .retain(|a| !(a.id == attachment_id && a.course_id == course_id));
        Ok(state.attachments.len() < before)
    }

    async fn has_purchase(&self, user_id: UserId, course_id: CourseId) -> Result<bool, RepositoryError> {
        Ok(self.state().purchase(user_id, course_id).is_some())
    }

    async fn list_purchased_courses(&self, user_id: UserId) -> Result<Vec<Course>, RepositoryError> {
        let state = self.state();
        Ok(state
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| state.course(p.course_id).cloned())
            .collect())
    }

    async fn list_sales(&self, owner: UserId) -> Result<Vec<Sale>, RepositoryError> {
        let state = self.state();
        Ok(state
            .purchases
            .iter()
            .filter_map(|p| state.course(p.course_id))
            .filter(|course| course.user_id == owner)
            .map(|course| Sale {
                course_id: course.id,
                title: course.title.clone(),
                price: course.price,
            })
            .collect())
    }
}

/// Works on a copy of the store state which replaces the shared one on commit.
#[derive(Debug)]
pub struct MemoryTx {
    store: MemoryStore,
    state: State,
}

impl EnrollmentStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, RepositoryError> {
        Ok(MemoryTx {
            store: self.clone(),
            state: self.state().clone(),
        })
    }

    async fn list_pending_payments(&self) -> Result<Vec<PendingPaymentView>, RepositoryError> {
        let state = self.state();
        let mut views = state
            .pending
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending)
            .filter_map(|p| {
                let course = state.course(p.course_id)?;
                let user = state.users.iter().find(|u| u.id == p.user_id)?;
                Some(PendingPaymentView {
                    pending: p.clone(),
                    course_title: course.title.clone(),
                    course_price: course.price,
                    user_name: user.name.clone(),
                    user_email: user.email.clone(),
                })
            })
            .collect::<Vec<_>>();
        views.sort_by_key(|view| view.pending.created_at);
        Ok(views)
    }
}

impl EnrollmentTx for MemoryTx {
    async fn lock_course(&mut self, course_id: CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.state.course(course_id).cloned())
    }

    async fn find_purchase(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Purchase>, RepositoryError> {
        Ok(self.state.purchase(user_id, course_id).cloned())
    }

    async fn find_pending(
        &mut self,
        id: PendingPurchaseId,
    ) -> Result<Option<PendingPurchase>, RepositoryError> {
        Ok(self.state.pending.iter().find(|p| p.id == id).cloned())
    }

    async fn lock_pending(
        &mut self,
        id: PendingPurchaseId,
    ) -> Result<Option<PendingPurchase>, RepositoryError> {
        self.find_pending(id).await
    }

    async fn find_pending_for(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<PendingPurchase>, RepositoryError> {
        Ok(self
            .state
            .pending
            .iter()
            .find(|p| p.user_id == user_id && p.course_id == course_id)
            .cloned())
    }

    async fn count_purchases(&mut self, course_id: CourseId) -> Result<i64, RepositoryError> {
        Ok(self
            .state
            .purchases
            .iter()
            .filter(|p| p.course_id == course_id)
            .count() as i64)
    }

    async fn count_pending(&mut self, course_id: CourseId) -> Result<i64, RepositoryError> {
        Ok(self
            .state
            .pending
            .iter()
            .filter(|p| p.course_id == course_id && p.status == PaymentStatus::Pending)
            .count() as i64)
    }

    async fn insert_pending(
        &mut self,
        pending: NewPendingPurchase,
    ) -> Result<PendingPurchase, RepositoryError> {
        if self
            .state
            .pending
            .iter()
            .any(|p| p.user_id == pending.user_id && p.course_id == pending.course_id)
        {
            return Err(RepositoryError::UniqueViolation(
                "pending_purchases_user_id_course_id_idx".into(),
            ));
        }
        let now = Utc::now();
        let pending = PendingPurchase {
            id: pending.id,
            user_id: pending.user_id,
            course_id: pending.course_id,
            order_id: pending.order_id.into_inner(),
            proof_image_url: pending.proof_image_url,
            status: PaymentStatus::Pending,
            admin_note: None,
            created_at: now,
            updated_at: now,
        };
        self.state.pending.push(pending.clone());
        Ok(pending)
    }

    async fn update_pending(
        &mut self,
        pending: &PendingPurchase,
    ) -> Result<PendingPurchase, RepositoryError> {
        let stored = self
            .state
            .pending
            .iter_mut()
            .find(|p| p.id == pending.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = PendingPurchase {
            updated_at: Utc::now(),
            ..pending.clone()
        };
        Ok(stored.clone())
    }

    async fn insert_purchase(&mut self, purchase: NewPurchase) -> Result<Purchase, RepositoryError> {
        self.state.insert_purchase(purchase)
    }

    async fn insert_notification(
        &mut self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        Ok(self.state.insert_notification(notification))
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        *self.store.state() = self.state;
        Ok(())
    }
}

impl ProgressRepository for MemoryStore {
    async fn upsert_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
        is_completed: bool,
    ) -> Result<UserProgress, RepositoryError> {
        let mut state = self.state();
        let now = Utc::now();
        if let Some(existing) = state
            .progress
            .iter_mut()
            .find(|p| p.user_id == user_id && p.chapter_id == chapter_id)
        {
            existing.is_completed = is_completed;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let progress = UserProgress {
            id: ProgressId::generate(),
            user_id,
            chapter_id,
            is_completed,
            created_at: now,
            updated_at: now,
        };
        state.progress.push(progress.clone());
        Ok(progress)
    }

    async fn find_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
    ) -> Result<Option<UserProgress>, RepositoryError> {
        Ok(self
            .state()
            .progress
            .iter()
            .find(|p| p.user_id == user_id && p.chapter_id == chapter_id)
            .cloned())
    }

    async fn list_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<UserProgress>, RepositoryError> {
        let state = self.state();
        Ok(state
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter(|p| {
                state
                    .chapters
                    .iter()
                    .any(|c| c.id == p.chapter_id && c.course_id == course_id)
            })
            .cloned()
            .collect())
    }

    async fn count_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<ProgressCounts, RepositoryError> {
        let state = self.state();
        let published = state
            .chapters
            .iter()
            .filter(|c| c.course_id == course_id && c.is_published)
            .map(|c| c.id)
            .collect::<Vec<_>>();
        let completed = state
            .progress
            .iter()
            .filter(|p| p.user_id == user_id && p.is_completed && published.contains(&p.chapter_id))
            .count();
        Ok(ProgressCounts {
            published: published.len() as i64,
            completed: completed as i64,
        })
    }
}

impl NotificationRepository for MemoryStore {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, RepositoryError> {
        let mut notifications = self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut state = self.state();
        let mut updated = 0;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

impl UserRepository for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }

    async fn toggle_ban(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state();
        Ok(state.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.is_banned = !user.is_banned;
            user.clone()
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users = self.state().users.iter().rev().cloned().collect::<Vec<_>>();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn count_platform(&self) -> Result<PlatformCounts, RepositoryError> {
        let state = self.state();
        Ok(PlatformCounts {
            total_courses: state.courses.len() as i64,
            published_courses: state.courses.iter().filter(|c| c.is_published).count() as i64,
            total_users: state.users.len() as i64,
            total_purchases: state.purchases.len() as i64,
            pending_payments: state
                .pending
                .iter()
                .filter(|p| p.status == PaymentStatus::Pending)
                .count() as i64,
            completed_chapters: state.progress.iter().filter(|p| p.is_completed).count() as i64,
        })
    }
}
